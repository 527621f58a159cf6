//! Social profile fetcher.
//!
//! Only the Open Graph `og:title` and `og:description` tags are read; they
//! are what link previews rely on and are served to crawlers without a
//! login wall. A page without either tag is "nothing extractable"
//! (`Ok(None)`), which is distinct from a network failure.

use std::fmt;
use std::str::FromStr;

use intake_harness_core::html;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::FetchError;
use crate::fetch::WebFetcher;
use crate::models::SourceName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Linkedin,
}

impl Platform {
    pub fn source_name(self) -> SourceName {
        match self {
            Platform::Instagram => SourceName::Instagram,
            Platform::Linkedin => SourceName::Linkedin,
        }
    }

    /// Link-preview crawler agent the platform serves OG tags to.
    pub fn user_agent(self) -> &'static str {
        match self {
            Platform::Instagram => {
                "facebookexternalhit/1.1 (+http://www.facebook.com/externalhit_uatext.php)"
            }
            Platform::Linkedin => {
                "LinkedInBot/1.0 (compatible; Mozilla/5.0; Apache-HttpClient +http://www.linkedin.com)"
            }
        }
    }

    fn domain(self) -> &'static str {
        match self {
            Platform::Instagram => "instagram.com",
            Platform::Linkedin => "linkedin.com",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.source_name().as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "instagram" | "ig" => Ok(Platform::Instagram),
            "linkedin" | "li" => Ok(Platform::Linkedin),
            other => Err(format!("unknown platform '{other}' (expected instagram or linkedin)")),
        }
    }
}

/// Canonical profile URL for a handle, or the URL itself when one is given.
pub fn profile_url(handle_or_url: &str, platform: Platform) -> Result<String, FetchError> {
    let input = handle_or_url.trim();
    if input.contains("://") {
        return Ok(input.to_string());
    }
    if input.starts_with("www.") || input.contains(platform.domain()) {
        return Ok(format!("https://{}", input));
    }

    let handle: String = input
        .trim_start_matches('@')
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if handle.is_empty() {
        return Err(FetchError::InvalidUrl(handle_or_url.to_string()));
    }
    Ok(match platform {
        Platform::Instagram => format!("https://www.instagram.com/{}/", handle),
        Platform::Linkedin => format!("https://www.linkedin.com/in/{}/", handle),
    })
}

pub struct SocialFetcher {
    fetcher: WebFetcher,
}

impl SocialFetcher {
    pub fn new(fetcher: WebFetcher) -> Self {
        Self { fetcher }
    }

    /// `Titre: …` / `Description: …` from the profile's Open Graph tags.
    pub async fn fetch_profile(
        &self,
        handle_or_url: &str,
        platform: Platform,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, FetchError> {
        let url = profile_url(handle_or_url, platform)?;
        let body = self
            .fetcher
            .get_text(&url, Some(platform.user_agent()), cancel)
            .await?;

        let og = html::open_graph(&body);
        if og.is_empty() {
            debug!(url = %url, platform = %platform, "profile has no Open Graph tags");
        }
        Ok(og.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_map_to_profile_urls() {
        assert_eq!(
            profile_url("@marie.yoga", Platform::Instagram).unwrap(),
            "https://www.instagram.com/marie.yoga/"
        );
        assert_eq!(
            profile_url(" marie dupont ", Platform::Linkedin).unwrap(),
            "https://www.linkedin.com/in/mariedupont/"
        );
    }

    #[test]
    fn urls_pass_through() {
        assert_eq!(
            profile_url("https://www.instagram.com/marie.yoga", Platform::Instagram).unwrap(),
            "https://www.instagram.com/marie.yoga"
        );
        assert_eq!(
            profile_url("linkedin.com/in/marie", Platform::Linkedin).unwrap(),
            "https://linkedin.com/in/marie"
        );
    }

    #[test]
    fn blank_handle_is_invalid() {
        assert!(profile_url(" @ ", Platform::Instagram).is_err());
        assert_eq!("LinkedIn".parse::<Platform>().unwrap(), Platform::Linkedin);
        assert!("tiktok".parse::<Platform>().is_err());
    }
}
