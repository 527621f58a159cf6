//! Site crawler: homepage plus the first reachable about and offers pages.
//!
//! Probing is best-first, not exhaustive. Each path list is tried in order
//! and the first path answering 2xx with non-empty extracted text wins;
//! the remaining paths of that list are never requested. A failing
//! sub-page is skipped. Only a failing homepage fails the source.

use intake_harness_core::html;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::error::FetchError;
use crate::fetch::WebFetcher;

pub const ABOUT_PATHS: &[&str] = &[
    "/about",
    "/a-propos",
    "/qui-suis-je",
    "/qui-sommes-nous",
    "/notre-histoire",
];

pub const OFFER_PATHS: &[&str] = &[
    "/services",
    "/offres",
    "/shop",
    "/boutique",
    "/prestations",
    "/tarifs",
    "/pricing",
    "/nos-offres",
];

/// Canonical base URL: scheme defaulted to `https`, no fragment, no query,
/// no trailing slash.
pub fn normalize_base_url(input: &str) -> Result<String, FetchError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(FetchError::InvalidUrl(input.to_string()));
    }
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let mut url =
        Url::parse(&with_scheme).map_err(|_| FetchError::InvalidUrl(input.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(FetchError::InvalidUrl(input.to_string()));
    }
    url.set_fragment(None);
    url.set_query(None);

    Ok(url.as_str().trim_end_matches('/').to_string())
}

pub struct SiteCrawler {
    fetcher: WebFetcher,
}

impl SiteCrawler {
    pub fn new(fetcher: WebFetcher) -> Self {
        Self { fetcher }
    }

    /// Crawl `base_url` into one labeled bundle, `None` when every page
    /// came back without extractable text.
    pub async fn crawl(
        &self,
        base_url: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, FetchError> {
        let base = normalize_base_url(base_url)?;
        let homepage = self.fetcher.get_text(&base, None, cancel).await?;
        let homepage = html::extract_text(&homepage);

        let (about, offers) = tokio::join!(
            self.first_page(&base, ABOUT_PATHS, cancel),
            self.first_page(&base, OFFER_PATHS, cancel),
        );

        let mut sections = Vec::new();
        if !homepage.is_empty() {
            sections.push(format!("=== Page d'accueil ===\n{}", homepage));
        }
        if let Some((path, text)) = about {
            sections.push(format!("=== À propos ({}) ===\n{}", path, text));
        }
        if let Some((path, text)) = offers {
            sections.push(format!("=== Offres ({}) ===\n{}", path, text));
        }

        debug!(base = %base, sections = sections.len(), "site crawl finished");
        Ok((!sections.is_empty()).then(|| sections.join("\n\n")))
    }

    async fn first_page(
        &self,
        base: &str,
        paths: &[&'static str],
        cancel: &CancellationToken,
    ) -> Option<(&'static str, String)> {
        for &path in paths {
            if cancel.is_cancelled() {
                return None;
            }
            let url = format!("{}{}", base, path);
            match self.fetcher.get_text(&url, None, cancel).await {
                Ok(body) => {
                    let text = html::extract_text(&body);
                    if !text.is_empty() {
                        return Some((path, text));
                    }
                    debug!(url = %url, "sub-page has no extractable text");
                }
                Err(e) => debug!(url = %url, error = %e, "sub-page skipped"),
            }
        }
        None
    }
}
