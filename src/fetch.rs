//! HTTP GET with a fixed user agent, a bounded timeout and cancellation.

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::error::FetchError;

/// Shared by every web source of a request. Cheap to clone.
#[derive(Clone)]
pub struct WebFetcher {
    client: reqwest::Client,
    user_agent: String,
}

impl WebFetcher {
    pub fn new(config: &FetchConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Fetch `url` and return its body as text.
    ///
    /// Any non-2xx status is an error. The body is decoded lossily, so
    /// binary or mis-labeled responses never fail here. When `cancel`
    /// fires, the in-flight request is dropped and `Cancelled` returned.
    pub async fn get_text(
        &self,
        url: &str,
        user_agent: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<String, FetchError> {
        let ua = user_agent.unwrap_or(&self.user_agent);
        debug!(url = %url, "HTTP fetch starting");

        let request = async {
            let response = self
                .client
                .get(url)
                .header(USER_AGENT, ua)
                .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
                .header(ACCEPT_LANGUAGE, "fr-FR,fr;q=0.9,en;q=0.8")
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                debug!(url = %url, status = status.as_u16(), "HTTP fetch rejected");
                return Err(FetchError::Status(status.as_u16()));
            }

            let body = response.bytes().await?;
            debug!(url = %url, bytes = body.len(), "HTTP fetch complete");
            Ok(String::from_utf8_lossy(&body).into_owned())
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(url = %url, "HTTP fetch cancelled");
                Err(FetchError::Cancelled)
            }
            result = request => {
                if let Err(FetchError::Request(e)) = &result {
                    warn!(url = %url, error = %e, "HTTP request failed");
                }
                result
            }
        }
    }
}
