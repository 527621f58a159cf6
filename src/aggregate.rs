//! Multi-source aggregation under one deadline.
//!
//! # Concurrency
//!
//! Every requested source runs as its own future, all polled together by
//! `join_all`. They share nothing except one [`CancellationToken`], a child
//! of the caller's token, fired when the `join_all` loses its race against
//! the deadline sleep. Nothing is spawned, so dropping the aggregation
//! drops every in-flight source with it.
//! Each source races its work against that token, so a source still
//! running at the deadline resolves as `failed(Cancelled)` and its
//! in-flight requests are dropped.
//!
//! ```text
//! parent token ──▶ child token ◀── deadline sleep
//!                      │
//!     ┌────────────────┼────────────────┬──────────────┐
//!     ▼                ▼                ▼              ▼
//!  website         instagram         linkedin      documents
//!     └────────────────┴───────┬────────┴──────────────┘
//!                              ▼
//!              outcomes in canonical source order
//! ```
//!
//! Completion order never matters: outcomes are collected in the order the
//! sources were requested, which is always [`SourceName::ALL`] order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::crawl::SiteCrawler;
use crate::documents::{DocumentOrchestrator, SkippedDocument};
use crate::error::AggregateError;
use crate::fetch::WebFetcher;
use crate::models::{ExtractedText, FailureReason, SourceName, SourceOutcome};
use crate::records::SqliteDocumentStore;
use crate::social::{Platform, SocialFetcher};
use crate::storage::build_blob_store;

/// Which sources to read. Blank values are treated as not requested.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregateRequest {
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub instagram: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub document_ids: Vec<String>,
    #[serde(default)]
    pub include_documents: bool,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl AggregateRequest {
    /// Requested sources in canonical order.
    pub fn requested_sources(&self) -> Vec<SourceName> {
        SourceName::ALL
            .into_iter()
            .filter(|name| match name {
                SourceName::Website => present(&self.website).is_some(),
                SourceName::Instagram => present(&self.instagram).is_some(),
                SourceName::Linkedin => present(&self.linkedin).is_some(),
                SourceName::Documents => {
                    present(&self.owner_id).is_some()
                        && (self.include_documents || !self.document_ids.is_empty())
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    /// One bounded block per used source, in `used` order.
    pub bundle: Vec<ExtractedText>,
    pub used: Vec<SourceName>,
    pub failed: Vec<SourceName>,
    /// Terminal state of every attempted source. Text lives in `bundle`.
    pub outcomes: Vec<SourceOutcome>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_documents: Vec<SkippedDocument>,
    pub elapsed_ms: u64,
}

impl AggregateReport {
    /// `=== LABEL ===` headed blocks for the prompt builder.
    pub fn to_context(&self) -> String {
        self.used
            .iter()
            .zip(&self.bundle)
            .map(|(name, block)| format!("=== {} ===\n{}", name.label(), block.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

struct SourceRun {
    outcome: SourceOutcome,
    skipped: Vec<SkippedDocument>,
}

impl From<SourceOutcome> for SourceRun {
    fn from(outcome: SourceOutcome) -> Self {
        Self {
            outcome,
            skipped: Vec::new(),
        }
    }
}

pub struct Aggregator {
    crawler: SiteCrawler,
    social: SocialFetcher,
    documents: Option<Arc<DocumentOrchestrator>>,
    max_chars_per_source: usize,
}

impl Aggregator {
    pub fn new(
        fetcher: WebFetcher,
        documents: Option<Arc<DocumentOrchestrator>>,
        max_chars_per_source: usize,
    ) -> Self {
        Self {
            crawler: SiteCrawler::new(fetcher.clone()),
            social: SocialFetcher::new(fetcher),
            documents,
            max_chars_per_source,
        }
    }

    /// Wire the configured fetcher, record store and blob store.
    pub fn from_config(config: &Config, pool: SqlitePool) -> Result<Self> {
        let fetcher = WebFetcher::new(&config.fetch)?;
        let orchestrator = DocumentOrchestrator::new(
            Arc::new(SqliteDocumentStore::new(pool)),
            build_blob_store(config)?,
            config.budget.max_documents,
        );
        Ok(Self::new(
            fetcher,
            Some(Arc::new(orchestrator)),
            config.budget.max_chars_per_source,
        ))
    }

    /// Run every requested source concurrently until done or `deadline`.
    ///
    /// Fails only when no source produced text.
    pub async fn aggregate(
        &self,
        request: &AggregateRequest,
        deadline: Duration,
        parent: &CancellationToken,
    ) -> Result<AggregateReport, AggregateError> {
        let started = Instant::now();
        let sources = request.requested_sources();
        let cancel = parent.child_token();

        let joined = join_all(
            sources
                .iter()
                .map(|&name| self.run_source(name, request, &cancel)),
        );
        tokio::pin!(joined);
        let finished = tokio::select! {
            runs = &mut joined => Some(runs),
            _ = tokio::time::sleep(deadline) => None,
        };
        let runs = match finished {
            Some(runs) => runs,
            None => {
                cancel.cancel();
                joined.await
            }
        };

        let mut bundle = Vec::new();
        let mut used = Vec::new();
        let mut failed = Vec::new();
        let mut outcomes = Vec::with_capacity(runs.len());
        let mut skipped_documents = Vec::new();

        for run in runs {
            let mut outcome = run.outcome;
            skipped_documents.extend(run.skipped);
            match outcome.text.take() {
                Some(text) if outcome.is_used() => {
                    bundle.push(ExtractedText::bounded(
                        outcome.source_name.as_str(),
                        &text,
                        self.max_chars_per_source,
                    ));
                    used.push(outcome.source_name);
                }
                _ => failed.push(outcome.source_name),
            }
            outcomes.push(outcome);
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            used = ?used,
            failed = ?failed,
            elapsed_ms,
            "aggregation finished"
        );

        if used.is_empty() {
            return Err(AggregateError::NothingAnalyzable { failed });
        }
        Ok(AggregateReport {
            bundle,
            used,
            failed,
            outcomes,
            skipped_documents,
            elapsed_ms,
        })
    }

    async fn run_source(
        &self,
        name: SourceName,
        request: &AggregateRequest,
        cancel: &CancellationToken,
    ) -> SourceRun {
        let work = async {
            match name {
                SourceName::Website => {
                    let url = present(&request.website).unwrap_or_default();
                    match self.crawler.crawl(url, cancel).await {
                        Ok(Some(text)) => SourceOutcome::used(name, text).into(),
                        Ok(None) => SourceOutcome::failed(name, FailureReason::Empty).into(),
                        Err(e) => {
                            warn!(source = %name, error = %e, "source failed");
                            SourceOutcome::failed(name, e.reason()).into()
                        }
                    }
                }
                SourceName::Instagram | SourceName::Linkedin => {
                    let (handle, platform) = match name {
                        SourceName::Instagram => (&request.instagram, Platform::Instagram),
                        _ => (&request.linkedin, Platform::Linkedin),
                    };
                    let handle = present(handle).unwrap_or_default();
                    match self.social.fetch_profile(handle, platform, cancel).await {
                        Ok(Some(text)) => SourceOutcome::used(name, text).into(),
                        Ok(None) => SourceOutcome::failed(name, FailureReason::Empty).into(),
                        Err(e) => {
                            warn!(source = %name, error = %e, "source failed");
                            SourceOutcome::failed(name, e.reason()).into()
                        }
                    }
                }
                SourceName::Documents => self.run_documents(request, cancel).await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => SourceOutcome::failed(name, FailureReason::Cancelled).into(),
            run = work => run,
        }
    }

    async fn run_documents(
        &self,
        request: &AggregateRequest,
        cancel: &CancellationToken,
    ) -> SourceRun {
        let name = SourceName::Documents;
        let (Some(orchestrator), Some(owner_id)) = (&self.documents, present(&request.owner_id))
        else {
            return SourceOutcome::failed(name, FailureReason::NotConfigured).into();
        };

        match orchestrator
            .process(&request.document_ids, owner_id, self.max_chars_per_source, cancel)
            .await
        {
            Ok(Some(digest)) => SourceRun {
                outcome: SourceOutcome::used(name, digest.text),
                skipped: digest.skipped,
            },
            Ok(None) => SourceOutcome::failed(name, FailureReason::Empty).into(),
            Err(e) => {
                warn!(source = %name, error = %e, "document lookup failed");
                SourceOutcome::failed(name, FailureReason::Extraction).into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_sources_are_not_requested() {
        let request = AggregateRequest {
            website: Some("  ".into()),
            instagram: Some("@marie".into()),
            linkedin: None,
            owner_id: Some("o1".into()),
            document_ids: Vec::new(),
            include_documents: false,
        };
        assert_eq!(request.requested_sources(), vec![SourceName::Instagram]);
    }

    #[test]
    fn documents_need_an_owner() {
        let mut request = AggregateRequest {
            document_ids: vec!["d1".into()],
            ..Default::default()
        };
        assert!(request.requested_sources().is_empty());
        request.owner_id = Some("o1".into());
        assert_eq!(request.requested_sources(), vec![SourceName::Documents]);
    }

    #[test]
    fn request_order_is_canonical() {
        let request: AggregateRequest = serde_json::from_str(
            r#"{"owner_id":"o1","include_documents":true,"linkedin":"marie","website":"x.fr"}"#,
        )
        .unwrap();
        assert_eq!(
            request.requested_sources(),
            vec![SourceName::Website, SourceName::Linkedin, SourceName::Documents]
        );
    }

    #[test]
    fn context_uses_labels() {
        let report = AggregateReport {
            bundle: vec![
                ExtractedText::bounded("website", "Titre: Atelier", 100),
                ExtractedText::bounded("documents", "--- a.txt ---\nBonjour", 100),
            ],
            used: vec![SourceName::Website, SourceName::Documents],
            failed: vec![SourceName::Instagram],
            outcomes: Vec::new(),
            skipped_documents: Vec::new(),
            elapsed_ms: 12,
        };
        assert_eq!(
            report.to_context(),
            "=== SITE WEB ===\nTitre: Atelier\n\n=== DOCUMENTS ===\n--- a.txt ---\nBonjour"
        );
    }

    fn assert_send<T: Send>(_: T) {}

    #[test]
    fn source_futures_are_send() {
        let fetcher = WebFetcher::new(&crate::config::FetchConfig::default()).unwrap();
        let crawler = SiteCrawler::new(fetcher.clone());
        let aggregator = Aggregator::new(fetcher, None, 100);
        let request = AggregateRequest::default();
        let cancel = CancellationToken::new();

        assert_send(crawler.crawl("atelier-lune.fr", &cancel));
        assert_send(aggregator.aggregate(&request, Duration::from_secs(1), &cancel));
    }
}
