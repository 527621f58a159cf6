//! # Intake Harness
//!
//! Document and web-content extraction for onboarding analysis.
//!
//! Given a business's website, social handles and uploaded documents,
//! Intake Harness reads every source concurrently under one deadline and
//! returns a bundle of bounded, labeled text blocks ready to be placed in a
//! language-model prompt. Sources that fail are reported, never fatal,
//! unless none of them produced text.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │   Website    │   │  Instagram   │   │   LinkedIn   │   │  Documents   │
//! │ SiteCrawler  │   │ SocialFetcher│   │ SocialFetcher│   │ Orchestrator │
//! └──────┬───────┘   └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!        │                  │                  │          BlobStore + extract
//!        └──────────────────┴────────┬─────────┴──────────────────┘
//!                                    ▼
//!                            ┌──────────────┐
//!                            │  Aggregator  │──▶ bundle + outcomes
//!                            └──────────────┘
//!                                    │
//!                      ┌─────────────┴─────────────┐
//!                      ▼                           ▼
//!                 ┌──────────┐               ┌──────────┐
//!                 │   CLI    │               │   HTTP   │
//!                 │ (intake) │               │  (axum)  │
//!                 └──────────┘               └──────────┘
//! ```
//!
//! Byte-level format parsing (ZIP, DEFLATE, PDF, DOCX, HTML) lives in the
//! `intake-harness-core` crate, which has no I/O.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`logging`] | Tracing subscriber setup |
//! | [`fetch`] | HTTP GET with timeout and cancellation |
//! | [`crawl`] | Website crawler |
//! | [`social`] | Social profile Open Graph reader |
//! | [`extract`] | Per-document dispatch by extension |
//! | [`documents`] | Document orchestrator |
//! | [`aggregate`] | Multi-source aggregation |
//! | [`traits`] | `BlobStore` and `DocumentStore` seams |
//! | [`blob_fs`] | Filesystem blob store |
//! | [`blob_s3`] | S3 blob store |
//! | [`storage`] | Key conventions and backend selection |
//! | [`records`] | SQLite document records |
//! | [`prefill_store`] | Fill-but-never-clobber field storage |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |

pub mod aggregate;
pub mod blob_fs;
pub mod blob_s3;
pub mod config;
pub mod crawl;
pub mod db;
pub mod documents;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod logging;
pub mod migrate;
pub mod models;
pub mod prefill_store;
pub mod records;
pub mod server;
pub mod social;
pub mod storage;
pub mod traits;
