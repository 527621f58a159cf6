//! # Intake Harness CLI (`intake`)
//!
//! The `intake` binary drives the extraction pipeline from the command line:
//! single-file extraction, website and social profile reads, document
//! uploads, full multi-source analysis, prefill management, and the HTTP
//! server.
//!
//! ## Usage
//!
//! ```bash
//! intake --config ./config/intake.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `intake init` | Create the SQLite database and schema |
//! | `intake extract <file>` | Print the text extracted from a local file |
//! | `intake crawl <url>` | Print the homepage, about and offers text of a site |
//! | `intake social <handle> --platform instagram` | Print a profile's Open Graph summary |
//! | `intake documents add <owner> <file>` | Store and register an upload |
//! | `intake documents list <owner>` | List an owner's uploads |
//! | `intake analyze --website … --owner … --documents` | Aggregate every source |
//! | `intake prefill apply <owner> <entity> <file.json>` | Fill empty fields only |
//! | `intake serve` | Start the HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! intake init
//! intake documents add owner-1 ./brochure.pdf
//! intake analyze --website atelier-lune.fr --instagram @atelierlune --owner owner-1 --documents
//! intake prefill apply owner-1 profile ./proposals.json
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use intake_harness::aggregate::{AggregateRequest, Aggregator};
use intake_harness::config::{self, Config};
use intake_harness::crawl::SiteCrawler;
use intake_harness::extract::{extract_document, TextQuality};
use intake_harness::fetch::WebFetcher;
use intake_harness::models::{DocumentRecord, PrefillEntity, PrefillField};
use intake_harness::records::SqliteDocumentStore;
use intake_harness::social::{Platform, SocialFetcher};
use intake_harness::storage::{build_blob_store, upload_key};
use intake_harness::traits::{BlobStore, DocumentStore};
use intake_harness::{db, logging, migrate, prefill_store, server};

/// Intake Harness: turn a business's website, social profiles and
/// uploaded documents into bounded text for onboarding analysis.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means built-in defaults.
#[derive(Parser)]
#[command(
    name = "intake",
    about = "Intake Harness: document and web-content extraction for onboarding analysis",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/intake.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Extract text from a local file (.pdf, .docx, .doc, .txt, .md, images).
    Extract {
        /// File to read.
        path: PathBuf,
    },

    /// Crawl a website: homepage, first about page, first offers page.
    Crawl {
        /// Site URL or bare domain.
        url: String,
    },

    /// Read a social profile's Open Graph title and description.
    Social {
        /// Handle (`@name`) or profile URL.
        handle: String,

        /// `instagram` or `linkedin`.
        #[arg(long, default_value = "instagram")]
        platform: Platform,
    },

    /// Manage uploaded documents.
    Documents {
        #[command(subcommand)]
        action: DocumentsAction,
    },

    /// Aggregate every provided source under the configured deadline.
    Analyze {
        #[arg(long)]
        website: Option<String>,

        #[arg(long)]
        instagram: Option<String>,

        #[arg(long)]
        linkedin: Option<String>,

        /// Owner whose documents are read.
        #[arg(long)]
        owner: Option<String>,

        /// Specific document id. Repeatable.
        #[arg(long = "document")]
        documents_ids: Vec<String>,

        /// Include the owner's most recent documents.
        #[arg(long)]
        documents: bool,

        /// Print the full report as JSON instead of the labeled context.
        #[arg(long)]
        json: bool,
    },

    /// Manage prefilled onboarding fields.
    Prefill {
        #[command(subcommand)]
        action: PrefillAction,
    },

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum DocumentsAction {
    /// Store a file in the blob store and register it for an owner.
    Add {
        owner: String,
        path: PathBuf,
    },
    /// List an owner's documents, newest first.
    List { owner: String },
}

#[derive(Subcommand)]
enum PrefillAction {
    /// Apply proposals from a JSON array of `{field_name, value, confidence}`.
    ///
    /// Fields that already hold a value are left untouched.
    Apply {
        owner: String,
        entity: PrefillEntity,
        file: PathBuf,
    },
    /// Set a field as the user would. Overwrites.
    Set {
        owner: String,
        entity: PrefillEntity,
        field: String,
        value: Option<String>,
    },
    /// Print the current fields as JSON.
    Show {
        owner: String,
        entity: PrefillEntity,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    let cfg = config::load_config_or_minimal(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Extract { path } => run_extract(&path).await?,
        Commands::Crawl { url } => {
            let crawler = SiteCrawler::new(WebFetcher::new(&cfg.fetch)?);
            let cancel = cancel_on_ctrl_c();
            match crawler.crawl(&url, &cancel).await? {
                Some(text) => println!("{}", text),
                None => bail!("no text found on {}", url),
            }
        }
        Commands::Social { handle, platform } => {
            let social = SocialFetcher::new(WebFetcher::new(&cfg.fetch)?);
            let cancel = cancel_on_ctrl_c();
            match social.fetch_profile(&handle, platform, &cancel).await? {
                Some(text) => println!("{}", text),
                None => bail!("no Open Graph tags on the {} profile", platform),
            }
        }
        Commands::Documents { action } => match action {
            DocumentsAction::Add { owner, path } => run_documents_add(&cfg, &owner, &path).await?,
            DocumentsAction::List { owner } => run_documents_list(&cfg, &owner).await?,
        },
        Commands::Analyze {
            website,
            instagram,
            linkedin,
            owner,
            documents_ids,
            documents,
            json,
        } => {
            let request = AggregateRequest {
                website,
                instagram,
                linkedin,
                owner_id: owner,
                document_ids: documents_ids,
                include_documents: documents,
            };
            run_analyze(&cfg, &request, json).await?;
        }
        Commands::Prefill { action } => run_prefill(&cfg, action).await?,
        Commands::Serve => server::run_server(&cfg).await?,
    }

    Ok(())
}

/// A token cancelled when the user hits Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
    cancel
}

async fn run_extract(path: &Path) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = file_name_of(path)?;

    let doc = extract_document(&file_name, &bytes)?;
    if doc.quality == TextQuality::Placeholder {
        warn!(file_name = %file_name, "no extractable text, printing placeholder");
    }
    println!("{}", doc.text);
    Ok(())
}

fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("Not a file path: {}", path.display()))
}

async fn run_documents_add(cfg: &Config, owner: &str, path: &Path) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = file_name_of(path)?;

    let key = upload_key(owner, &file_name);
    build_blob_store(cfg)?.upload(&key, &bytes).await?;

    let pool = db::connect(cfg).await?;
    migrate::create_schema(&pool).await?;
    let record = DocumentRecord {
        id: uuid::Uuid::new_v4().to_string(),
        owner_id: owner.to_string(),
        file_name,
        storage_ref: key,
        declared_type: path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase),
    };
    SqliteDocumentStore::new(pool.clone()).register(&record).await?;
    pool.close().await;

    println!("{}", record.id);
    Ok(())
}

async fn run_documents_list(cfg: &Config, owner: &str) -> Result<()> {
    let pool = db::connect(cfg).await?;
    migrate::create_schema(&pool).await?;
    let docs = SqliteDocumentStore::new(pool.clone()).list(owner).await?;
    pool.close().await;

    if docs.is_empty() {
        println!("No documents for {}.", owner);
        return Ok(());
    }
    for doc in docs {
        let created = chrono::DateTime::from_timestamp(doc.created_at, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "{}  {}  {}  ({})",
            doc.record.id, created, doc.record.file_name, doc.record.storage_ref
        );
    }
    Ok(())
}

async fn run_analyze(cfg: &Config, request: &AggregateRequest, json: bool) -> Result<()> {
    if request.requested_sources().is_empty() {
        bail!("Nothing to analyze: pass --website, --instagram, --linkedin or --owner with --documents");
    }

    let pool = db::connect(cfg).await?;
    migrate::create_schema(&pool).await?;
    let aggregator = Aggregator::from_config(cfg, pool.clone())?;

    let cancel = cancel_on_ctrl_c();
    let report = aggregator
        .aggregate(request, cfg.budget.deadline(), &cancel)
        .await;
    pool.close().await;
    let report = report?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", report.to_context());
    eprintln!();
    for outcome in &report.outcomes {
        match &outcome.reason {
            Some(reason) => eprintln!("  {:<10} failed ({})", outcome.source_name.as_str(), reason),
            None => eprintln!("  {:<10} used", outcome.source_name.as_str()),
        }
    }
    for skipped in &report.skipped_documents {
        eprintln!("  skipped {} ({})", skipped.file_name, skipped.reason);
    }
    eprintln!("Done in {} ms.", report.elapsed_ms);
    Ok(())
}

async fn run_prefill(cfg: &Config, action: PrefillAction) -> Result<()> {
    let pool = db::connect(cfg).await?;
    migrate::create_schema(&pool).await?;

    match action {
        PrefillAction::Apply {
            owner,
            entity,
            file,
        } => {
            let content = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let proposals: Vec<PrefillField> = serde_json::from_str(&content)
                .with_context(|| format!("Invalid proposals in {}", file.display()))?;

            let filled = prefill_store::apply_prefill(&pool, &owner, entity, &proposals).await?;
            if filled.is_empty() {
                println!("No empty field to fill.");
            } else {
                println!("Filled {} field(s): {}", filled.len(), filled.join(", "));
            }
        }
        PrefillAction::Set {
            owner,
            entity,
            field,
            value,
        } => {
            prefill_store::set_field(&pool, &owner, entity, &field, value.as_deref()).await?;
            println!("Set {}.{}", entity, field);
        }
        PrefillAction::Show { owner, entity } => {
            let fields = prefill_store::load_fields(&pool, &owner, entity).await?;
            println!("{}", serde_json::to_string_pretty(&fields)?);
        }
    }

    pool.close().await;
    Ok(())
}
