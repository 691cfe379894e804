//! # paperbase CLI (`pb`)
//!
//! The `pb` binary is the primary interface for paperbase. It provides
//! commands for database initialization, PDF upload and removal, index
//! training with live progress, similarity search, and starting the JSON
//! HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! pb --config ./config/paperbase.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pb init` | Create the SQLite database and uploads directory |
//! | `pb add <paths...>` | Upload PDF files (directories are walked) |
//! | `pb ls` | List stored documents with page/size metadata |
//! | `pb rm <filename>` | Remove a document and its index vectors |
//! | `pb train` | Rebuild the vector index, reporting progress |
//! | `pb info` | Index overview: counts, last trained, in-sync flag |
//! | `pb search "<query>"` | Top-k scored chunks for a query |
//! | `pb serve` | Start the JSON HTTP server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use paperbase::config::{self, Config};
use paperbase::db;
use paperbase::embedding::create_provider;
use paperbase::extract::PdfExtractor;
use paperbase::index::VectorIndex;
use paperbase::migrate;
use paperbase::models::StoredDocument;
use paperbase::progress::ProgressMode;
use paperbase::search::search_chunks;
use paperbase::server;
use paperbase::store::DocumentStore;
use paperbase::train::TrainingSupervisor;

/// paperbase CLI — a local-first PDF document indexing and retrieval engine.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/paperbase.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "pb",
    about = "paperbase — a local-first PDF document indexing and retrieval engine",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/paperbase.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema and uploads directory.
    ///
    /// Creates the SQLite database file and all required tables
    /// (documents, vectors, index_meta). Idempotent — running it multiple
    /// times is safe.
    Init,

    /// Upload PDF documents.
    ///
    /// Accepts file paths and directories; directories are walked for
    /// `.pdf` files. Non-PDF content and duplicate filenames are rejected
    /// per file with a warning; remaining files are still uploaded.
    Add {
        /// PDF files or directories to upload.
        paths: Vec<PathBuf>,
    },

    /// List stored documents with page counts and sizes.
    Ls,

    /// Remove a document and, synchronously, its index vectors.
    Rm {
        /// Filename as shown by `pb ls`.
        filename: String,
    },

    /// Rebuild the vector index from the current document set.
    ///
    /// Runs the full pipeline (extract → chunk → embed → commit) and polls
    /// the supervisor until it finishes, rendering progress on stderr.
    /// Requires an embedding provider to be configured.
    Train {
        /// Progress rendering: `human`, `json`, or `off`.
        /// Defaults to `human` when stderr is a TTY, otherwise `off`.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Show the index overview: document and vector counts, last training
    /// time, embedding model, and whether the index is in sync with the
    /// stored documents.
    Info,

    /// Search the vector index.
    ///
    /// Embeds the query and returns the top-k most similar chunks with
    /// their source file, page, and score. Requires an embedding provider.
    Search {
        /// The query text.
        query: String,

        /// Number of results to return (defaults to retrieval.top_k).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Start the JSON HTTP server.
    ///
    /// Binds to the address configured in `[server].bind` and exposes the
    /// document, training, info, and search endpoints.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg.storage.db_path).await?;
            migrate::run_migrations(&pool).await?;
            std::fs::create_dir_all(&cfg.storage.uploads_dir)?;
            println!("Database initialized successfully.");
        }
        Commands::Add { paths } => {
            run_add(&cfg, &paths).await?;
        }
        Commands::Ls => {
            run_ls(&cfg).await?;
        }
        Commands::Rm { filename } => {
            let (store, index) = open_store(&cfg).await?;
            store.remove(&filename, &index).await?;
            println!("Deleted {}", filename);
        }
        Commands::Train { progress } => {
            run_train(&cfg, progress.as_deref()).await?;
        }
        Commands::Info => {
            run_info(&cfg).await?;
        }
        Commands::Search { query, top_k } => {
            run_search(&cfg, &query, top_k).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

/// Connect and build the store/index pair used by most commands.
async fn open_store(cfg: &Config) -> anyhow::Result<(DocumentStore, VectorIndex)> {
    let pool = db::connect(&cfg.storage.db_path).await?;
    let store = DocumentStore::new(
        pool.clone(),
        cfg.storage.uploads_dir.clone(),
        Arc::new(PdfExtractor),
    )?;
    let index = VectorIndex::new(pool);
    Ok((store, index))
}

async fn run_add(cfg: &Config, paths: &[PathBuf]) -> anyhow::Result<()> {
    if paths.is_empty() {
        anyhow::bail!("no paths given; usage: pb add <file.pdf | dir> ...");
    }

    let (store, _) = open_store(cfg).await?;
    let files = collect_pdf_paths(paths)?;
    if files.is_empty() {
        anyhow::bail!("no .pdf files found under the given paths");
    }

    let mut added = 0usize;
    let mut failed = 0usize;

    for path in &files {
        let filename = match path.file_name() {
            Some(name) => name.to_string_lossy().to_string(),
            None => {
                eprintln!("Warning: {}: no filename", path.display());
                failed += 1;
                continue;
            }
        };

        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                eprintln!("Warning: {}: {}", path.display(), e);
                failed += 1;
                continue;
            }
        };

        match store.add(&filename, &bytes).await {
            Ok(doc) => {
                println!(
                    "added {}  ({} pages, {})",
                    doc.filename,
                    doc.pages,
                    format_bytes(doc.size_bytes)
                );
                added += 1;
            }
            Err(e) => {
                eprintln!("Warning: {}: {}", path.display(), e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        println!("added {} documents, {} failed", added, failed);
    } else {
        println!("added {} documents", added);
    }

    if added == 0 {
        anyhow::bail!("no documents added");
    }
    Ok(())
}

/// Expand the given paths into a sorted list of PDF files; directories
/// are walked recursively.
fn collect_pdf_paths(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            for entry in walkdir::WalkDir::new(path) {
                let entry = entry?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let p = entry.path();
                let is_pdf = p
                    .extension()
                    .map(|e| e.to_string_lossy().eq_ignore_ascii_case("pdf"))
                    .unwrap_or(false);
                if is_pdf {
                    files.push(p.to_path_buf());
                }
            }
        } else if path.exists() {
            files.push(path.clone());
        } else {
            anyhow::bail!("path does not exist: {}", path.display());
        }
    }

    files.sort();
    Ok(files)
}

async fn run_ls(cfg: &Config) -> anyhow::Result<()> {
    let (store, _) = open_store(cfg).await?;
    let docs = store.list().await?;

    if docs.is_empty() {
        println!("No documents.");
        return Ok(());
    }

    println!(
        "  {:<32} {:>6} {:>10}   {}",
        "FILENAME", "PAGES", "SIZE", "UPLOADED"
    );
    println!("  {}", "-".repeat(64));
    for doc in &docs {
        print_document_row(doc);
    }
    println!();
    println!("  {} documents", docs.len());

    Ok(())
}

fn print_document_row(doc: &StoredDocument) {
    println!(
        "  {:<32} {:>6} {:>10}   {}",
        doc.filename,
        doc.pages,
        format_bytes(doc.size_bytes),
        format_ts_relative(doc.uploaded_at)
    );
}

async fn run_train(cfg: &Config, progress: Option<&str>) -> anyhow::Result<()> {
    if !cfg.embedding.is_enabled() {
        anyhow::bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }

    let mode = match progress {
        Some("human") => ProgressMode::Human,
        Some("json") => ProgressMode::Json,
        Some("off") => ProgressMode::Off,
        Some(other) => anyhow::bail!("unknown progress mode: {} (human, json, off)", other),
        None => ProgressMode::default_for_tty(),
    };
    let reporter = mode.reporter();

    let (store, index) = open_store(cfg).await?;
    let provider = create_provider(&cfg.embedding)?;
    let supervisor = TrainingSupervisor::new(
        store,
        index,
        Arc::new(PdfExtractor),
        provider,
        cfg.chunking.clone(),
        cfg.embedding.batch_size,
    );

    supervisor.start().await?;

    // The run executes on the runtime; poll its shared state until it
    // reaches a terminal write, the same way a web client would.
    let mut last = supervisor.status();
    reporter.report(&last);
    loop {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let status = supervisor.status();
        if status.stage != last.stage || status.progress != last.progress {
            reporter.report(&status);
        }
        let done = !status.is_training;
        last = status;
        if done {
            break;
        }
    }

    if last.stage == "Error" {
        anyhow::bail!("training failed: {}", last.message);
    }
    println!("{}", last.message);
    Ok(())
}

async fn run_info(cfg: &Config) -> anyhow::Result<()> {
    let (store, index) = open_store(cfg).await?;
    let document_count = store.count().await?;
    let configured_model = cfg.embedding.model.as_deref().unwrap_or("disabled");
    let info = index.info(document_count, configured_model).await?;

    println!("paperbase — Index Info");
    println!("======================");
    println!();
    println!("  Documents:     {}", info.document_count);
    println!("  Vectors:       {}", info.vector_count);
    println!("  Model:         {}", info.embedding_model);
    match info.last_trained_at {
        Some(ts) => println!("  Last trained:  {}", format_ts_relative(ts)),
        None => println!("  Last trained:  never"),
    }
    println!("  In sync:       {}", if info.in_sync { "yes" } else { "no" });

    Ok(())
}

async fn run_search(cfg: &Config, query: &str, top_k: Option<usize>) -> anyhow::Result<()> {
    if !cfg.embedding.is_enabled() {
        anyhow::bail!("Search requires embeddings. Set [embedding] provider in config.");
    }

    let (_, index) = open_store(cfg).await?;
    let provider = create_provider(&cfg.embedding)?;
    let k = top_k.unwrap_or(cfg.retrieval.top_k);

    let results = search_chunks(&index, provider.as_ref(), query, k).await?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, r) in results.iter().enumerate() {
        println!("{}. [{:.2}] {}  page {}", i + 1, r.score, r.file, r.page);
        println!("    excerpt: \"{}\"", excerpt(&r.text, 240));
        println!();
    }

    Ok(())
}

/// First `max_chars` characters on one line, for display.
fn excerpt(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    let flat = flat.trim();
    let mut out: String = flat.chars().take(max_chars).collect();
    if flat.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
