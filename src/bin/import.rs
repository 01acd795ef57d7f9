use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use archive_server::config::{ArchiveConfig, split_list};
use archive_server::ingest::IngestionPipeline;
use archive_server::store::{PgArchiveStore, SharedStore, run_migrations};
use archive_server::sync::parse_files_parallel;
use archive_server::sync::spool::is_message_file;

#[derive(Parser, Debug)]
#[command(
    name = "import",
    about = "Ingest raw .eml messages into the archive once and print a summary"
)]
struct Args {
    /// Message files or directories containing `.eml` files.
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Comma separated list tags to strip from subjects (overrides ARCHIVE_SUBJECT_TAGS).
    #[arg(long)]
    subject_tags: Option<String>,

    /// Apply pending schema migrations before importing.
    #[arg(long)]
    migrate: bool,
}

fn collect_files(paths: &[PathBuf]) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in fs::read_dir(path)? {
                let candidate = entry?.path();
                if candidate.is_file() && is_message_file(&candidate) {
                    files.push(candidate);
                }
            }
        } else {
            files.push(path.clone());
        }
    }
    files.sort();
    Ok(files)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    archive_server::init_logger("info");

    let args = Args::parse();

    let mut config = ArchiveConfig::from_env();
    if let Some(tags) = &args.subject_tags {
        config.subject_tags = split_list(tags);
    }

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    if args.migrate {
        run_migrations(&pool).await?;
    }

    let files = collect_files(&args.paths)?;
    log::info!("importing {} message files", files.len());

    let parsed = tokio::task::spawn_blocking(move || parse_files_parallel(files)).await??;
    let mut unparseable = 0;
    let messages: Vec<_> = parsed
        .into_iter()
        .filter_map(|(_, result)| match result {
            Ok(message) => Some(message),
            Err(_) => {
                unparseable += 1;
                None
            }
        })
        .collect();

    let store: SharedStore = Arc::new(PgArchiveStore::new(pool));
    let pipeline = IngestionPipeline::from_config(store, &config)?;
    let stats = pipeline.ingest_batch(messages).await;

    println!(
        "inserted: {}\nnew threads: {}\nduplicates: {}\nmalformed: {}\nunparseable: {}\nfailed: {}",
        stats.inserted,
        stats.new_threads,
        stats.skipped,
        stats.malformed,
        unparseable,
        stats.failed
    );

    if stats.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
