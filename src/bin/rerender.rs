use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use archive_server::config::ArchiveConfig;
use archive_server::ingest::IngestionPipeline;
use archive_server::store::{PgArchiveStore, SharedStore};

#[derive(Parser, Debug)]
#[command(
    name = "rerender",
    about = "Recompute the rendered HTML of every archived message"
)]
struct Args {
    /// Extra vocabulary file (overrides ARCHIVE_VOCABULARY_PATH).
    #[arg(long)]
    vocabulary: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    archive_server::init_logger("info");

    let args = Args::parse();

    let mut config = ArchiveConfig::from_env();
    if args.vocabulary.is_some() {
        config.vocabulary_path = args.vocabulary;
    }

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    let store: SharedStore = Arc::new(PgArchiveStore::new(pool));
    let pipeline = IngestionPipeline::from_config(store, &config)?;
    let updated = pipeline.rerender_all().await?;

    println!("re-rendered {} messages", updated);
    Ok(())
}
