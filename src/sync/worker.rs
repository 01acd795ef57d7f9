use crate::error::ArchiveError;
use crate::ingest::{IngestStats, IngestionPipeline};
use crate::sync::spool::{SpoolDirectory, SpoolError, parse_files_parallel};
use std::time::Duration;

/// Delay before retrying after the spool itself could not be read.
const ERROR_BACKOFF: Duration = Duration::from_secs(10);

pub struct SyncWorker {
    spool: SpoolDirectory,
    pipeline: IngestionPipeline,
    poll_interval: Duration,
}

impl SyncWorker {
    pub fn new(spool: SpoolDirectory, pipeline: IngestionPipeline, poll_interval: Duration) -> Self {
        Self {
            spool,
            pipeline,
            poll_interval,
        }
    }

    /// Run worker loop forever
    pub async fn run(self) -> ! {
        log::info!(
            "spool worker started on {} (every {:?})",
            self.spool.root().display(),
            self.poll_interval
        );

        loop {
            match self.poll_once().await {
                Ok(stats) if stats.total() > 0 => {
                    log::info!(
                        "spool: {} inserted, {} duplicates, {} malformed, {} failed",
                        stats.inserted,
                        stats.skipped,
                        stats.malformed,
                        stats.failed
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    log::error!("spool worker: poll failed: {}", e);
                    tokio::time::sleep(ERROR_BACKOFF).await;
                    continue;
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Ingest every message currently waiting in the spool.
    ///
    /// Files are moved to `processed/` once stored or recognised as duplicates and
    /// to `failed/` when unparseable or malformed. Files hitting a store error stay
    /// in place for the next poll.
    pub async fn poll_once(&self) -> Result<IngestStats, SpoolError> {
        let pending = self.spool.pending()?;
        let mut stats = IngestStats::default();
        if pending.is_empty() {
            return Ok(stats);
        }

        log::debug!("spool: {} messages pending", pending.len());
        let parsed = tokio::task::spawn_blocking(move || parse_files_parallel(pending))
            .await
            .map_err(|e| SpoolError::Io {
                path: self.spool.root().to_path_buf(),
                source: std::io::Error::other(e),
            })??;

        for (path, result) in parsed {
            let incoming = match result {
                Ok(incoming) => incoming,
                Err(_) => {
                    stats.malformed += 1;
                    self.spool.mark_failed(&path)?;
                    continue;
                }
            };

            let id = incoming.id.clone();
            let outcome = self.pipeline.ingest(incoming).await;
            match &outcome {
                Ok(_) => {
                    self.spool.mark_processed(&path)?;
                }
                Err(ArchiveError::MalformedMessage(reason)) => {
                    log::warn!("spool: rejecting {}: {}", path.display(), reason);
                    self.spool.mark_failed(&path)?;
                }
                Err(e) => {
                    log::error!("spool: failed to ingest {} ({}): {}", id, path.display(), e);
                }
            }
            stats.record(&outcome);
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentRenderer;
    use crate::store::{InMemoryStore, MessageStore};
    use crate::threading::SubjectNormalizer;
    use std::fs;
    use std::sync::Arc;

    fn eml(id: &str, date: &str, reply_to: Option<&str>) -> String {
        let mut raw = format!(
            "Message-ID: <{}>\r\nFrom: Dev <dev@example.com>\r\nSubject: Re: [PHP-DEV] Enums\r\n",
            id
        );
        if !date.is_empty() {
            raw.push_str(&format!("Date: {}\r\n", date));
        }
        if let Some(parent) = reply_to {
            raw.push_str(&format!("In-Reply-To: <{}>\r\n", parent));
        }
        raw.push_str("\r\nHello PHP_EOL\r\n");
        raw
    }

    #[tokio::test]
    async fn poll_ingests_and_sorts_files() {
        let dir = tempfile::tempdir().unwrap();
        let spool = SpoolDirectory::open(dir.path()).unwrap();
        let date = "Fri, 04 Dec 2020 10:15:00 +0000";
        fs::write(dir.path().join("1.eml"), eml("a@x", date, None)).unwrap();
        fs::write(dir.path().join("2.eml"), eml("b@x", date, Some("a@x"))).unwrap();
        fs::write(dir.path().join("3.eml"), eml("a@x", date, None)).unwrap();
        fs::write(dir.path().join("4.eml"), eml("c@x", "", None)).unwrap();
        fs::write(dir.path().join("5.eml"), "not a message").unwrap();

        let store = Arc::new(InMemoryStore::new());
        let pipeline = IngestionPipeline::new(
            store.clone(),
            SubjectNormalizer::new(["php-dev"]),
            ContentRenderer::default(),
        );
        let worker = SyncWorker::new(spool.clone(), pipeline, Duration::from_millis(10));

        let stats = worker.poll_once().await.unwrap();

        assert_eq!(stats.inserted, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.malformed, 2);
        assert!(spool.pending().unwrap().is_empty());
        assert_eq!(fs::read_dir(spool.processed_dir()).unwrap().count(), 3);
        assert_eq!(fs::read_dir(spool.failed_dir()).unwrap().count(), 2);

        let stored = store.message("a@x").await.unwrap().unwrap();
        assert_eq!(stored.rendered_content, "<p>Hello <code>PHP_EOL</code></p>");

        let again = worker.poll_once().await.unwrap();
        assert_eq!(again.total(), 0);
    }
}
