//! Inbound synchronization from the spool directory.
//!
//! The mail transport is an external collaborator that writes raw messages into a
//! spool directory. This module turns that directory into a stream of ingestions.
//!
//! # Architecture
//!
//! ```text
//! SyncWorker::run (tokio task, polls every ARCHIVE_POLL_INTERVAL_MS)
//!   -> SpoolDirectory::pending          (*.eml in the spool root)
//!   -> parse_files_parallel             (rayon pool, num_cpus threads)
//!   -> IngestionPipeline::ingest        (one message at a time)
//!   -> SpoolDirectory::mark_processed / mark_failed
//! ```

pub mod spool;
pub mod worker;

pub use spool::{SpoolDirectory, SpoolError, parse_files_parallel};
pub use worker::SyncWorker;
