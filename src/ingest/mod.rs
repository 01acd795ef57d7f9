//! Inbound side of the archive: raw message parsing and the ingestion pipeline.

pub mod parser;
pub mod pipeline;

pub use parser::{ParseEmailError, parse_email};
pub use pipeline::{IngestResult, IngestStats, IngestionPipeline};
