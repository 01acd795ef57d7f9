//! Ingestion pipeline
//!
//! Takes one inbound message to at most one stored message.
//!
//! ## Steps
//!
//! 1. Reject messages without an id or a date, or with an oversized id, as malformed
//! 2. Skip ids the store already holds
//! 3. Normalize the subject and render the body
//! 4. Resolve the thread for the normalized subject, creating it on first use
//! 5. Persist the message
//!
//! Concurrent ingestion is safe: the store's uniqueness constraints decide races,
//! and the pipeline maps the losing side back to a skip or a re-resolution.

use std::io;
use std::sync::Arc;

use crate::config::ArchiveConfig;
use crate::content::ContentRenderer;
use crate::error::ArchiveError;
use crate::models::{IncomingMessage, Message, Sender, ThreadId};
use crate::store::ArchiveStore;
use crate::threading::SubjectNormalizer;

/// Longest accepted message id in bytes, the RFC 5322 limit for a header line.
pub const MAX_IDENTIFIER_LEN: usize = 998;

/// Outcome of ingesting one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestResult {
    Inserted { thread_id: ThreadId, new_thread: bool },
    SkippedDuplicate,
}

/// Counters for a batch of ingestions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub inserted: usize,
    pub new_threads: usize,
    pub skipped: usize,
    pub malformed: usize,
    pub failed: usize,
}

impl IngestStats {
    pub fn record(&mut self, outcome: &Result<IngestResult, ArchiveError>) {
        match outcome {
            Ok(IngestResult::Inserted { new_thread, .. }) => {
                self.inserted += 1;
                if *new_thread {
                    self.new_threads += 1;
                }
            }
            Ok(IngestResult::SkippedDuplicate) => self.skipped += 1,
            Err(ArchiveError::MalformedMessage(_)) => self.malformed += 1,
            Err(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.inserted + self.skipped + self.malformed + self.failed
    }
}

#[derive(Clone)]
pub struct IngestionPipeline {
    store: Arc<dyn ArchiveStore>,
    normalizer: SubjectNormalizer,
    renderer: ContentRenderer,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<dyn ArchiveStore>,
        normalizer: SubjectNormalizer,
        renderer: ContentRenderer,
    ) -> Self {
        Self {
            store,
            normalizer,
            renderer,
        }
    }

    /// Pipeline with the subject tags, signature markers and vocabulary of `config`.
    pub fn from_config(store: Arc<dyn ArchiveStore>, config: &ArchiveConfig) -> io::Result<Self> {
        let renderer = ContentRenderer::from_config(config)?;
        let normalizer = SubjectNormalizer::new(&config.subject_tags);
        Ok(Self::new(store, normalizer, renderer))
    }

    /// Ingest one message.
    ///
    /// Duplicates are reported as `SkippedDuplicate`, never as errors.
    pub async fn ingest(&self, incoming: IncomingMessage) -> Result<IngestResult, ArchiveError> {
        if incoming.id.trim().is_empty() {
            return Err(ArchiveError::MalformedMessage(format!(
                "message `{}` has no identifier",
                incoming.subject
            )));
        }
        if incoming.id.len() > MAX_IDENTIFIER_LEN {
            return Err(ArchiveError::MalformedMessage(format!(
                "message `{}` has a {} byte identifier",
                incoming.subject,
                incoming.id.len()
            )));
        }
        let Some(date) = incoming.date else {
            return Err(ArchiveError::MalformedMessage(format!(
                "message {} has no date",
                incoming.id
            )));
        };

        if self.store.contains(&incoming.id).await? {
            log::trace!("message {} already archived", incoming.id);
            return Ok(IngestResult::SkippedDuplicate);
        }

        let normalized = self.normalizer.normalize(&incoming.subject);
        let rendered = self.renderer.render(&incoming.text_body);
        let (thread_id, new_thread) = self.resolve_thread(&normalized).await?;

        let message = Message {
            id: incoming.id,
            subject: incoming.subject,
            raw_content: incoming.text_body,
            rendered_content: rendered,
            thread_id,
            date,
            sender: Sender {
                email: incoming.sender_email,
                name: incoming.sender_name,
            },
            in_reply_to: incoming.in_reply_to,
            read: false,
        };

        match self.store.add(&message).await {
            Ok(()) => {
                log::debug!("archived {} in thread {}", message.id, thread_id);
                Ok(IngestResult::Inserted {
                    thread_id,
                    new_thread,
                })
            }
            Err(ArchiveError::DuplicateIdentifier { id }) => {
                log::debug!("message {} archived concurrently, skipping", id);
                Ok(IngestResult::SkippedDuplicate)
            }
            Err(err) => Err(err),
        }
    }

    async fn resolve_thread(&self, subject: &str) -> Result<(ThreadId, bool), ArchiveError> {
        if let Some(id) = self.store.find_by_subject(subject).await? {
            return Ok((id, false));
        }

        match self.store.create(subject).await {
            Ok(id) => Ok((id, true)),
            Err(ArchiveError::DuplicateThreadSubject { .. }) => {
                log::debug!("thread `{}` created concurrently, re-resolving", subject);
                match self.store.find_by_subject(subject).await? {
                    Some(id) => Ok((id, false)),
                    None => Err(ArchiveError::StoreInconsistency(format!(
                        "thread `{}` rejected as duplicate but not found",
                        subject
                    ))),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Ingest messages in order, logging failures and continuing with the rest.
    pub async fn ingest_batch<I>(&self, messages: I) -> IngestStats
    where
        I: IntoIterator<Item = IncomingMessage>,
    {
        let mut stats = IngestStats::default();

        for incoming in messages {
            let id = incoming.id.clone();
            let outcome = self.ingest(incoming).await;
            match &outcome {
                Err(ArchiveError::MalformedMessage(reason)) => {
                    log::warn!("skipping malformed message: {}", reason)
                }
                Err(err) => log::error!("failed to ingest {}: {}", id, err),
                Ok(_) => {}
            }
            stats.record(&outcome);
        }

        log::info!(
            "ingested {} messages: {} inserted ({} new threads), {} duplicates, {} malformed, {} failed",
            stats.total(),
            stats.inserted,
            stats.new_threads,
            stats.skipped,
            stats.malformed,
            stats.failed
        );
        stats
    }

    /// Recompute the rendered body of every stored message. Returns the number updated.
    pub async fn rerender_all(&self) -> Result<usize, ArchiveError> {
        let messages = self.store.all_messages().await?;
        let mut updated = 0;

        for message in messages {
            let rendered = self.renderer.render(&message.raw_content);
            if rendered == message.rendered_content {
                continue;
            }
            if self.store.update_rendered_content(&message.id, &rendered).await? {
                updated += 1;
            }
        }

        log::info!("re-rendered {} messages", updated);
        Ok(updated)
    }
}
