//! Persistence seams of the archive.
//!
//! The ingestion pipeline and the read path only talk to these traits. Uniqueness of
//! message ids and thread subjects is enforced by the implementation, which reports
//! conflicts as [`ArchiveError::DuplicateIdentifier`] and
//! [`ArchiveError::DuplicateThreadSubject`].

pub mod memory;
pub mod migration;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ArchiveError;
use crate::models::{Message, ReaderId, Thread, ThreadId};

pub use memory::InMemoryStore;
pub use migration::run_migrations;
pub use postgres::PgArchiveStore;

/// Lookup and lazy creation of threads keyed by normalized subject.
#[async_trait]
pub trait ThreadIndex: Send + Sync {
    async fn find_by_subject(&self, subject: &str) -> Result<Option<ThreadId>, ArchiveError>;

    /// Create a thread for `subject`.
    ///
    /// Fails with `DuplicateThreadSubject` when another thread already owns the subject.
    async fn create(&self, subject: &str) -> Result<ThreadId, ArchiveError>;

    async fn thread(&self, id: ThreadId) -> Result<Option<Thread>, ArchiveError>;
}

/// Message persistence.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn contains(&self, id: &str) -> Result<bool, ArchiveError>;

    /// Persist a message in one atomic step.
    ///
    /// Fails with `DuplicateIdentifier` when the id is already stored.
    async fn add(&self, message: &Message) -> Result<(), ArchiveError>;

    /// Messages of a thread ordered by date, then id.
    ///
    /// `read` is set from the read-status table for `reader`, or false without one.
    async fn thread_messages(
        &self,
        thread_id: ThreadId,
        reader: Option<ReaderId>,
    ) -> Result<Vec<Message>, ArchiveError>;

    /// Replace the rendered body. Returns false when no message has this id.
    async fn update_rendered_content(&self, id: &str, rendered: &str) -> Result<bool, ArchiveError>;

    async fn count_in_thread(&self, thread_id: ThreadId) -> Result<i64, ArchiveError>;

    async fn message(&self, id: &str) -> Result<Option<Message>, ArchiveError>;

    /// Every stored message ordered by date, then id.
    async fn all_messages(&self) -> Result<Vec<Message>, ArchiveError>;
}

/// A store providing both seams, as shared through Rocket state.
pub trait ArchiveStore: MessageStore + ThreadIndex {}

impl<T: MessageStore + ThreadIndex> ArchiveStore for T {}

/// Store handle shared with request handlers and background tasks.
pub type SharedStore = Arc<dyn ArchiveStore>;
