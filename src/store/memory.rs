//! In-memory archive store.
//!
//! Backed by concurrent maps so it can be shared across tasks the same way the
//! Postgres store is. Used by tests and by embedders that do not need durability.

use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};

use super::{MessageStore, ThreadIndex};
use crate::error::ArchiveError;
use crate::models::{Message, ReaderId, Thread, ThreadId};

#[derive(Debug)]
pub struct InMemoryStore {
    messages: DashMap<String, Message>,
    thread_ids: DashMap<String, ThreadId>,
    thread_subjects: DashMap<ThreadId, String>,
    read_status: DashSet<(ReaderId, String)>,
    next_thread_id: AtomicI32,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            messages: DashMap::new(),
            thread_ids: DashMap::new(),
            thread_subjects: DashMap::new(),
            read_status: DashSet::new(),
            next_thread_id: AtomicI32::new(1),
        }
    }

    /// Record that `reader` has seen message `id`.
    pub fn mark_read(&self, reader: ReaderId, id: &str) {
        self.read_status.insert((reader, id.to_string()));
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn thread_count(&self) -> usize {
        self.thread_subjects.len()
    }

    fn sorted(mut messages: Vec<Message>) -> Vec<Message> {
        messages.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        messages
    }
}

#[async_trait]
impl ThreadIndex for InMemoryStore {
    async fn find_by_subject(&self, subject: &str) -> Result<Option<ThreadId>, ArchiveError> {
        Ok(self.thread_ids.get(subject).map(|id| *id))
    }

    async fn create(&self, subject: &str) -> Result<ThreadId, ArchiveError> {
        match self.thread_ids.entry(subject.to_string()) {
            Entry::Occupied(_) => Err(ArchiveError::DuplicateThreadSubject {
                subject: subject.to_string(),
            }),
            Entry::Vacant(slot) => {
                let id = self.next_thread_id.fetch_add(1, Ordering::SeqCst);
                self.thread_subjects.insert(id, subject.to_string());
                slot.insert(id);
                Ok(id)
            }
        }
    }

    async fn thread(&self, id: ThreadId) -> Result<Option<Thread>, ArchiveError> {
        Ok(self.thread_subjects.get(&id).map(|subject| Thread {
            id,
            subject: subject.clone(),
        }))
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn contains(&self, id: &str) -> Result<bool, ArchiveError> {
        Ok(self.messages.contains_key(id))
    }

    async fn add(&self, message: &Message) -> Result<(), ArchiveError> {
        if !self.thread_subjects.contains_key(&message.thread_id) {
            return Err(ArchiveError::StoreInconsistency(format!(
                "thread {} of message {} does not exist",
                message.thread_id, message.id
            )));
        }

        match self.messages.entry(message.id.clone()) {
            Entry::Occupied(_) => Err(ArchiveError::DuplicateIdentifier {
                id: message.id.clone(),
            }),
            Entry::Vacant(slot) => {
                let mut stored = message.clone();
                stored.read = false;
                slot.insert(stored);
                Ok(())
            }
        }
    }

    async fn thread_messages(
        &self,
        thread_id: ThreadId,
        reader: Option<ReaderId>,
    ) -> Result<Vec<Message>, ArchiveError> {
        let messages = self
            .messages
            .iter()
            .filter(|entry| entry.thread_id == thread_id)
            .map(|entry| {
                let mut message = entry.value().clone();
                message.read = reader
                    .map(|reader| self.read_status.contains(&(reader, message.id.clone())))
                    .unwrap_or(false);
                message
            })
            .collect();

        Ok(Self::sorted(messages))
    }

    async fn update_rendered_content(&self, id: &str, rendered: &str) -> Result<bool, ArchiveError> {
        match self.messages.get_mut(id) {
            Some(mut message) => {
                message.rendered_content = rendered.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_in_thread(&self, thread_id: ThreadId) -> Result<i64, ArchiveError> {
        let count = self
            .messages
            .iter()
            .filter(|entry| entry.thread_id == thread_id)
            .count();
        Ok(count as i64)
    }

    async fn message(&self, id: &str) -> Result<Option<Message>, ArchiveError> {
        Ok(self.messages.get(id).map(|message| message.clone()))
    }

    async fn all_messages(&self) -> Result<Vec<Message>, ArchiveError> {
        let messages = self.messages.iter().map(|entry| entry.value().clone()).collect();
        Ok(Self::sorted(messages))
    }
}
