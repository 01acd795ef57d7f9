//! Read path: thread forests and single messages.
//!
//! Reads never write. The forest is rebuilt from the flat message list on every
//! call, so it always reflects the current store contents.

use crate::error::ArchiveError;
use crate::models::{Message, ReaderId, ThreadDetail, ThreadId};
use crate::store::{MessageStore, ThreadIndex};
use crate::threading::{ThreadForest, build_forest};

/// Reply forest of a thread, with read flags computed for `reader`.
///
/// An unknown thread yields an empty forest.
pub async fn thread_forest<S>(
    store: &S,
    thread_id: ThreadId,
    reader: Option<ReaderId>,
) -> Result<ThreadForest, ArchiveError>
where
    S: MessageStore + ?Sized,
{
    let messages = store.thread_messages(thread_id, reader).await?;
    log::trace!("building forest for thread {} from {} messages", thread_id, messages.len());
    Ok(build_forest(messages))
}

/// Thread metadata with its nested reply tree.
///
/// `None` for an unknown thread, and for a thread without messages: a thread is
/// created before its first message is written, so a failed first write leaves an
/// empty thread behind until the next message with that subject fills it.
pub async fn thread_detail<S>(
    store: &S,
    thread_id: ThreadId,
    reader: Option<ReaderId>,
) -> Result<Option<ThreadDetail>, ArchiveError>
where
    S: MessageStore + ThreadIndex + ?Sized,
{
    let Some(thread) = store.thread(thread_id).await? else {
        return Ok(None);
    };

    let forest = thread_forest(store, thread_id, reader).await?;
    if forest.is_empty() {
        log::debug!("thread {} has no messages yet", thread_id);
        return Ok(None);
    }
    let message_count = forest.len() as i64;

    Ok(Some(ThreadDetail {
        thread,
        message_count,
        roots: forest.into_items(),
    }))
}

pub async fn message<S>(store: &S, id: &str) -> Result<Option<Message>, ArchiveError>
where
    S: MessageStore + ?Sized,
{
    store.message(id).await
}
