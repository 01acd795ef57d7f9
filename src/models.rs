use chrono::{DateTime, Utc};
use rocket_db_pools::sqlx::FromRow;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Store-assigned thread identifier.
pub type ThreadId = i32;

/// Identifier of a viewer in the read-status table.
pub type ReaderId = i32;

// ===== Archive Models =====

/// Sender of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Sender {
    pub email: String,
    pub name: Option<String>,
}

/// A stored message.
///
/// Everything except `rendered_content` and `read` is fixed at ingestion time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Message {
    pub id: String,
    pub subject: String,
    pub raw_content: String,
    pub rendered_content: String,
    pub thread_id: ThreadId,
    pub date: DateTime<Utc>,
    pub sender: Sender,
    pub in_reply_to: Option<String>,
    pub read: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, JsonSchema)]
pub struct Thread {
    pub id: ThreadId,
    /// Normalized subject shared by every message of the thread.
    pub subject: String,
}

/// A message as delivered by the inbound source, before ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: String,
    pub subject: String,
    pub date: Option<DateTime<Utc>>,
    pub text_body: String,
    pub sender_email: String,
    pub sender_name: Option<String>,
    pub in_reply_to: Option<String>,
}

/// Row shape of the `emails` table joined with the read-status flag.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct MessageRow {
    pub id: String,
    pub subject: String,
    pub content: String,
    pub original_content: String,
    pub thread_id: i32,
    pub date: DateTime<Utc>,
    pub from_email: String,
    pub from_name: Option<String>,
    pub in_reply_to: Option<String>,
    pub was_read: bool,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            subject: row.subject,
            raw_content: row.original_content,
            rendered_content: row.content,
            thread_id: row.thread_id,
            date: row.date,
            sender: Sender {
                email: row.from_email,
                name: row.from_name,
            },
            in_reply_to: row.in_reply_to,
            read: row.was_read,
        }
    }
}

// ===== Extended Structs for API Responses =====

/// One message of a thread with its replies, in attachment order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ThreadItem {
    pub message: Message,
    pub replies: Vec<ThreadItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ThreadDetail {
    pub thread: Thread,
    pub message_count: i64,
    pub roots: Vec<ThreadItem>,
}
