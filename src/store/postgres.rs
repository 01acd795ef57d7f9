//! PostgreSQL implementation of the archive store.
//!
//! Uniqueness lives in the schema: the primary key on `emails.id` and the unique
//! index on `md5(threads.subject)`. Subject lookups go through the same digest so
//! subjects of any length stay indexable. Constraint violations are translated
//! into the archive error taxonomy here and nowhere else.

use async_trait::async_trait;
use rocket_db_pools::sqlx::{self, PgPool};

use super::{MessageStore, ThreadIndex};
use crate::error::{ArchiveError, is_foreign_key_violation, is_unique_violation};
use crate::models::{Message, MessageRow, ReaderId, Thread, ThreadId};

const EMAIL_COLUMNS: &str = "e.id, e.subject, e.content, e.original_content, e.thread_id, e.date, \
     e.from_email, e.from_name, e.in_reply_to";

#[derive(Debug, Clone)]
pub struct PgArchiveStore {
    pool: PgPool,
}

impl PgArchiveStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ThreadIndex for PgArchiveStore {
    async fn find_by_subject(&self, subject: &str) -> Result<Option<ThreadId>, ArchiveError> {
        let id = sqlx::query_scalar::<_, i32>(
            "SELECT id FROM threads WHERE md5(subject) = md5($1) AND subject = $1",
        )
        .bind(subject)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn create(&self, subject: &str) -> Result<ThreadId, ArchiveError> {
        let result = sqlx::query_scalar::<_, i32>("INSERT INTO threads (subject) VALUES ($1) RETURNING id")
            .bind(subject)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(id) => {
                log::debug!("created thread {} for subject `{}`", id, subject);
                Ok(id)
            }
            Err(err) if is_unique_violation(&err) => Err(ArchiveError::DuplicateThreadSubject {
                subject: subject.to_string(),
            }),
            Err(err) => {
                log::error!("failed to create thread `{}`: {}", subject, err);
                Err(err.into())
            }
        }
    }

    async fn thread(&self, id: ThreadId) -> Result<Option<Thread>, ArchiveError> {
        let thread = sqlx::query_as::<_, Thread>("SELECT id, subject FROM threads WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(thread)
    }
}

#[async_trait]
impl MessageStore for PgArchiveStore {
    async fn contains(&self, id: &str) -> Result<bool, ArchiveError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM emails WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn add(&self, message: &Message) -> Result<(), ArchiveError> {
        let result = sqlx::query(
            r#"
            INSERT INTO emails (
                id, subject, content, original_content, thread_id, date,
                from_email, from_name, in_reply_to
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&message.id)
        .bind(&message.subject)
        .bind(&message.rendered_content)
        .bind(&message.raw_content)
        .bind(message.thread_id)
        .bind(message.date)
        .bind(&message.sender.email)
        .bind(&message.sender.name)
        .bind(&message.in_reply_to)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(ArchiveError::DuplicateIdentifier {
                id: message.id.clone(),
            }),
            Err(err) if is_foreign_key_violation(&err) => Err(ArchiveError::StoreInconsistency(
                format!("thread {} of message {} does not exist", message.thread_id, message.id),
            )),
            Err(err) => {
                log::error!("failed to insert message {}: {}", message.id, err);
                Err(err.into())
            }
        }
    }

    async fn thread_messages(
        &self,
        thread_id: ThreadId,
        reader: Option<ReaderId>,
    ) -> Result<Vec<Message>, ArchiveError> {
        let query = format!(
            "SELECT {}, (r.email_id IS NOT NULL) AS was_read FROM emails e \
             LEFT JOIN user_emails_read r ON r.email_id = e.id AND r.user_id = $2 \
             WHERE e.thread_id = $1 \
             ORDER BY e.date ASC, e.id ASC",
            EMAIL_COLUMNS
        );

        let rows = sqlx::query_as::<_, MessageRow>(&query)
            .bind(thread_id)
            .bind(reader)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Message::from).collect())
    }

    async fn update_rendered_content(&self, id: &str, rendered: &str) -> Result<bool, ArchiveError> {
        let result = sqlx::query("UPDATE emails SET content = $2 WHERE id = $1")
            .bind(id)
            .bind(rendered)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_in_thread(&self, thread_id: ThreadId) -> Result<i64, ArchiveError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM emails WHERE thread_id = $1")
            .bind(thread_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn message(&self, id: &str) -> Result<Option<Message>, ArchiveError> {
        let query = format!(
            "SELECT {}, FALSE AS was_read FROM emails e \
             WHERE e.id = $1",
            EMAIL_COLUMNS
        );

        let row = sqlx::query_as::<_, MessageRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Message::from))
    }

    async fn all_messages(&self) -> Result<Vec<Message>, ArchiveError> {
        let query = format!(
            "SELECT {}, FALSE AS was_read FROM emails e \
             ORDER BY e.date ASC, e.id ASC",
            EMAIL_COLUMNS
        );

        let rows = sqlx::query_as::<_, MessageRow>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Message::from).collect())
    }
}
