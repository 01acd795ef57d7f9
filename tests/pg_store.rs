use std::sync::Arc;

use archive_server::content::ContentRenderer;
use archive_server::error::ArchiveError;
use archive_server::ingest::{IngestResult, IngestionPipeline};
use archive_server::models::{IncomingMessage, Message, Sender};
use archive_server::store::{MessageStore, PgArchiveStore, ThreadIndex};
use archive_server::test_support::{TestDatabase, TestDatabaseError, TestFixtures};
use archive_server::threading::SubjectNormalizer;
use chrono::{TimeZone, Utc};

async fn database() -> Option<TestDatabase> {
    match TestDatabase::new_from_env().await {
        Ok(db) => Some(db),
        Err(TestDatabaseError::MissingUrl) => {
            eprintln!("skipping postgres store test: TEST_DATABASE_URL not set");
            None
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    }
}

fn message(id: &str, thread_id: i32, minute: u32, in_reply_to: Option<&str>) -> Message {
    Message {
        id: id.to_string(),
        subject: "Re: Enums".to_string(),
        raw_content: "raw".to_string(),
        rendered_content: "<p>raw</p>".to_string(),
        thread_id,
        date: Utc.with_ymd_and_hms(2020, 12, 4, 10, minute, 0).unwrap(),
        sender: Sender {
            email: "dev@example.com".to_string(),
            name: Some("Dev".to_string()),
        },
        in_reply_to: in_reply_to.map(str::to_string),
        read: false,
    }
}

#[tokio::test]
async fn constraint_violations_map_to_archive_errors() {
    let Some(test_db) = database().await else {
        return;
    };
    let store = PgArchiveStore::new(test_db.pool_clone());

    let thread_id = store.create("Enums").await.expect("thread created");
    assert!(matches!(
        store.create("Enums").await,
        Err(ArchiveError::DuplicateThreadSubject { .. })
    ));
    assert_eq!(store.find_by_subject("Enums").await.unwrap(), Some(thread_id));

    store.add(&message("a@x", thread_id, 0, None)).await.expect("message stored");
    assert!(matches!(
        store.add(&message("a@x", thread_id, 1, None)).await,
        Err(ArchiveError::DuplicateIdentifier { .. })
    ));
    assert!(matches!(
        store.add(&message("b@x", thread_id + 100, 1, None)).await,
        Err(ArchiveError::StoreInconsistency(_))
    ));
    assert!(store.contains("a@x").await.unwrap());
    assert_eq!(store.count_in_thread(thread_id).await.unwrap(), 1);

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn thread_messages_are_ordered_with_read_flags() {
    let Some(test_db) = database().await else {
        return;
    };
    let store = PgArchiveStore::new(test_db.pool_clone());
    let thread_id = store.create("Enums").await.unwrap();

    store.add(&message("c@x", thread_id, 30, Some("a@x"))).await.unwrap();
    store.add(&message("b@x", thread_id, 10, Some("a@x"))).await.unwrap();
    store.add(&message("a@x", thread_id, 0, None)).await.unwrap();
    TestFixtures::new(test_db.pool()).mark_read(5, "b@x").await.unwrap();

    let messages = store.thread_messages(thread_id, Some(5)).await.unwrap();
    let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["a@x", "b@x", "c@x"]);
    assert!(messages[1].read);
    assert!(!messages[0].read);

    let other_reader = store.thread_messages(thread_id, Some(6)).await.unwrap();
    assert!(other_reader.iter().all(|m| !m.read));

    assert!(store.update_rendered_content("b@x", "<p>fresh</p>").await.unwrap());
    let updated = store.message("b@x").await.unwrap().unwrap();
    assert_eq!(updated.rendered_content, "<p>fresh</p>");
    assert_eq!(updated.raw_content, "raw");
    assert_eq!(store.all_messages().await.unwrap().len(), 3);

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn concurrent_ingestion_creates_one_thread() {
    let Some(test_db) = database().await else {
        return;
    };
    let store = Arc::new(PgArchiveStore::new(test_db.pool_clone()));
    let pipeline = IngestionPipeline::new(
        store.clone(),
        SubjectNormalizer::new(["PHP-DEV"]),
        ContentRenderer::default(),
    );

    let mut handles = Vec::new();
    for i in 0..8 {
        let pipeline = pipeline.clone();
        handles.push(tokio::spawn(async move {
            pipeline
                .ingest(IncomingMessage {
                    id: format!("m{}@x", i % 4),
                    subject: "Re: [PHP-DEV] Race".to_string(),
                    date: Some(Utc.with_ymd_and_hms(2020, 12, 4, 10, i, 0).unwrap()),
                    text_body: "body".to_string(),
                    sender_email: "dev@example.com".to_string(),
                    sender_name: None,
                    in_reply_to: None,
                })
                .await
        }));
    }

    let mut inserted = 0;
    for handle in handles {
        match handle.await.unwrap().expect("ingestion succeeds") {
            IngestResult::Inserted { .. } => inserted += 1,
            IngestResult::SkippedDuplicate => {}
        }
    }

    assert_eq!(inserted, 4);
    let thread_id = store.find_by_subject("Race").await.unwrap().expect("thread exists");
    assert_eq!(store.count_in_thread(thread_id).await.unwrap(), 4);

    test_db.close().await.expect("failed to drop test database");
}

/// Letters from a linear congruential generator, so the text does not compress.
fn noisy_text(len: usize, mut state: u64) -> String {
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (b'a' + ((state >> 33) % 26) as u8) as char
        })
        .collect()
}

#[tokio::test]
async fn long_subjects_and_references_are_ingested() {
    let Some(test_db) = database().await else {
        return;
    };
    let store = Arc::new(PgArchiveStore::new(test_db.pool_clone()));
    let pipeline = IngestionPipeline::new(
        store.clone(),
        SubjectNormalizer::default(),
        ContentRenderer::default(),
    );
    let subject = noisy_text(4000, 7);
    let incoming = |id: &str, subject: String, in_reply_to: Option<String>| IncomingMessage {
        id: id.to_string(),
        subject,
        date: Some(Utc.with_ymd_and_hms(2020, 12, 4, 10, 0, 0).unwrap()),
        text_body: "body".to_string(),
        sender_email: "dev@example.com".to_string(),
        sender_name: None,
        in_reply_to,
    };

    let first = pipeline
        .ingest(incoming("a@x", subject.clone(), None))
        .await
        .expect("long subject stored");
    let IngestResult::Inserted { thread_id, new_thread: true } = first else {
        panic!("expected a new thread, got {:?}", first);
    };

    let reply = pipeline
        .ingest(incoming("b@x", format!("Re: {}", subject), Some(noisy_text(4000, 11))))
        .await
        .expect("long reference stored");
    assert_eq!(
        reply,
        IngestResult::Inserted {
            thread_id,
            new_thread: false,
        }
    );
    assert_eq!(store.find_by_subject(&subject).await.unwrap(), Some(thread_id));
    assert_eq!(store.find_by_subject(&noisy_text(4000, 13)).await.unwrap(), None);
    assert!(matches!(
        store.create(&subject).await,
        Err(ArchiveError::DuplicateThreadSubject { .. })
    ));

    let long_id = format!("{}@x", noisy_text(4000, 17));
    assert!(matches!(
        pipeline.ingest(incoming(&long_id, "Enums".to_string(), None)).await,
        Err(ArchiveError::MalformedMessage(_))
    ));
    assert_eq!(store.count_in_thread(thread_id).await.unwrap(), 2);

    test_db.close().await.expect("failed to drop test database");
}
