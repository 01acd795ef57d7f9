use archive_server::store::migration::reset_database;
use archive_server::test_support::{TestDatabase, TestDatabaseError};
use sqlx::PgPool;
use sqlx::migrate::Migrator;

static TEST_MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn table_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = 'public' \
         AND table_name IN ('threads', 'emails', 'user_emails_read')",
    )
    .fetch_one(pool)
    .await
    .expect("lookup succeeded")
}

#[tokio::test]
async fn migrations_apply_and_revert_cleanly() {
    let test_db = match TestDatabase::new_from_env().await {
        Ok(db) => db,
        Err(TestDatabaseError::MissingUrl) => {
            eprintln!("skipping migration revert test: TEST_DATABASE_URL not set");
            return;
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    };

    let pool = test_db.pool_clone();

    TEST_MIGRATOR.run(&pool).await.expect("migrations run");
    assert_eq!(table_count(&pool).await, 3);

    TEST_MIGRATOR
        .undo(&pool, 0)
        .await
        .expect("migrations revert");
    assert_eq!(table_count(&pool).await, 0, "archive tables should be dropped after revert");

    reset_database(&pool).await.expect("reset succeeds");
    assert_eq!(table_count(&pool).await, 3);

    test_db.close().await.expect("failed to drop test database");
}
