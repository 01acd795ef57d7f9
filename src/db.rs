use rocket_db_pools::{sqlx, Database};

#[derive(Database)]
#[database("archive_db")]
pub struct ArchiveDb(sqlx::PgPool);
