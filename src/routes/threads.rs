//! Thread endpoints.

use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;

use crate::error::ApiError;
use crate::models::{ReaderId, ThreadDetail, ThreadId};
use crate::reader;
use crate::store::{ArchiveStore, SharedStore};

/// Retrieve a thread with its messages arranged as a reply forest.
///
/// Replies whose parent is not part of the thread appear as additional roots.
/// With `reader`, each message carries that reader's read flag.
#[openapi(tag = "Threads")]
#[get("/threads/<thread_id>?<reader>")]
pub async fn get_thread(
    store: &State<SharedStore>,
    thread_id: ThreadId,
    reader: Option<ReaderId>,
) -> Result<Json<ThreadDetail>, ApiError> {
    let store: &dyn ArchiveStore = store.inner().as_ref();
    let detail = reader::thread_detail(store, thread_id, reader)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Thread {} not found", thread_id)))?;

    Ok(Json(detail))
}
