//! Email-centric endpoints.

use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;

use crate::error::ApiError;
use crate::models::Message;
use crate::reader;
use crate::store::{ArchiveStore, SharedStore};

/// Retrieve a single message by its Message-ID (without angle brackets).
#[openapi(tag = "Emails")]
#[get("/emails/<email_id>")]
pub async fn get_email(store: &State<SharedStore>, email_id: String) -> Result<Json<Message>, ApiError> {
    let store: &dyn ArchiveStore = store.inner().as_ref();
    let message = reader::message(store, &email_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Email {} not found", email_id)))?;

    Ok(Json(message))
}
