use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::{Request, Response};
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::Responses;
use rocket_okapi::response::OpenApiResponderInner;
use rocket_okapi::util::add_schema_response;
use schemars::JsonSchema;
use serde::Serialize;
use std::io::Cursor;
use thiserror::Error;

/// SQLSTATE raised by PostgreSQL for unique constraint violations.
pub(crate) const UNIQUE_VIOLATION: &str = "23505";

/// SQLSTATE raised by PostgreSQL when a referenced row does not exist.
pub(crate) const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Failures of the ingestion pipeline and its storage collaborators.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The store already holds a message with this identifier.
    #[error("message {id} is already stored")]
    DuplicateIdentifier { id: String },
    /// The store already holds a thread with this normalized subject.
    #[error("thread with subject `{subject}` already exists")]
    DuplicateThreadSubject { subject: String },
    /// A uniqueness guarantee of the store did not hold.
    #[error("store inconsistency: {0}")]
    StoreInconsistency(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),
    /// Required fields are missing from an inbound message.
    #[error("malformed message: {0}")]
    MalformedMessage(String),
}

/// Returns true when `err` is a unique constraint violation reported by the database.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    has_sqlstate(err, UNIQUE_VIOLATION)
}

pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    has_sqlstate(err, FOREIGN_KEY_VIOLATION)
}

fn has_sqlstate(err: &sqlx::Error, sqlstate: &str) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err)
            if db_err
                .code()
                .map(|code| code == sqlstate)
                .unwrap_or(false)
    )
}

#[derive(Debug)]
pub enum ApiError {
    DatabaseError(sqlx::Error),
    NotFound(String),
    BadRequest(String),
    InternalError(String),
}

#[derive(Serialize, JsonSchema)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let (status, error_type, message) = match self {
            ApiError::DatabaseError(e) => {
                log::error!("database error: {}", e);
                (Status::InternalServerError, "DatabaseError", e.to_string())
            }
            ApiError::NotFound(msg) => {
                log::debug!("not found: {}", msg);
                (Status::NotFound, "NotFound", msg)
            }
            ApiError::BadRequest(msg) => {
                log::debug!("bad request: {}", msg);
                (Status::BadRequest, "BadRequest", msg)
            }
            ApiError::InternalError(msg) => {
                log::error!("internal error: {}", msg);
                (Status::InternalServerError, "InternalError", msg)
            }
        };

        let error_response = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        let json = serde_json::to_string(&error_response)
            .unwrap_or_else(|_| r#"{"error":"SerializationError","message":"Failed to serialize error"}"#.to_string());

        Response::build()
            .status(status)
            .header(rocket::http::ContentType::JSON)
            .sized_body(json.len(), Cursor::new(json))
            .ok()
    }
}

impl OpenApiResponderInner for ApiError {
    fn responses(generator: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        let mut responses = Responses::default();
        let schema = generator.json_schema::<ErrorResponse>();
        add_schema_response(&mut responses, 400, "application/json", schema.clone())?;
        add_schema_response(&mut responses, 404, "application/json", schema.clone())?;
        add_schema_response(&mut responses, 500, "application/json", schema)?;
        Ok(responses)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            _ => ApiError::DatabaseError(err),
        }
    }
}

impl From<ArchiveError> for ApiError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::StoreUnavailable(e) => ApiError::from(e),
            ArchiveError::MalformedMessage(msg) => ApiError::BadRequest(msg),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}
