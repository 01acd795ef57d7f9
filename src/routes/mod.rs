//! HTTP route handlers grouped by resource domain.
//!
//! Handlers read through the [`SharedStore`](crate::store::SharedStore) kept in
//! Rocket state and are annotated with `#[openapi]` so `rocket_okapi` can derive
//! an OpenAPI document automatically.

pub mod emails;
pub mod health;
pub mod threads;
