use axum::extract::FromRequest;

use crate::error::AppError;

/// Request body extractor: `axum::Json`, but malformed or incomplete bodies
/// are rejected with the usual `{ "error": ... }` 400 response.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);
