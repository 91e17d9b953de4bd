use axum::body::Body;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BodyError {
    #[error("failed to read request body: {0}")]
    Read(#[from] axum::Error),
    #[error("request body is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Buffers the whole request body, then decodes it as one JSON document.
/// No size limit is applied; shape checks belong to the caller.
pub async fn read_json(body: Body) -> Result<Value, BodyError> {
    let bytes = axum::body::to_bytes(body, usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
