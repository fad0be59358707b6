//! Bucket creation and deletion.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::server::error::ApiError;
use crate::server::state::AppState;

/// Response for bucket operations.
#[derive(Serialize)]
pub struct BucketResponse {
    pub bucket: String,
    pub message: String,
}

/// Create a bucket. `201` when created, `200` when it already existed.
pub async fn create_bucket(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
) -> Result<(StatusCode, Json<BucketResponse>), ApiError> {
    let created = state.catalog.create_bucket(&bucket)?;
    let (status, message) = if created {
        (StatusCode::CREATED, format!("Bucket '{}' created.", bucket))
    } else {
        (StatusCode::OK, format!("Bucket '{}' already exists.", bucket))
    };
    Ok((status, Json(BucketResponse { bucket, message })))
}

/// Delete a bucket and everything in it.
pub async fn delete_bucket(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
) -> Result<Json<BucketResponse>, ApiError> {
    state.catalog.delete_bucket(&bucket)?;
    let message = format!("Bucket '{}' deleted.", bucket);
    Ok(Json(BucketResponse { bucket, message }))
}
