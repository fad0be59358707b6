//! Single files stored at the top level of a bucket.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use classfold::ObjectInfo;
use serde::Serialize;

use super::datasets::content_type;
use super::DeletedResponse;
use crate::server::error::ApiError;
use crate::server::state::AppState;

/// Response header carrying the metadata stored with a file.
pub const METADATA_HEADER: &str = "x-classfold-metadata";

#[derive(Serialize)]
pub struct FileUploadResponse {
    pub message: String,
    pub overwritten: bool,
    pub object: ObjectInfo,
}

/// Upload multipart field `file`, with an optional text field `metadata`.
///
/// `201` for a new file, `200` when an existing file was replaced.
pub async fn upload_file(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<FileUploadResponse>), ApiError> {
    let mut upload = None;
    let mut metadata = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        match field.name().map(str::to_string).as_deref() {
            Some("file") => {
                let file_name = field.file_name().map(str::to_string).ok_or_else(|| {
                    ApiError::BadRequest("Upload has no file name.".to_string())
                })?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                upload = Some((file_name, bytes));
            }
            Some("metadata") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                metadata = Some(text);
            }
            _ => {}
        }
    }
    let (file_name, bytes) = upload
        .ok_or_else(|| ApiError::BadRequest("Missing multipart field 'file'.".to_string()))?;

    let catalog = state.catalog.clone();
    let name = file_name.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        catalog.upload_file(&bucket, &name, &bytes, metadata.as_deref())
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    let (status, message) = if outcome.overwritten {
        (
            StatusCode::OK,
            format!("File '{}' already existed and was overwritten.", file_name),
        )
    } else {
        (StatusCode::CREATED, format!("File '{}' uploaded.", file_name))
    };
    Ok((
        status,
        Json(FileUploadResponse {
            message,
            overwritten: outcome.overwritten,
            object: outcome.object,
        }),
    ))
}

/// Return the file bytes; stored metadata comes back in [`METADATA_HEADER`].
pub async fn get_file(
    State(state): State<AppState>,
    Path((bucket, file)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let (info, data) = state.catalog.get_file(&bucket, &file)?;
    let mut response = ([(header::CONTENT_TYPE, content_type(&file))], data).into_response();
    if let Some(value) = info
        .metadata
        .as_deref()
        .and_then(|m| HeaderValue::from_str(m).ok())
    {
        response.headers_mut().insert(METADATA_HEADER, value);
    }
    Ok(response)
}

pub async fn delete_file(
    State(state): State<AppState>,
    Path((bucket, file)): Path<(String, String)>,
) -> Result<Json<DeletedResponse>, ApiError> {
    state.catalog.delete_file(&bucket, &file)?;
    Ok(Json(DeletedResponse {
        message: format!("File '{}' deleted.", file),
        objects_deleted: 1,
    }))
}
