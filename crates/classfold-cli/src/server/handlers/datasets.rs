//! Dataset upload, listing, download and deletion.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use classfold::config::{DEFAULT_FILES_PER_CLASS, DEFAULT_NUM_CLASSES};
use classfold::{IngestReport, IngestRequest, ObjectInfo, ValidationConfig};
use serde::{Deserialize, Serialize};

use crate::server::error::ApiError;
use crate::server::state::AppState;

/// Query parameters for an archive upload.
#[derive(Debug, Deserialize)]
pub struct UploadParams {
    #[serde(default = "default_num_classes")]
    pub expected_num_classes: usize,
    #[serde(default = "default_files_per_class")]
    pub expected_files_per_class: usize,
    /// Store under this name instead of the archive's dataset folder name.
    pub dataset_name: Option<String>,
}

fn default_num_classes() -> usize {
    DEFAULT_NUM_CLASSES
}

fn default_files_per_class() -> usize {
    DEFAULT_FILES_PER_CLASS
}

/// Upload a `.zip` archive as multipart field `file`.
pub async fn upload_dataset(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<IngestReport>), ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("Upload has no file name.".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        upload = Some((file_name, bytes.to_vec()));
    }
    let (file_name, payload) = upload
        .ok_or_else(|| ApiError::BadRequest("Missing multipart field 'file'.".to_string()))?;

    let config = ValidationConfig::new(params.expected_num_classes, params.expected_files_per_class)?;
    let mut request = IngestRequest::new(bucket, file_name, payload).with_config(config);
    if let Some(name) = params.dataset_name {
        request = request.with_dataset_name(name);
    }

    // Extraction, validation and upload are blocking filesystem work.
    let ingestor = state.ingestor.clone();
    let report = tokio::task::spawn_blocking(move || ingestor.ingest_archive(request))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok((StatusCode::CREATED, Json(report)))
}

#[derive(Serialize)]
pub struct DatasetsResponse {
    pub bucket: String,
    pub datasets: Vec<String>,
}

pub async fn list_datasets(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
) -> Result<Json<DatasetsResponse>, ApiError> {
    let datasets = state.catalog.list_datasets(&bucket)?;
    Ok(Json(DatasetsResponse { bucket, datasets }))
}

/// Response for delete operations.
#[derive(Serialize)]
pub struct DeletedResponse {
    pub message: String,
    pub objects_deleted: usize,
}

pub async fn delete_dataset(
    State(state): State<AppState>,
    Path((bucket, dataset)): Path<(String, String)>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let objects_deleted = state.catalog.delete_dataset(&bucket, &dataset)?;
    Ok(Json(DeletedResponse {
        message: format!("Dataset '{}' deleted.", dataset),
        objects_deleted,
    }))
}

#[derive(Serialize)]
pub struct ClassesResponse {
    pub dataset: String,
    pub classes: Vec<String>,
}

pub async fn list_classes(
    State(state): State<AppState>,
    Path((bucket, dataset)): Path<(String, String)>,
) -> Result<Json<ClassesResponse>, ApiError> {
    let classes = state.catalog.list_classes(&bucket, &dataset)?;
    Ok(Json(ClassesResponse { dataset, classes }))
}

pub async fn delete_class(
    State(state): State<AppState>,
    Path((bucket, dataset, class)): Path<(String, String, String)>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let objects_deleted = state.catalog.delete_class(&bucket, &dataset, &class)?;
    Ok(Json(DeletedResponse {
        message: format!("Class '{}' deleted from dataset '{}'.", class, dataset),
        objects_deleted,
    }))
}

#[derive(Serialize)]
pub struct SamplesResponse {
    pub dataset: String,
    pub class: String,
    pub samples: Vec<ObjectInfo>,
}

pub async fn list_samples(
    State(state): State<AppState>,
    Path((bucket, dataset, class)): Path<(String, String, String)>,
) -> Result<Json<SamplesResponse>, ApiError> {
    let samples = state.catalog.list_samples(&bucket, &dataset, &class)?;
    Ok(Json(SamplesResponse {
        dataset,
        class,
        samples,
    }))
}

/// Return the raw sample bytes.
pub async fn get_sample(
    State(state): State<AppState>,
    Path((bucket, dataset, class, sample)): Path<(String, String, String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let data = state.catalog.get_sample(&bucket, &dataset, &class, &sample)?;
    Ok(([(header::CONTENT_TYPE, content_type(&sample))], data))
}

/// Download a whole dataset as a zip that can be uploaded again as-is.
pub async fn download_dataset(
    State(state): State<AppState>,
    Path((bucket, dataset)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let catalog = state.catalog.clone();
    let name = dataset.clone();
    let bytes = tokio::task::spawn_blocking(move || catalog.export_dataset(&bucket, &name))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;
    Ok(zip_attachment(&dataset, bytes))
}

/// Download one class as a zip.
pub async fn download_class(
    State(state): State<AppState>,
    Path((bucket, dataset, class)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let catalog = state.catalog.clone();
    let name = class.clone();
    let bytes =
        tokio::task::spawn_blocking(move || catalog.export_class(&bucket, &dataset, &name))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))??;
    Ok(zip_attachment(&class, bytes))
}

fn zip_attachment(stem: &str, bytes: Vec<u8>) -> impl IntoResponse + use<> {
    (
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.zip\"", stem),
            ),
        ],
        bytes,
    )
}

pub async fn delete_sample(
    State(state): State<AppState>,
    Path((bucket, dataset, class, sample)): Path<(String, String, String, String)>,
) -> Result<Json<DeletedResponse>, ApiError> {
    state.catalog.delete_sample(&bucket, &dataset, &class, &sample)?;
    Ok(Json(DeletedResponse {
        message: format!("Sample '{}' deleted.", sample),
        objects_deleted: 1,
    }))
}

/// Content type guessed from the file extension.
pub(crate) fn content_type(name: &str) -> String {
    mime_guess::from_path(name).first_or_octet_stream().to_string()
}
