//! Axum application setup.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use super::handlers;
use super::state::AppState;
use super::ServerConfig;

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        // Buckets
        .route(
            "/buckets/:bucket",
            post(handlers::create_bucket).delete(handlers::delete_bucket),
        )
        // Datasets
        .route(
            "/buckets/:bucket/datasets",
            get(handlers::list_datasets).post(handlers::upload_dataset),
        )
        .route(
            "/buckets/:bucket/datasets/:dataset",
            axum::routing::delete(handlers::delete_dataset),
        )
        .route(
            "/buckets/:bucket/datasets/:dataset/archive",
            get(handlers::download_dataset),
        )
        // Classes
        .route(
            "/buckets/:bucket/datasets/:dataset/classes",
            get(handlers::list_classes),
        )
        .route(
            "/buckets/:bucket/datasets/:dataset/classes/:class",
            axum::routing::delete(handlers::delete_class),
        )
        .route(
            "/buckets/:bucket/datasets/:dataset/classes/:class/archive",
            get(handlers::download_class),
        )
        // Samples
        .route(
            "/buckets/:bucket/datasets/:dataset/classes/:class/samples",
            get(handlers::list_samples),
        )
        .route(
            "/buckets/:bucket/datasets/:dataset/classes/:class/samples/:sample",
            get(handlers::get_sample).delete(handlers::delete_sample),
        )
        // Single files
        .route("/buckets/:bucket/files", post(handlers::upload_file))
        .route(
            "/buckets/:bucket/files/:file",
            get(handlers::get_file).delete(handlers::delete_file),
        );

    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .nest("/api", api_routes)
        .layer(body_limit)
        .layer(cors)
        .with_state(state)
}

/// Start the web server.
pub async fn run_server(
    state: AppState,
    config: &ServerConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], config.port));

    info!(%addr, store = %config.store_dir.display(), "server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::{Cursor, Write};
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, HeaderMap, Request, StatusCode};
    use classfold::LocalObjectStore;
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const BOUNDARY: &str = "classfold-test-boundary";

    fn test_app() -> (TempDir, Router) {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::open(dir.path().join("store")).unwrap();
        (dir, create_router(AppState::new(Arc::new(store))))
    }

    fn flat_zip(classes: &[&str], files: usize) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for class in classes {
            for i in 1..=files {
                zip.start_file(format!("shapes/{}_{:02}.png", class, i), SimpleFileOptions::default())
                    .unwrap();
                zip.write_all(&[i as u8]).unwrap();
            }
        }
        zip.finish().unwrap().into_inner()
    }

    fn multipart_upload(uri: &str, file_name: &str, payload: &[u8]) -> Request<Body> {
        multipart_with_metadata(uri, file_name, payload, None)
    }

    fn multipart_with_metadata(
        uri: &str,
        file_name: &str,
        payload: &[u8],
        metadata: Option<&str>,
    ) -> Request<Body> {
        let mut body = Vec::new();
        if let Some(metadata) = metadata {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"metadata\"\r\n\r\n{}\r\n",
                    BOUNDARY, metadata
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\
                 Content-Type: application/zip\r\n\r\n",
                BOUNDARY, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(payload);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn send_full(app: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body.to_vec())
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let (status, _, body) = send_full(app, req).await;
        (status, body)
    }

    async fn send_json(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = send(app, req).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    // ===== Health and buckets =====

    #[tokio::test]
    async fn test_health() {
        let (_dir, app) = test_app();
        let (status, body) = send_json(&app, request("GET", "/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_bucket_lifecycle() {
        let (_dir, app) = test_app();

        let (status, _) = send_json(&app, request("POST", "/api/buckets/images")).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = send_json(&app, request("POST", "/api/buckets/images")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send_json(&app, request("GET", "/api/buckets/images/datasets")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["datasets"], serde_json::json!([]));

        let (status, _) = send_json(&app, request("DELETE", "/api/buckets/images")).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send_json(&app, request("DELETE", "/api/buckets/images")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    // ===== Uploads =====

    #[tokio::test]
    async fn test_upload_and_browse() {
        let (_dir, app) = test_app();
        send(&app, request("POST", "/api/buckets/images")).await;

        let upload = multipart_upload(
            "/api/buckets/images/datasets?expected_num_classes=2&expected_files_per_class=3",
            "shapes.zip",
            &flat_zip(&["A", "B"], 3),
        );
        let (status, body) = send_json(&app, upload).await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        assert_eq!(body["dataset"], "shapes");
        assert_eq!(body["objects_uploaded"], 6);
        assert_eq!(body["validation"]["mode"], "flat");

        let (_, body) = send_json(
            &app,
            request("GET", "/api/buckets/images/datasets/shapes/classes"),
        )
        .await;
        assert_eq!(body["classes"], serde_json::json!(["A", "B"]));

        let (_, body) = send_json(
            &app,
            request("GET", "/api/buckets/images/datasets/shapes/classes/B/samples"),
        )
        .await;
        assert_eq!(body["samples"].as_array().unwrap().len(), 3);

        let (status, headers, bytes) = send_full(
            &app,
            request("GET", "/api/buckets/images/datasets/shapes/classes/B/samples/02.png"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "image/png");
        assert_eq!(bytes, vec![2]);

        let (status, body) = send_json(
            &app,
            request("DELETE", "/api/buckets/images/datasets/shapes/classes/A"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["objects_deleted"], 3);
    }

    #[tokio::test]
    async fn test_invalid_archive_is_bad_request() {
        let (_dir, app) = test_app();
        send(&app, request("POST", "/api/buckets/images")).await;

        // Four classes expected by default.
        let upload = multipart_upload(
            "/api/buckets/images/datasets?expected_files_per_class=3",
            "shapes.zip",
            &flat_zip(&["A", "B"], 3),
        );
        let (status, body) = send_json(&app, upload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "class_count_mismatch");

        let (_, body) = send_json(&app, request("GET", "/api/buckets/images/datasets")).await;
        assert_eq!(body["datasets"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_non_zip_rejected() {
        let (_dir, app) = test_app();
        send(&app, request("POST", "/api/buckets/images")).await;

        let upload = multipart_upload("/api/buckets/images/datasets", "shapes.tar", b"data");
        let (status, body) = send_json(&app, upload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_input");
    }

    #[tokio::test]
    async fn test_upload_to_missing_bucket() {
        let (_dir, app) = test_app();
        let upload = multipart_upload("/api/buckets/ghost/datasets", "x.zip", &flat_zip(&["A"], 1));
        let (status, body) = send_json(&app, upload).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Not found: Bucket 'ghost' does not exist.");
    }

    #[tokio::test]
    async fn test_zero_expected_counts_rejected() {
        let (_dir, app) = test_app();
        send(&app, request("POST", "/api/buckets/images")).await;

        let upload = multipart_upload(
            "/api/buckets/images/datasets?expected_num_classes=0",
            "x.zip",
            &flat_zip(&["A"], 1),
        );
        let (status, _) = send_json(&app, upload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_oversized_files_per_class_rejected() {
        let (_dir, app) = test_app();
        send(&app, request("POST", "/api/buckets/images")).await;

        let upload = multipart_upload(
            "/api/buckets/images/datasets?expected_num_classes=1&expected_files_per_class=100000000",
            "x.zip",
            &flat_zip(&["A"], 1),
        );
        let (status, body) = send_json(&app, upload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_input");
    }

    #[tokio::test]
    async fn test_escaping_entry_is_bad_request() {
        let (_dir, app) = test_app();
        send(&app, request("POST", "/api/buckets/images")).await;

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("shapes/A_01.png", SimpleFileOptions::default()).unwrap();
        zip.write_all(&[1]).unwrap();
        zip.start_file("../../escaped.png", SimpleFileOptions::default()).unwrap();
        zip.write_all(&[2]).unwrap();
        let payload = zip.finish().unwrap().into_inner();

        let upload = multipart_upload(
            "/api/buckets/images/datasets?expected_num_classes=1&expected_files_per_class=1",
            "evil.zip",
            &payload,
        );
        let (status, body) = send_json(&app, upload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_input");
        assert!(body["message"].as_str().unwrap().contains("../../escaped.png"));
    }

    // ===== Archive downloads =====

    #[tokio::test]
    async fn test_dataset_and_class_download() {
        let (_dir, app) = test_app();
        send(&app, request("POST", "/api/buckets/images")).await;
        let upload = multipart_upload(
            "/api/buckets/images/datasets?expected_num_classes=2&expected_files_per_class=3",
            "shapes.zip",
            &flat_zip(&["A", "B"], 3),
        );
        send(&app, upload).await;

        let (status, headers, bytes) = send_full(
            &app,
            request("GET", "/api/buckets/images/datasets/shapes/archive"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/zip");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"shapes.zip\""
        );
        let archive = zip::ZipArchive::new(Cursor::new(bytes.clone())).unwrap();
        assert_eq!(archive.len(), 6);
        assert!(archive.file_names().any(|n| n == "shapes/B/03.png"));

        // The export is already structured and uploads again unchanged.
        let again = multipart_upload(
            "/api/buckets/images/datasets?expected_num_classes=2&expected_files_per_class=3&dataset_name=copy",
            "shapes.zip",
            &bytes,
        );
        let (status, body) = send_json(&app, again).await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        assert_eq!(body["validation"]["mode"], "structured");

        let (status, _, bytes) = send_full(
            &app,
            request("GET", "/api/buckets/images/datasets/shapes/classes/A/archive"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(zip::ZipArchive::new(Cursor::new(bytes)).unwrap().len(), 3);

        let (status, body) = send_json(
            &app,
            request("GET", "/api/buckets/images/datasets/ghost/archive"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    // ===== Single files =====

    #[tokio::test]
    async fn test_file_upload_overwrite_download_delete() {
        let (_dir, app) = test_app();
        send(&app, request("POST", "/api/buckets/images")).await;

        let upload = multipart_with_metadata(
            "/api/buckets/images/files",
            "notes.txt",
            b"first",
            Some("v1"),
        );
        let (status, body) = send_json(&app, upload).await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        assert_eq!(body["overwritten"], false);
        assert_eq!(body["object"]["metadata"], "v1");

        let upload = multipart_with_metadata(
            "/api/buckets/images/files",
            "notes.txt",
            b"second",
            Some("v2"),
        );
        let (status, body) = send_json(&app, upload).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["overwritten"], true);
        assert_eq!(
            body["message"],
            "File 'notes.txt' already existed and was overwritten."
        );

        let (status, headers, bytes) =
            send_full(&app, request("GET", "/api/buckets/images/files/notes.txt")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bytes, b"second");
        assert_eq!(headers[header::CONTENT_TYPE], "text/plain");
        assert_eq!(headers[handlers::METADATA_HEADER], "v2");

        // Top-level files are not listed as datasets.
        let (_, body) = send_json(&app, request("GET", "/api/buckets/images/datasets")).await;
        assert_eq!(body["datasets"], serde_json::json!([]));

        let (status, _) =
            send_json(&app, request("DELETE", "/api/buckets/images/files/notes.txt")).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) =
            send_json(&app, request("GET", "/api/buckets/images/files/notes.txt")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body["message"],
            "Not found: File 'notes.txt' does not exist in bucket 'images'."
        );
    }

    #[tokio::test]
    async fn test_file_upload_to_missing_bucket() {
        let (_dir, app) = test_app();
        let upload = multipart_upload("/api/buckets/ghost/files", "notes.txt", b"x");
        let (status, _) = send_json(&app, upload).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
