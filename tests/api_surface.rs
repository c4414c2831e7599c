//! HTTP surface tests against a real listener.
//!
//! The scheduler is not running here, so accepted uploads stay PENDING;
//! worker behavior is covered by the scheduler's own tests. These tests pin
//! the route contracts: status codes, error shapes, and admin semantics.

use std::io::Cursor;
use std::sync::Arc;

use ocr_api::config::Settings;
use ocr_api::repository::{run_migrations, AsyncSqlitePool, JobRepository};
use ocr_api::server::{create_router, AppState};

struct TestApp {
    base_url: String,
    repo: JobRepository,
    client: reqwest::Client,
    _db_dir: tempfile::TempDir,
}

async fn spawn_app() -> TestApp {
    let db_dir = tempfile::tempdir().unwrap();
    let db_url = db_dir.path().join("api.db").display().to_string();

    run_migrations(&db_url).await.unwrap();
    let repo = JobRepository::new(AsyncSqlitePool::new(&db_url));

    let settings = Arc::new(Settings {
        database_url: db_url,
        ..Settings::default()
    });

    let router = create_router(AppState::new(repo.clone(), settings));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        base_url: format!("http://{addr}"),
        repo,
        client: reqwest::Client::new(),
        _db_dir: db_dir,
    }
}

fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(400, 200, image::Rgb([255, 255, 255]));
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn upload_form(file: Vec<u8>, mime: &str) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(file)
        .file_name("test.png")
        .mime_str(mime)
        .unwrap();
    reqwest::multipart::Form::new()
        .part("file", part)
        .text("documentType", "invoice")
        .text("email", "t@e.com")
}

#[tokio::test]
async fn upload_accepts_valid_png() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(format!("{}/api/upload", app.base_url))
        .multipart(upload_form(png_bytes(), "image/png"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "PENDING");

    let id = body["id"].as_str().unwrap();
    assert_eq!(id.len(), 36);

    // The stored MIME is the detected one and the row is claimable.
    let job = app.repo.get(id).await.unwrap().unwrap();
    assert_eq!(job.mime_type, "image/png");

    let status_response = app
        .client
        .get(format!("{}/api/status/{}", app.base_url, id))
        .send()
        .await
        .unwrap();
    assert_eq!(status_response.status(), 200);
    let status_body: serde_json::Value = status_response.json().await.unwrap();
    assert_eq!(status_body["status"], "PENDING");
    assert_eq!(status_body["documentType"], "invoice");
    assert!(status_body["ocrResult"].is_null());
}

#[tokio::test]
async fn upload_rejects_mime_spoof() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(format!("{}/api/upload", app.base_url))
        .multipart(upload_form(b"This is not an image".to_vec(), "image/png"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Validation failed");
    let message = body["details"][0]["message"].as_str().unwrap();
    assert!(
        message.contains("detect file type") || message.contains("type mismatch"),
        "unexpected message: {message}"
    );
}

#[tokio::test]
async fn upload_rejects_renamed_jpeg() {
    let app = spawn_app().await;

    let img = image::RgbImage::from_pixel(10, 10, image::Rgb([0, 0, 0]));
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Jpeg)
        .unwrap();

    let response = app
        .client
        .post(format!("{}/api/upload", app.base_url))
        .multipart(upload_form(out.into_inner(), "image/png"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    let message = body["details"][0]["message"].as_str().unwrap();
    assert!(message.to_lowercase().contains("mismatch"));
}

#[tokio::test]
async fn upload_rejects_private_webhook_target() {
    let app = spawn_app().await;

    let form = upload_form(png_bytes(), "image/png")
        .text("callbackWebhook", "http://192.168.1.1/admin");

    let response = app
        .client
        .post(format!("{}/api/upload", app.base_url))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    let message = body["details"][0]["message"].as_str().unwrap();
    assert!(message.contains("private") || message.contains("local"));
}

#[tokio::test]
async fn upload_reports_missing_fields() {
    let app = spawn_app().await;

    let form = reqwest::multipart::Form::new().text("email", "not-an-email");
    let response = app
        .client
        .post(format!("{}/api/upload", app.base_url))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    let paths: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["path"].as_str().unwrap())
        .collect();
    assert!(paths.contains(&"documentType"));
    assert!(paths.contains(&"email"));
    assert!(paths.contains(&"file"));
}

#[tokio::test]
async fn status_unknown_job_is_404() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(format!(
            "{}/api/status/00000000-0000-0000-0000-000000000000",
            app.base_url
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn status_malformed_id_is_400() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(format!("{}/api/status/not-a-uuid", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn admin_delete_processing_requires_force() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(format!("{}/api/upload", app.base_url))
        .multipart(upload_form(png_bytes(), "image/png"))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    let id = body["id"].as_str().unwrap().to_string();

    // Move the job to PROCESSING the same way a worker would.
    let claimed = app.repo.claim_oldest_pending().await.unwrap().unwrap();
    assert_eq!(claimed.id, id);

    let response = app
        .client
        .delete(format!("{}/api/admin/jobs/{}", app.base_url, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = app
        .client
        .delete(format!("{}/api/admin/jobs/{}?force=true", app.base_url, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["id"], id);

    let response = app
        .client
        .delete(format!("{}/api/admin/jobs/{}?force=true", app.base_url, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn admin_list_and_stats_shapes() {
    let app = spawn_app().await;

    for _ in 0..2 {
        app.client
            .post(format!("{}/api/upload", app.base_url))
            .multipart(upload_form(png_bytes(), "image/png"))
            .send()
            .await
            .unwrap();
    }

    let response = app
        .client
        .get(format!(
            "{}/api/admin/jobs?status=PENDING&limit=1&offset=0",
            app.base_url
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["total"], 2);
    assert_eq!(body["jobs"].as_array().unwrap().len(), 1);
    assert_eq!(body["hasMore"], true);
    let job = &body["jobs"][0];
    assert!(job["fileSizeBytes"].as_i64().unwrap() > 0);
    assert!(job.get("fileData").is_none());
    assert_eq!(job["isStuck"], false);

    let response = app
        .client
        .get(format!("{}/api/admin/jobs?status=bogus", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = app
        .client
        .get(format!("{}/api/admin/stats", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let stats: serde_json::Value = response.json().await.unwrap();
    assert_eq!(stats["counts"]["PENDING"], 2);
    assert_eq!(stats["counts"]["FAILED"], 0);
    assert_eq!(stats["lastHour"], 2);
    assert!(stats["stuckJobs"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn admin_patch_resets_failed_job() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(format!("{}/api/upload", app.base_url))
        .multipart(upload_form(png_bytes(), "image/png"))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    let id = body["id"].as_str().unwrap().to_string();

    app.repo.claim_oldest_pending().await.unwrap().unwrap();

    // Mark FAILED with a message.
    let response = app
        .client
        .patch(format!("{}/api/admin/jobs/{}", app.base_url, id))
        .json(&serde_json::json!({ "status": "FAILED", "errorMessage": "engine exploded" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["job"]["status"], "FAILED");
    assert_eq!(body["job"]["errorMessage"], "engine exploded");
    assert!(body["job"]["processedAt"].is_string());

    // Reset to PENDING clears the failure state.
    let response = app
        .client
        .patch(format!("{}/api/admin/jobs/{}", app.base_url, id))
        .json(&serde_json::json!({ "status": "PENDING" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["job"]["status"], "PENDING");
    assert!(body["job"]["errorMessage"].is_null());
    assert!(body["job"]["processedAt"].is_null());

    // Invalid status is rejected.
    let response = app
        .client
        .patch(format!("{}/api/admin/jobs/{}", app.base_url, id))
        .json(&serde_json::json!({ "status": "DONE" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn openapi_reflects_request_origin() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(format!("{}/api/openapi", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let doc: serde_json::Value = response.json().await.unwrap();
    assert_eq!(doc["servers"][0]["url"], app.base_url);
    assert!(doc["paths"]["/api/upload"].is_object());
}

#[tokio::test]
async fn health_endpoint_is_up() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(format!("{}/api/health", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}
