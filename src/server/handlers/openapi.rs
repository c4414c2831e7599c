//! OpenAPI document endpoint.
//!
//! The document is assembled in place and `servers[0]` reflects the request
//! origin (or the configured base URL override), so generated clients point
//! at whatever host served them the document.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use super::super::AppState;

/// `GET /api/openapi`: OpenAPI 3 description of the public surface.
pub async fn openapi(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    let server_url = state
        .settings
        .api_base_url
        .clone()
        .unwrap_or_else(|| request_origin(&headers));

    Json(document(&server_url))
}

/// Reconstruct the origin the client used to reach us.
fn request_origin(headers: &HeaderMap) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get("host")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost:3040");
    format!("{}://{}", scheme, host)
}

fn document(server_url: &str) -> serde_json::Value {
    serde_json::json!({
        "openapi": "3.0.3",
        "info": {
            "title": "OCR API",
            "description": "Asynchronous document OCR service. Upload a file, poll for the enriched result or receive it via webhook.",
            "version": "1.0.0",
        },
        "servers": [ { "url": server_url } ],
        "paths": {
            "/api/upload": {
                "post": {
                    "summary": "Upload a document for OCR",
                    "requestBody": {
                        "required": true,
                        "content": {
                            "multipart/form-data": {
                                "schema": {
                                    "type": "object",
                                    "required": ["file", "documentType", "email"],
                                    "properties": {
                                        "file": { "type": "string", "format": "binary" },
                                        "documentType": { "type": "string" },
                                        "email": { "type": "string", "format": "email" },
                                        "callbackWebhook": { "type": "string", "format": "uri" },
                                        "language": { "type": "string", "default": "eng" },
                                    },
                                },
                            },
                        },
                    },
                    "responses": {
                        "201": {
                            "description": "Job accepted",
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/UploadResponse" } } },
                        },
                        "400": { "description": "Validation failed" },
                        "500": { "description": "Internal error" },
                    },
                },
            },
            "/api/status/{id}": {
                "get": {
                    "summary": "Poll job status",
                    "parameters": [ {
                        "name": "id", "in": "path", "required": true,
                        "schema": { "type": "string", "format": "uuid" },
                    } ],
                    "responses": {
                        "200": {
                            "description": "Job state",
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/JobStatus" } } },
                        },
                        "400": { "description": "Malformed job id" },
                        "404": { "description": "Job not found" },
                    },
                },
            },
            "/api/health": {
                "get": {
                    "summary": "Liveness probe",
                    "responses": { "200": { "description": "Service is up" } },
                },
            },
        },
        "components": {
            "schemas": {
                "UploadResponse": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "format": "uuid" },
                        "status": { "type": "string", "enum": ["PENDING"] },
                        "message": { "type": "string" },
                    },
                },
                "JobStatus": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "format": "uuid" },
                        "status": { "type": "string", "enum": ["PENDING", "PROCESSING", "COMPLETED", "FAILED"] },
                        "documentType": { "type": "string" },
                        "email": { "type": "string" },
                        "createdAt": { "type": "string", "format": "date-time" },
                        "updatedAt": { "type": "string", "format": "date-time" },
                        "ocrResult": { "type": "string", "nullable": true },
                        "errorMessage": { "type": "string", "nullable": true },
                        "processedAt": { "type": "string", "format": "date-time", "nullable": true },
                    },
                },
            },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_carries_server_url() {
        let doc = document("https://ocr.example.com");
        assert_eq!(doc["servers"][0]["url"], "https://ocr.example.com");
        assert!(doc["paths"]["/api/upload"]["post"].is_object());
    }

    #[test]
    fn test_request_origin_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("host", "ocr.example.com".parse().unwrap());
        assert_eq!(request_origin(&headers), "http://ocr.example.com");

        headers.insert("x-forwarded-proto", "https".parse().unwrap());
        assert_eq!(request_origin(&headers), "https://ocr.example.com");
    }
}
