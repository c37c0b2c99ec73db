//! Liveness and informational endpoints.

use axum::Json;
use serde::Serialize;

use crate::{SERVICE_NAME, VERSION};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Liveness probe; a fixed payload whenever the process is serving.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: VERSION,
    })
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub docs: &'static str,
    pub health: &'static str,
}

/// API information.
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "RAG chatbot API",
        docs: "/docs",
        health: "/health",
    })
}

/// Static description of the API surface.
pub async fn docs() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": SERVICE_NAME,
        "version": VERSION,
        "endpoints": {
            "GET /health": "liveness probe",
            "GET /": "API information",
            "POST /ask": {
                "body": {
                    "question": "string, 1-5000 characters",
                    "chat_history": "optional list of {role, content} turns, oldest first"
                },
                "returns": {"answer": "string"}
            }
        }
    }))
}
