//! services/api/src/web/rest.rs
//!
//! The service-level endpoints (health, unknown routes) and the master
//! definition for the OpenAPI specification.

use axum::{response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::error::{ApiError, ErrorBody};
use crate::web::{auth, chats, models, pdfs};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::profile_handler,
        auth::update_profile_handler,
        pdfs::upload_pdf_handler,
        pdfs::list_pdfs_handler,
        pdfs::list_user_pdfs_handler,
        pdfs::get_pdf_handler,
        pdfs::delete_pdf_handler,
        pdfs::ask_pdf_handler,
        pdfs::summarize_pdf_handler,
        pdfs::pdf_flow_handler,
        chats::ask_question_handler,
        chats::list_chats_handler,
        chats::delete_chat_handler,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorBody,
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::UpdateProfileRequest,
            pdfs::QuestionRequest,
            models::MessageResponse,
            models::UserResponse,
            models::AuthResponse,
            models::ProfileResponse,
            models::ProfileUpdatedResponse,
            models::DocumentResponse,
            models::DocumentListItem,
            models::DocumentDetailResponse,
            models::SummaryResponse,
            models::FlowResponse,
            models::ExchangeResponse,
            models::ExchangeHistoryItem,
        )
    ),
    tags(
        (name = "PDF Chat API", description = "Upload PDFs and hold AI conversations about them."),
        (name = "Auth", description = "Accounts and credentials."),
        (name = "PDFs", description = "Documents and the AI operations on them."),
        (name = "Chats", description = "The question-and-answer history of a document.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Handlers
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Liveness probe. Touches no dependency.
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Server is running", body = HealthResponse)),
    tag = "PDF Chat API"
)]
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "OK".to_string(),
        message: "Server is running".to_string(),
        timestamp: Utc::now(),
    })
}

/// Unknown routes get the JSON error envelope instead of an empty 404.
pub async fn fallback_handler() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    /// The JSON schema of a response, following a `$ref` into the components.
    fn response_schema(doc: &Value, path: &str, method: &str, status: &str) -> Value {
        let schema = &doc["paths"][path][method]["responses"][status]["content"]
            ["application/json"]["schema"];
        match schema["$ref"].as_str() {
            Some(reference) => {
                let name = reference.trim_start_matches("#/components/schemas/");
                doc["components"]["schemas"][name].clone()
            }
            None => schema.clone(),
        }
    }

    fn property_names(schema: &Value) -> Vec<String> {
        let mut names: Vec<String> = schema["properties"]
            .as_object()
            .map(|props| props.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    #[test]
    fn success_responses_are_documented_with_their_envelope() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();

        for (path, method) in [
            ("/api/pdfs/{id}", "get"),
            ("/api/pdfs/{id}/ask", "post"),
            ("/api/pdfs/{id}/summarize", "post"),
            ("/api/pdfs/{id}/flow", "get"),
            ("/api/chats/{pdf_id}/question", "post"),
            ("/api/auth/profile", "get"),
        ] {
            let schema = response_schema(&doc, path, method, "200");
            assert_eq!(property_names(&schema), ["data", "success"], "{method} {path}");
        }

        for (path, method) in [
            ("/api/pdfs", "get"),
            ("/api/pdfs/{id}/pdfs", "get"),
            ("/api/chats/{pdf_id}/chats", "get"),
        ] {
            let schema = response_schema(&doc, path, method, "200");
            assert_eq!(
                property_names(&schema),
                ["count", "data", "success"],
                "{method} {path}"
            );
        }
    }

    #[test]
    fn upload_documents_the_created_envelope() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let schema = response_schema(&doc, "/api/pdfs/upload", "post", "201");
        assert_eq!(property_names(&schema), ["data", "success"]);
    }

    #[test]
    fn path_ids_are_documented_as_uuids() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let params = doc["paths"]["/api/chats/chats/{chat_id}"]["delete"]["parameters"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        let chat_id = params
            .iter()
            .find(|p| p["name"] == "chat_id")
            .expect("chat_id parameter");
        assert_eq!(chat_id["in"], "path");
        assert_eq!(chat_id["schema"]["format"], "uuid");
    }
}
