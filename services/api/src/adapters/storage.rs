//! services/api/src/adapters/storage.rs
//!
//! This module contains the adapter for the Cloudinary object store.
//! It implements the `ObjectStorageService` port from the `core` crate using a
//! signed upload to the `raw` resource endpoint.

use async_trait::async_trait;
use chrono::Utc;
use pdf_chat_core::domain::StoredObject;
use pdf_chat_core::ports::{ObjectStorageService, PortError, PortResult};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use tracing::{error, info};

use crate::config::StorageConfig;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ObjectStorageService` using Cloudinary.
#[derive(Clone)]
pub struct CloudinaryAdapter {
    http: reqwest::Client,
    config: StorageConfig,
}

impl CloudinaryAdapter {
    /// Creates a new `CloudinaryAdapter`.
    pub fn new(http: reqwest::Client, config: StorageConfig) -> Self {
        Self { http, config }
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/v1_1/{}/raw/upload",
            self.config.api_base.trim_end_matches('/'),
            self.config.cloud_name
        )
    }
}

/// Signs upload parameters: sorted `key=value` pairs joined by `&`, followed by
/// the API secret, hashed with SHA-1.
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Turns a client-supplied file name into a safe public id fragment.
fn public_id_fragment(file_name: &str) -> String {
    let stem = file_name
        .strip_suffix(".pdf")
        .or_else(|| file_name.strip_suffix(".PDF"))
        .unwrap_or(file_name);
    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned
    }
}

#[derive(Deserialize)]
struct UploadResult {
    secure_url: Option<String>,
    public_id: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

//=========================================================================================
// `ObjectStorageService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ObjectStorageService for CloudinaryAdapter {
    async fn upload_pdf(&self, file_name: &str, bytes: &[u8]) -> PortResult<StoredObject> {
        let now = Utc::now();
        let timestamp = now.timestamp().to_string();
        let public_id = format!(
            "pdf-{}-{}",
            now.timestamp_millis(),
            public_id_fragment(file_name)
        );
        let signature = sign_params(
            &[
                ("folder", self.config.folder.as_str()),
                ("public_id", public_id.as_str()),
                ("timestamp", timestamp.as_str()),
            ],
            &self.config.api_secret,
        );

        let file = Part::bytes(bytes.to_vec())
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let form = Form::new()
            .part("file", file)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", self.config.folder.clone())
            .text("public_id", public_id)
            .text("signature", signature);

        let response = self
            .http
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Cloudinary request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or(body);
            error!(%status, "Cloudinary upload rejected: {}", message);
            return Err(PortError::Unexpected(format!(
                "Cloudinary upload failed ({}): {}",
                status, message
            )));
        }

        let result: UploadResult = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Invalid Cloudinary response: {}", e)))?;
        let url = result.secure_url.ok_or_else(|| {
            PortError::Unexpected("Upload failed - no URL received from Cloudinary".to_string())
        })?;

        info!(public_id = %result.public_id, "File uploaded to Cloudinary");
        Ok(StoredObject {
            url,
            public_id: result.public_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_does_not_depend_on_parameter_order() {
        let a = sign_params(&[("timestamp", "1"), ("folder", "pdfs")], "secret");
        let b = sign_params(&[("folder", "pdfs"), ("timestamp", "1")], "secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 40);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn signature_matches_sha1_of_sorted_params_and_secret() {
        let expected = {
            let mut hasher = Sha1::new();
            hasher.update(b"folder=pdfs&timestamp=1700000000secret");
            hex::encode(hasher.finalize())
        };
        assert_eq!(
            sign_params(&[("timestamp", "1700000000"), ("folder", "pdfs")], "secret"),
            expected
        );
    }

    #[test]
    fn signature_changes_with_the_secret() {
        let params = [("timestamp", "1")];
        assert_ne!(sign_params(&params, "a"), sign_params(&params, "b"));
    }

    #[test]
    fn public_id_fragment_strips_extension_and_unsafe_characters() {
        assert_eq!(public_id_fragment("My Thesis (final).pdf"), "My_Thesis__final_");
        assert_eq!(public_id_fragment(".pdf"), "document");
        assert_eq!(public_id_fragment("notes_v2-draft.PDF"), "notes_v2-draft");
    }

    #[test]
    fn upload_url_targets_the_raw_endpoint() {
        let adapter = CloudinaryAdapter::new(
            reqwest::Client::new(),
            StorageConfig {
                cloud_name: "demo".to_string(),
                api_key: "k".to_string(),
                api_secret: "s".to_string(),
                folder: "pdfs".to_string(),
                api_base: "https://api.cloudinary.com/".to_string(),
            },
        );
        assert_eq!(
            adapter.upload_url(),
            "https://api.cloudinary.com/v1_1/demo/raw/upload"
        );
    }
}
