use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Redirect,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::certificate::{self, CertificateId, ENCRYPTED_REQUIRED, PLAINTEXT_REQUIRED};
use crate::error::AppError;
use crate::state::AppState;
use crate::storage;

const ENCRYPTED_FIELD: &str = "encryptedData";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub message: String,
    pub certificate_url: String,
    pub certificate_id: String,
}

/// Accepts either a plain certificate record or `{ "encryptedData": "<base64>" }`.
pub async fn generate_certificate(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<GenerateResponse>, AppError> {
    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let encrypted = match &body {
        Value::Object(object) => object.contains_key(ENCRYPTED_FIELD),
        _ => false,
    };

    let (certificate, message) = if encrypted {
        let encoded = body
            .get(ENCRYPTED_FIELD)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("Encrypted certificate data is required".into()))?;

        let plaintext = state.cipher.decrypt(encoded)?;
        let payload: Value = serde_json::from_str(&plaintext).map_err(AppError::PayloadDecoding)?;
        let certificate = certificate::validate(payload, ENCRYPTED_REQUIRED, Utc::now())?;
        (certificate, "Certificate generated successfully".to_string())
    } else {
        let certificate = certificate::validate(body, PLAINTEXT_REQUIRED, Utc::now())?;
        let message = format!("Certificate generated successfully for {}", certificate.name);
        (certificate, message)
    };

    let rendered = state.renderer.render(&certificate).await?;
    info!(
        "Served certificate {} ({})",
        certificate.id,
        if encrypted { "encrypted" } else { "plain" }
    );

    Ok(Json(GenerateResponse {
        success: true,
        message,
        certificate_url: rendered.url(),
        certificate_id: certificate.id.to_string(),
    }))
}

pub async fn view_certificate(Path(id): Path<String>) -> Result<Redirect, AppError> {
    let id = CertificateId::parse(&id)?;
    Ok(Redirect::to(&storage::certificate_url(&id.file_name())))
}
