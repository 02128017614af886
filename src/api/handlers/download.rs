//! Download redemption handlers: verify a code, retrieve one asset,
//! explicitly mark a code as used.

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::services::download_service::DownloadView;

/// Create download routes
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/verify", get(verify_code))
        .route("/image", get(download_image))
        .route("/mark-used", post(mark_used))
}

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub download: DownloadView,
}

/// Verify a download code and list the purchased items with signed
/// preview URLs. Read-only: an exhausted code still verifies, with
/// `used: true` in the payload.
pub async fn verify_code(
    State(state): State<SharedState>,
    Query(params): Query<VerifyParams>,
) -> Result<Json<VerifyResponse>> {
    let code = params
        .code
        .ok_or_else(|| AppError::Validation("Download code is required".to_string()))?;

    let download = state.download_service().verify(&code).await?;

    Ok(Json(VerifyResponse {
        success: true,
        download,
    }))
}

#[derive(Debug, Deserialize)]
pub struct DownloadImageParams {
    pub code: Option<String>,
    #[serde(rename = "imageId")]
    pub image_id: Option<String>,
    /// Pre-validated override path for the HQ asset; gated by the same
    /// used-check as the regular path.
    #[serde(rename = "hqUrl")]
    pub hq_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DownloadImageResponse {
    pub url: String,
}

/// Retrieve one purchased asset: logs the download against the order and
/// returns a short-lived signed URL for the high-resolution object.
pub async fn download_image(
    State(state): State<SharedState>,
    Query(params): Query<DownloadImageParams>,
) -> Result<Json<DownloadImageResponse>> {
    let image_id = params
        .image_id
        .ok_or_else(|| AppError::Validation("Image ID is required".to_string()))?;
    let code = params
        .code
        .ok_or_else(|| AppError::Validation("Download code is required".to_string()))?;

    let signed = state
        .download_service()
        .download_item(&code, &image_id, params.hq_url.as_deref())
        .await?;

    Ok(Json(DownloadImageResponse { url: signed.url }))
}

#[derive(Debug, Serialize)]
pub struct MarkUsedResponse {
    pub success: bool,
    pub message: String,
}

/// Explicitly exhaust a download code (client confirmed full receipt).
pub async fn mark_used(
    State(state): State<SharedState>,
    Query(params): Query<VerifyParams>,
) -> Result<Json<MarkUsedResponse>> {
    let code = params
        .code
        .ok_or_else(|| AppError::Validation("Download code is required".to_string()))?;

    state.download_service().mark_used(&code).await?;

    Ok(Json(MarkUsedResponse {
        success: true,
        message: "Download code marked as used".to_string(),
    }))
}
