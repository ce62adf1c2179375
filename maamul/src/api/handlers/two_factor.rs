//! Two-factor and device-trust endpoints. See [`crate::auth::two_factor`].

use axum::{
    Router,
    extract::{Json, rejection::JsonRejection},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    api::response::ApiResponse,
    auth::{current_user::CurrentSession, two_factor},
    errors::{Error, Result},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct SetupResponse {
    pub secret: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub verified: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeviceTrustResponse {
    pub trusted: bool,
}

/// `POST /api/auth/2fa/setup`
#[tracing::instrument(skip_all)]
pub async fn setup(_current: CurrentSession) -> ApiResponse<SetupResponse> {
    ApiResponse::ok(
        "Two-factor setup started",
        SetupResponse {
            secret: two_factor::generate_secret(),
        },
    )
}

/// `POST /api/auth/2fa/verify`
#[tracing::instrument(skip_all)]
pub async fn verify(
    current: CurrentSession,
    body: std::result::Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<ApiResponse<VerifyResponse>> {
    let Json(request) = body?;
    if !two_factor::verify_totp_and_trust_device(current.id, &request.code) {
        return Err(Error::Unauthenticated {
            message: Some("Invalid verification code".to_string()),
        });
    }
    Ok(ApiResponse::ok("Device verified", VerifyResponse { verified: true }))
}

/// `GET /api/auth/device-trust`
#[tracing::instrument(skip_all)]
pub async fn device_trust(current: CurrentSession) -> ApiResponse<DeviceTrustResponse> {
    ApiResponse::ok(
        "Device trust fetched",
        DeviceTrustResponse {
            trusted: two_factor::is_current_device_trusted(current.id),
        },
    )
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/2fa/setup", post(setup))
        .route("/api/auth/2fa/verify", post(verify))
        .route("/api/auth/device-trust", get(device_trust))
}
