//! API request/response models for authentication.

use axum::{
    http::header,
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::users::UserResponse;
use crate::api::response::ApiResponse;
use crate::db::models::companies::Company;

/// Self-service signup: a new company and its first administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub company_name: String,
    pub company_phone: Option<String>,
    pub company_address: Option<String>,
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// The signed-in user together with their company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub company: Option<Company>,
}

/// An envelope response that also sets (or clears) the session cookie.
pub struct WithSessionCookie<T> {
    pub cookie: String,
    pub response: ApiResponse<T>,
}

impl<T: Serialize> IntoResponse for WithSessionCookie<T> {
    fn into_response(self) -> Response {
        (AppendHeaders([(header::SET_COOKIE, self.cookie)]), self.response).into_response()
    }
}
