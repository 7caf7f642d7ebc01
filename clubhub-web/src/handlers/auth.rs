//! Authentication handlers: registration, login, logout, current user

use axum::{
    extract::State,
    http::{header::SET_COOKIE, StatusCode},
    response::{AppendHeaders, IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use clubhub_app::service::Registration;

use crate::auth::{issue_token, CurrentUser, SESSION_COOKIE};
use crate::handlers::{user_json, ApiResult};
use crate::AppState;

/// Registration request body
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub birthdate: String,
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub name: String,
    pub password: String,
}

/// Register a new account. 201 with the public user shape on success,
/// 400 with a distinct reason per rejected input.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    info!(name = %request.name, "Registration attempt");

    let user = state
        .service
        .register(Registration {
            name: request.name,
            email: request.email,
            password: request.password,
            confirm_password: request.confirm_password,
            birthdate: request.birthdate,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration successful",
            "user": user_json(&user),
        })),
    ))
}

/// Log in. Issues a bearer token and mirrors it into the session cookie
/// for the page flow.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state.service.login(&request.name, &request.password).await?;

    let token = issue_token(user.id).map_err(|_| {
        clubhub_app::AppError::internal("token issuance failed")
    })?;
    let cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(json!({
            "token": token,
            "token_type": "Bearer",
            "user": user_json(&user),
        })),
    ))
}

/// Log out. Tokens are stateless, so the server only clears the session
/// cookie and the client discards its copy.
pub async fn logout(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    info!(user_id = user.id, "Logout");

    let cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0");
    (
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(json!({
            "message": "Logged out successfully",
        })),
    )
}

/// Current principal info
pub async fn me(CurrentUser(user): CurrentUser) -> Json<Value> {
    Json(json!({ "user": user_json(&user) }))
}
