//! Member-facing handlers
//!
//! Every handler resolves a principal (anonymous included) and hands it
//! to the guarded operations. Missing targets surface as 404 before any
//! authorization question is asked.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use clubhub_app::service::ProfileChanges;

use crate::auth::{OptionalUser, PageUser};
use crate::handlers::{user_json, ApiResult};
use crate::AppState;

/// Profile update request body
#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub name: String,
    pub email: String,
    pub birthdate: String,
}

/// Member dashboard: accessible groups plus the category list
pub async fn dashboard(
    State(state): State<AppState>,
    OptionalUser(principal): OptionalUser,
) -> ApiResult<Json<Value>> {
    let data = state.service.dashboard(&principal).await?;
    Ok(Json(json!({
        "groups": data.groups,
        "categories": data.categories,
    })))
}

pub async fn list_categories(
    State(state): State<AppState>,
    OptionalUser(principal): OptionalUser,
) -> ApiResult<Json<Value>> {
    let categories = state.service.list_categories(&principal).await?;
    Ok(Json(json!({ "categories": categories })))
}

pub async fn category_groups(
    State(state): State<AppState>,
    OptionalUser(principal): OptionalUser,
    Path(category_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let listing = state.service.category_groups(&principal, category_id).await?;
    Ok(Json(json!({
        "category": listing.category,
        "groups": listing.groups,
    })))
}

pub async fn group_detail(
    State(state): State<AppState>,
    OptionalUser(principal): OptionalUser,
    Path(group_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let detail = state.service.view_group_detail(&principal, group_id).await?;
    Ok(Json(json!({
        "group": detail.group,
        "members": detail.members,
    })))
}

pub async fn member_detail(
    State(state): State<AppState>,
    OptionalUser(principal): OptionalUser,
    Path(member_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let detail = state.service.view_member_detail(&principal, member_id).await?;
    Ok(Json(json!({
        "member": detail.member,
        "group": detail.group,
    })))
}

pub async fn view_profile(
    State(state): State<AppState>,
    OptionalUser(principal): OptionalUser,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let user = state.service.view_profile(&principal, user_id).await?;
    Ok(Json(json!({ "user": user_json(&user) })))
}

pub async fn update_profile(
    State(state): State<AppState>,
    OptionalUser(principal): OptionalUser,
    Path(user_id): Path<i64>,
    Json(request): Json<ProfileRequest>,
) -> ApiResult<Json<Value>> {
    let user = state
        .service
        .update_profile(
            &principal,
            user_id,
            ProfileChanges {
                name: request.name,
                email: request.email,
                birthdate: request.birthdate,
            },
        )
        .await?;

    Ok(Json(json!({
        "message": "Profile updated",
        "user": user_json(&user),
    })))
}

/// Page-flow entry point. An unauthenticated browser is redirected to
/// `/login` by the extractor.
pub async fn home(PageUser(user): PageUser) -> Json<Value> {
    Json(json!({
        "message": format!("Welcome back, {}", user.name),
        "user": user_json(&user),
    }))
}

/// Login page placeholder the redirect lands on
pub async fn login_page() -> Json<Value> {
    Json(json!({
        "message": "Log in via POST /api/auth/login",
    }))
}
