//! Administration handlers
//!
//! Routes sit behind the `AdminUser` extractor, and the guarded
//! operations still run the decision engine so rules like
//! self-protection are enforced in one place.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::{json, Value};

use clubhub_app::service::MemberWithUser;
use clubhub_app::Principal;

use crate::auth::AdminUser;
use crate::handlers::{user_json, ApiResult};
use crate::AppState;

/// Pagination query parameters
#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub page: Option<i64>,
}

/// Group creation request body. Both fields optional so each absence
/// gets its own validation message.
#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: Option<String>,
    pub category_id: Option<i64>,
}

fn member_with_user_json(row: &MemberWithUser) -> Value {
    json!({
        "member": row.member,
        "user": row.user.as_ref().map(user_json),
    })
}

pub async fn dashboard(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> ApiResult<Json<Value>> {
    let principal = Principal::User(admin);
    let data = state.service.admin_dashboard(&principal).await?;

    Ok(Json(json!({
        "stats": {
            "total_users": data.stats.total_users,
            "total_groups": data.stats.total_groups,
            "total_members": data.stats.total_members,
        },
        "categories": data
            .category_group_counts
            .iter()
            .map(|entry| {
                json!({
                    "category": entry.category,
                    "group_count": entry.group_count,
                })
            })
            .collect::<Vec<_>>(),
        "recent_users": data.recent_users.iter().map(user_json).collect::<Vec<_>>(),
    })))
}

pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Query(pagination): Query<Pagination>,
) -> ApiResult<Json<Value>> {
    let principal = Principal::User(admin);
    let page = state
        .service
        .list_users(&principal, pagination.page.unwrap_or(1))
        .await?;

    Ok(Json(json!({
        "users": page.users.iter().map(user_json).collect::<Vec<_>>(),
        "total": page.total,
        "page": page.page,
        "per_page": page.per_page,
    })))
}

pub async fn toggle_admin(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let principal = Principal::User(admin);
    let outcome = state.service.toggle_user_admin(&principal, user_id).await?;

    Ok(Json(json!({
        "message": format!(
            "Admin status for {} changed from {} to {}",
            outcome.user.name, outcome.previous, outcome.current
        ),
        "user": user_json(&outcome.user),
    })))
}

pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let principal = Principal::User(admin);
    state.service.delete_user(&principal, user_id).await?;

    Ok(Json(json!({ "message": "User deleted" })))
}

pub async fn list_groups(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> ApiResult<Json<Value>> {
    let principal = Principal::User(admin);
    let summaries = state.service.list_groups_admin(&principal).await?;

    Ok(Json(json!({
        "groups": summaries
            .iter()
            .map(|summary| {
                json!({
                    "group": summary.group,
                    "category_name": summary.category_name,
                    "member_count": summary.member_count,
                })
            })
            .collect::<Vec<_>>(),
    })))
}

pub async fn group_detail(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(group_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let principal = Principal::User(admin);
    let detail = state.service.group_admin_detail(&principal, group_id).await?;

    Ok(Json(json!({
        "group": detail.group,
        "category": detail.category,
        "members": detail.members.iter().map(member_with_user_json).collect::<Vec<_>>(),
    })))
}

pub async fn create_group(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(request): Json<CreateGroupRequest>,
) -> ApiResult<impl IntoResponse> {
    let principal = Principal::User(admin);
    let group = state
        .service
        .create_group(&principal, request.name, request.category_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Group created",
            "group": group,
        })),
    ))
}

pub async fn delete_group(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(group_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let principal = Principal::User(admin);
    state.service.delete_group(&principal, group_id).await?;

    Ok(Json(json!({ "message": "Group deleted" })))
}

/// Full nested export of groups, members, and linked accounts
pub async fn groups_data(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> ApiResult<Json<Value>> {
    let principal = Principal::User(admin);
    let exports = state.service.all_groups_data(&principal).await?;

    Ok(Json(json!({
        "groups": exports
            .iter()
            .map(|export| {
                json!({
                    "group": export.group,
                    "category_name": export.category_name,
                    "member_count": export.member_count,
                    "members": export.members.iter().map(member_with_user_json).collect::<Vec<_>>(),
                })
            })
            .collect::<Vec<_>>(),
    })))
}
