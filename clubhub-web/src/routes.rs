//! Route definitions for the ClubHub web server

use crate::{handlers, AppState};
use axum::{
    routing::{delete, get, post},
    Router,
};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Auth lifecycle
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::me))
        // Member-facing views
        .route("/dashboard", get(handlers::club::dashboard))
        .route("/categories", get(handlers::club::list_categories))
        .route(
            "/categories/{category_id}/groups",
            get(handlers::club::category_groups),
        )
        .route("/groups/{group_id}", get(handlers::club::group_detail))
        .route("/members/{member_id}", get(handlers::club::member_detail))
        .route(
            "/users/{user_id}/profile",
            get(handlers::club::view_profile).put(handlers::club::update_profile),
        )
        // Administration
        .route("/admin/dashboard", get(handlers::admin::dashboard))
        .route("/admin/users", get(handlers::admin::list_users))
        .route(
            "/admin/users/{user_id}/toggle-admin",
            post(handlers::admin::toggle_admin),
        )
        .route("/admin/users/{user_id}", delete(handlers::admin::delete_user))
        .route(
            "/admin/groups",
            get(handlers::admin::list_groups).post(handlers::admin::create_group),
        )
        .route(
            "/admin/groups/{group_id}",
            get(handlers::admin::group_detail).delete(handlers::admin::delete_group),
        )
        .route("/admin/groups-data", get(handlers::admin::groups_data))
}

/// Create page-flow routes: anonymous visitors are redirected to the
/// login page instead of receiving a bare 401
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::club::home))
        .route("/login", get(handlers::club::login_page))
}
