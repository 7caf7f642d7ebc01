//! Request authentication
//!
//! Tokens arrive either as an `Authorization: Bearer` header (API
//! clients) or as the session cookie set at login (page flow). Every
//! extractor resolves the subject against the directory, so the principal
//! a handler sees is the current user row, never stale token claims.

pub mod jwt;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
    response::{IntoResponse, Redirect, Response},
};
use clubhub_app::{Principal, User};

use crate::AppState;
pub use jwt::{issue_token, verify_token, AuthError, Claims};

/// Name of the session cookie carrying the token
pub const SESSION_COOKIE: &str = "clubhub_token";

fn bearer_token(parts: &Parts) -> Option<String> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    header.strip_prefix("Bearer ").map(str::to_string)
}

fn cookie_token(parts: &Parts) -> Option<String> {
    let header = parts.headers.get(COOKIE)?.to_str().ok()?;
    header
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix("clubhub_token="))
        .map(str::to_string)
}

/// Resolve the request's principal. A missing token is anonymous; an
/// invalid or expired token is an error the caller decides how to treat.
async fn authenticate(parts: &Parts, state: &AppState) -> Result<Principal, AuthError> {
    let token = bearer_token(parts).or_else(|| cookie_token(parts));
    let Some(token) = token else {
        return Ok(Principal::Anonymous);
    };

    let claims = verify_token(&token)?;
    state
        .service
        .resolve_principal(Some(claims.sub))
        .await
        .map_err(|e| AuthError::Directory(e.to_string()))
}

/// An authenticated user. Rejects anonymous requests with 401.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);
        match authenticate(parts, &app).await? {
            Principal::User(user) => Ok(Self(user)),
            Principal::Anonymous => Err(AuthError::MissingToken),
        }
    }
}

/// The request principal, anonymous included. Bad tokens degrade to
/// anonymous instead of rejecting, so guarded operations report the
/// denial themselves.
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Principal);

impl<S> FromRequestParts<S> for OptionalUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);
        match authenticate(parts, &app).await {
            Ok(principal) => Ok(Self(principal)),
            Err(AuthError::Directory(detail)) => Err(AuthError::Directory(detail)),
            Err(_) => Ok(Self(Principal::Anonymous)),
        }
    }
}

/// An authenticated administrator. 401 for anonymous, 403 otherwise.
/// Handlers behind this still consult the decision engine, which owns
/// rules like self-protection.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl<S> FromRequestParts<S> for AdminUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);
        match authenticate(parts, &app).await? {
            Principal::User(user) if user.is_admin => Ok(Self(user)),
            Principal::User(_) => Err(AuthError::AdminRequired),
            Principal::Anonymous => Err(AuthError::MissingToken),
        }
    }
}

/// Rejection that sends the browser to the login page
#[derive(Debug)]
pub struct AuthRedirect;

impl IntoResponse for AuthRedirect {
    fn into_response(self) -> Response {
        Redirect::temporary("/login").into_response()
    }
}

/// An authenticated user for page-flow routes. Anything short of a valid
/// session redirects to `/login`.
#[derive(Debug, Clone)]
pub struct PageUser(pub User);

impl<S> FromRequestParts<S> for PageUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRedirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);
        match authenticate(parts, &app).await {
            Ok(Principal::User(user)) => Ok(Self(user)),
            _ => Err(AuthRedirect),
        }
    }
}
