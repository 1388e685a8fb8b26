use axum::http::{header, request::Parts};

use crate::{
    App,
    authz::{Action, Record, authorize},
    error::{ApiRequestError, AppError},
};

use self::models::identity::Identity;

pub mod models;
pub mod password;
pub mod routes;

pub const COOKIE_NAME: &str = "auth_token";

#[derive(thiserror::Error, Debug)]
pub enum AuthenticationError {
    #[error(
        "Authentication required, but no cookie `{COOKIE_NAME}` or bearer token found in headers."
    )]
    NoToken,

    #[error(
        "Unauthorized, please check if you're logged in by refreshing the \
         page. This could be due to an expired session or token has became invalid."
    )]
    Unauthorized,

    #[error("Invalid email or password")]
    InvalidCredentials,
}

impl ApiRequestError for AuthenticationError {
    fn status_code(&self) -> axum::http::StatusCode {
        axum::http::StatusCode::UNAUTHORIZED
    }
}

/// The session token from the auth cookie, or else from `Authorization: Bearer`.
pub fn session_token(parts: &Parts) -> Option<String> {
    let jar = axum_extra::extract::cookie::CookieJar::from_headers(&parts.headers);

    if let Some(cookie) = jar.get(COOKIE_NAME) {
        return Some(cookie.value().to_string());
    }

    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

pub struct MaybeAuthUser(pub Result<Identity, AuthenticationError>);

impl axum::extract::FromRequestParts<App> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &App) -> Result<Self, Self::Rejection> {
        let Some(session_token) = session_token(parts) else {
            return Ok(MaybeAuthUser(Err(AuthenticationError::NoToken)));
        };

        let identity = state
            .store
            .find_session_identity(&session_token, chrono::Utc::now().naive_utc())
            .await?;

        Ok(MaybeAuthUser(
            identity.ok_or(AuthenticationError::Unauthorized),
        ))
    }
}

pub struct AuthUser(pub Identity);

impl axum::extract::FromRequestParts<App> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &App) -> Result<Self, Self::Rejection> {
        let MaybeAuthUser(auth_user) = MaybeAuthUser::from_request_parts(parts, state).await?;

        Ok(AuthUser(auth_user?))
    }
}

/// An authenticated identity with the admin role.
pub struct AdminUser(pub Identity);

impl axum::extract::FromRequestParts<App> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &App) -> Result<Self, Self::Rejection> {
        let AuthUser(identity) = AuthUser::from_request_parts(parts, state).await?;

        authorize(&identity, Record::AdminPanel, Action::Read)
            .or_forbid("Access denied. Admin privileges required.")?;

        Ok(AdminUser(identity))
    }
}
