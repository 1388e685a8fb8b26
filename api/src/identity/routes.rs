use axum::{
    Json, Router,
    extract::{FromRequestParts, State},
    http::{StatusCode, request::Parts},
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::{CookieJar, cookie::Cookie};
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    App,
    error::AppError,
    identity::models::{
        identity::{Identity, Profile, Role},
        session::Session,
    },
};

use super::{AuthUser, AuthenticationError, COOKIE_NAME, password, session_token};

pub fn route() -> Router<App> {
    Router::<App>::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(handle_whoami))
}

#[derive(Deserialize)]
pub struct Registration {
    name: String,
    email: String,
    password: String,
}

impl Registration {
    fn validate(&mut self) -> Result<(), &'static str> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err("No name provided");
        }

        if self.name.chars().count() > 100 {
            return Err("Name too long");
        }

        self.email = self.email.trim().to_lowercase();
        if self.email.is_empty() {
            return Err("No email provided");
        }

        if !self.email.contains('@') {
            return Err("Invalid email");
        }

        if self.password.chars().count() < 8 {
            return Err("Password too short (min 8 characters)");
        }

        Ok(())
    }
}

#[derive(Deserialize)]
pub struct Credentials {
    email: String,
    password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    token: String,
    user: Profile,
}

#[axum::debug_handler]
pub async fn register(
    State(ctx): State<App>,
    crate::json::Json(mut registration): crate::json::Json<Registration>,
) -> Result<(StatusCode, Json<Profile>), AppError> {
    registration
        .validate()
        .map_err(|e| AppError::Validation(e.into()))?;

    if ctx
        .store
        .find_identity_by_email(&registration.email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("User already exists".into()));
    }

    let password_hash = password::hash(registration.password).await?;

    let identity = ctx
        .store
        .insert_identity(Identity::new_with_role(
            registration.name,
            registration.email,
            password_hash,
            Role::Author,
        ))
        .await?;

    tracing::info!(id = identity.id, "Registered new identity");

    Ok((StatusCode::CREATED, Json(identity.profile())))
}

#[axum::debug_handler]
pub async fn login(
    State(ctx): State<App>,
    crate::json::Json(credentials): crate::json::Json<Credentials>,
) -> Result<impl IntoResponse, AppError> {
    let email = credentials.email.trim().to_lowercase();

    let Some(identity) = ctx.store.find_identity_by_email(&email).await? else {
        return Err(AuthenticationError::InvalidCredentials.into());
    };

    if !password::verify(credentials.password, identity.password_hash.clone()).await? {
        return Err(AuthenticationError::InvalidCredentials.into());
    }

    let new_session = Session::new_with_identity_id(identity.id, ctx.config.session_ttl_days);
    let lifetime = new_session.lifetime();
    let session = ctx.store.insert_session(new_session).await?;

    tracing::info!(
        session = session.id,
        identity = identity.id,
        expires_at = %session.expires_at,
        "Session issued"
    );

    let auth_cookie = Cookie::build((COOKIE_NAME, session.token.clone()))
        .secure(ctx.config.is_production())
        .http_only(true)
        .max_age(lifetime)
        .path("/");

    Ok((
        CookieJar::new().add(auth_cookie),
        Json(LoginResponse {
            token: session.token,
            user: identity.profile(),
        }),
    ))
}

/// The raw session token of the request, if any.
pub struct SessionToken(Option<String>);

impl FromRequestParts<App> for SessionToken {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _: &App) -> Result<Self, Self::Rejection> {
        Ok(SessionToken(session_token(parts)))
    }
}

#[axum::debug_handler]
pub async fn logout(
    State(ctx): State<App>,
    SessionToken(token): SessionToken,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = token {
        ctx.store.deactivate_session(&token).await?;
    }

    let auth_cookie = Cookie::build(COOKIE_NAME)
        .secure(ctx.config.is_production())
        .http_only(true)
        .max_age(Duration::ZERO)
        .path("/");

    Ok(CookieJar::new().add(auth_cookie))
}

async fn handle_whoami(AuthUser(identity): AuthUser) -> Json<Profile> {
    Json(identity.profile())
}

#[cfg(test)]
mod test {
    use super::*;

    fn registration(name: &str, email: &str, password: &str) -> Registration {
        Registration {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn test_registration_is_normalised() {
        let mut r = registration("  Ada ", " Ada@Example.COM ", "correct horse");
        r.validate().unwrap();

        assert_eq!(r.name, "Ada");
        assert_eq!(r.email, "ada@example.com");
    }

    #[test]
    fn test_registration_rejects_bad_input() {
        assert!(registration(" ", "a@b.c", "password1").validate().is_err());
        assert!(registration("Ada", "nope", "password1").validate().is_err());
        assert!(registration("Ada", "a@b.c", "short").validate().is_err());
    }

    #[tokio::test]
    async fn test_register_login_me_logout() {
        use axum::http::Method;
        use serde_json::json;

        use crate::test_utils::TestApp;

        let app = TestApp::new();
        let account = json!({
            "name": "Ada",
            "email": "Ada@Example.com",
            "password": "correct horse",
        });

        let (status, profile) = app
            .request(Method::POST, "/api/users/register", None, Some(account.clone()))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(profile["role"], "author");
        assert!(profile.get("passwordHash").is_none());

        let (status, _) = app
            .request(Method::POST, "/api/users/register", None, Some(account))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = app
            .request(
                Method::POST,
                "/api/users/login",
                None,
                Some(json!({ "email": "ada@example.com", "password": "wrong horse" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, login) = app
            .request(
                Method::POST,
                "/api/users/login",
                None,
                Some(json!({ "email": "ada@example.com", "password": "correct horse" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let token = login["token"].as_str().unwrap().to_string();

        let (status, me) = app
            .request(Method::GET, "/api/users/me", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], "ada@example.com");

        let (status, _) = app
            .request(Method::POST, "/api/users/logout", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app
            .request(Method::GET, "/api/users/me", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
