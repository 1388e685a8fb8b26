use axum::{Json, debug_handler, extract::State, http::StatusCode};

use crate::{App, error::AppError, identity::AuthUser, news::models::article::ArticleView};

use super::service::{self, ArticleSubmission};

#[debug_handler]
pub async fn create_article(
    State(ctx): State<App>,
    AuthUser(auth_user): AuthUser,
    crate::json::Json(article): crate::json::Json<ArticleSubmission>,
) -> Result<(StatusCode, Json<ArticleView>), AppError> {
    let created = service::create(ctx.store.as_ref(), &auth_user, article).await?;

    Ok((StatusCode::CREATED, Json(created)))
}
