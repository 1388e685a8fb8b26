use axum::{
    Json, debug_handler,
    extract::{Path, State},
};

use crate::{App, error::AppError, identity::AuthUser, news::models::article::ArticleView};

use super::service;

#[debug_handler]
pub async fn publish_article(
    State(ctx): State<App>,
    Path(id): Path<i32>,
    AuthUser(auth_user): AuthUser,
) -> Result<Json<ArticleView>, AppError> {
    Ok(Json(
        service::set_published(ctx.store.as_ref(), &auth_user, id, true).await?,
    ))
}

#[debug_handler]
pub async fn unpublish_article(
    State(ctx): State<App>,
    Path(id): Path<i32>,
    AuthUser(auth_user): AuthUser,
) -> Result<Json<ArticleView>, AppError> {
    Ok(Json(
        service::set_published(ctx.store.as_ref(), &auth_user, id, false).await?,
    ))
}
