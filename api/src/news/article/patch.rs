use axum::{
    Json, debug_handler,
    extract::{Path, State},
};

use crate::{App, error::AppError, identity::AuthUser, news::models::article::ArticleView};

use super::service::{self, ArticlePatch};

#[debug_handler]
pub async fn patch_article(
    State(ctx): State<App>,
    Path(id): Path<i32>,
    AuthUser(auth_user): AuthUser,
    crate::json::Json(patch): crate::json::Json<ArticlePatch>,
) -> Result<Json<ArticleView>, AppError> {
    Ok(Json(
        service::update(ctx.store.as_ref(), &auth_user, id, patch).await?,
    ))
}
