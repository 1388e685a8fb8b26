use axum::{
    Json, debug_handler,
    extract::{Path, State},
};

use crate::{App, error::AppError, news::models::article::ArticleView};

use super::service;

#[debug_handler]
pub async fn get_articles(State(ctx): State<App>) -> Result<Json<Vec<ArticleView>>, AppError> {
    Ok(Json(service::list_published(ctx.store.as_ref()).await?))
}

#[debug_handler]
pub async fn get_article(
    State(ctx): State<App>,
    Path(slug): Path<String>,
) -> Result<Json<ArticleView>, AppError> {
    Ok(Json(service::get_by_slug(ctx.store.as_ref(), &slug).await?))
}
