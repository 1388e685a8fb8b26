use axum::{
    Json, debug_handler,
    extract::{Path, State},
};

use crate::{App, error::AppError, news::models::comment::CommentView};

use super::service;

#[debug_handler]
pub async fn get_article_comments(
    State(ctx): State<App>,
    Path(article_id): Path<i32>,
) -> Result<Json<Vec<CommentView>>, AppError> {
    Ok(Json(
        service::list_for_article(ctx.store.as_ref(), article_id).await?,
    ))
}

#[debug_handler]
pub async fn get_replies(
    State(ctx): State<App>,
    Path(comment_id): Path<i32>,
) -> Result<Json<Vec<CommentView>>, AppError> {
    Ok(Json(
        service::list_replies(ctx.store.as_ref(), comment_id).await?,
    ))
}

#[debug_handler]
pub async fn get_comment(
    State(ctx): State<App>,
    Path(comment_id): Path<i32>,
) -> Result<Json<CommentView>, AppError> {
    Ok(Json(service::get(ctx.store.as_ref(), comment_id).await?))
}
