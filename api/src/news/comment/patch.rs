use axum::{
    Json, debug_handler,
    extract::{Path, State},
};
use serde::Deserialize;

use crate::{App, error::AppError, identity::AuthUser, news::models::comment::CommentView};

use super::service;

#[derive(Deserialize)]
pub struct CommentPatch {
    content: String,
}

#[debug_handler]
pub async fn patch_comment(
    State(ctx): State<App>,
    Path(comment_id): Path<i32>,
    AuthUser(auth_user): AuthUser,
    crate::json::Json(comment): crate::json::Json<CommentPatch>,
) -> Result<Json<CommentView>, AppError> {
    let updated =
        service::update(ctx.store.as_ref(), &auth_user, comment_id, &comment.content).await?;

    Ok(Json(updated))
}
