use axum::{
    Json, debug_handler,
    extract::{Path, State},
};

use crate::{App, error::AppError, identity::AuthUser, news::models::comment::CommentView};

use super::service;

#[debug_handler]
pub async fn toggle_like(
    State(ctx): State<App>,
    Path(comment_id): Path<i32>,
    AuthUser(auth_user): AuthUser,
) -> Result<Json<CommentView>, AppError> {
    Ok(Json(
        service::toggle_like(ctx.store.as_ref(), &auth_user, comment_id).await?,
    ))
}
