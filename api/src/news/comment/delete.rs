use axum::{
    Json, debug_handler,
    extract::{Path, State},
};
use serde_json::{Value, json};

use crate::{App, error::AppError, identity::AuthUser};

use super::service;

#[debug_handler]
pub async fn delete_comment(
    State(ctx): State<App>,
    Path(comment_id): Path<i32>,
    AuthUser(auth_user): AuthUser,
) -> Result<Json<Value>, AppError> {
    service::delete(ctx.store.as_ref(), &auth_user, comment_id).await?;

    Ok(Json(json!({ "message": "Comment deleted successfully" })))
}
