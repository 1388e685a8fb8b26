use axum::{Json, debug_handler, extract::State, http::StatusCode};
use serde::Deserialize;

use crate::{App, error::AppError, identity::AuthUser, news::models::comment::CommentView};

use super::service::{self, CreateComment};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentSubmission {
    content: String,
    article_id: i32,
    parent_comment_id: Option<i32>,
}

#[debug_handler]
pub async fn create_comment(
    State(ctx): State<App>,
    AuthUser(auth_user): AuthUser,
    crate::json::Json(comment): crate::json::Json<CommentSubmission>,
) -> Result<(StatusCode, Json<CommentView>), AppError> {
    let created = service::create(
        ctx.store.as_ref(),
        &auth_user,
        CreateComment {
            content: comment.content,
            article_id: comment.article_id,
            parent_id: comment.parent_comment_id,
        },
        ctx.config.comments_require_article,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(created)))
}
