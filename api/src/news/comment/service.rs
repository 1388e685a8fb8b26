use std::collections::HashMap;

use crate::{
    authz::{Action, Record, authorize},
    error::AppError,
    identity::models::identity::{CommentAuthor, Identity},
    news::models::comment::{Comment, CommentView, NewComment},
    store::{CommentScope, Store},
};

pub const MAX_CONTENT_CHARS: usize = 5000;

/// Trims the content and checks it is within bounds.
pub fn validate_content(content: &str) -> Result<String, AppError> {
    let content = content.trim();

    if content.is_empty() {
        return Err(AppError::Validation("No content provided".into()));
    }

    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(AppError::Validation(format!(
            "Content too long (max {MAX_CONTENT_CHARS} characters)"
        )));
    }

    Ok(content.to_string())
}

pub struct CreateComment {
    pub content: String,
    pub article_id: i32,
    pub parent_id: Option<i32>,
}

/// Attaches author display fields, looking every author up once.
pub async fn populate(
    store: &dyn Store,
    comments: Vec<Comment>,
) -> Result<Vec<CommentView>, AppError> {
    let mut ids: Vec<i32> = comments.iter().map(|c| c.author_id).collect();
    ids.sort_unstable();
    ids.dedup();

    let authors: HashMap<i32, CommentAuthor> = store
        .find_identities(&ids)
        .await?
        .iter()
        .map(|i| (i.id, i.comment_author()))
        .collect();

    Ok(comments
        .into_iter()
        .map(|c| {
            let author = authors.get(&c.author_id).cloned();
            if author.is_none() {
                tracing::warn!(comment = c.id, author = c.author_id, "Comment author not found");
            }
            c.into_view(author)
        })
        .collect())
}

async fn populate_one(store: &dyn Store, comment: Comment) -> Result<CommentView, AppError> {
    populate(store, vec![comment])
        .await?
        .pop()
        .ok_or_else(|| AppError::internal("populating a comment yielded nothing"))
}

async fn find(store: &dyn Store, id: i32) -> Result<Comment, AppError> {
    store
        .find_comment(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".into()))
}

/// Top-level comments on an article, newest first.
pub async fn list_for_article(
    store: &dyn Store,
    article_id: i32,
) -> Result<Vec<CommentView>, AppError> {
    let comments = store
        .list_comments(CommentScope::TopLevel { article_id })
        .await?;

    populate(store, comments).await
}

/// Direct replies, oldest first. An unknown parent has no replies.
pub async fn list_replies(store: &dyn Store, parent_id: i32) -> Result<Vec<CommentView>, AppError> {
    let comments = store
        .list_comments(CommentScope::Replies { parent_id })
        .await?;

    populate(store, comments).await
}

pub async fn get(store: &dyn Store, id: i32) -> Result<CommentView, AppError> {
    let comment = find(store, id).await?;
    populate_one(store, comment).await
}

pub async fn create(
    store: &dyn Store,
    author: &Identity,
    comment: CreateComment,
    require_article: bool,
) -> Result<CommentView, AppError> {
    let content = validate_content(&comment.content)?;

    if require_article && store.find_article(comment.article_id).await?.is_none() {
        return Err(AppError::NotFound("Article not found".into()));
    }

    // the parent must exist and belong to the same article
    if let Some(parent_id) = comment.parent_id {
        let parent = store
            .find_comment(parent_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Parent comment not found".into()))?;

        if parent.article_id != comment.article_id {
            return Err(AppError::Validation(
                "You're replying to a comment that does not belong to this article".into(),
            ));
        }
    }

    let created = store
        .insert_comment(NewComment {
            content,
            article_id: comment.article_id,
            author_id: author.id,
            parent_id: comment.parent_id,
            created_at: chrono::Utc::now().naive_utc(),
        })
        .await?;

    tracing::debug!(id = created.id, article = created.article_id, "Comment created");

    Ok(created.into_view(Some(author.comment_author())))
}

pub async fn update(
    store: &dyn Store,
    caller: &Identity,
    id: i32,
    content: &str,
) -> Result<CommentView, AppError> {
    let comment = find(store, id).await?;

    authorize(caller, Record::Comment(&comment), Action::Update)
        .or_forbid("Not authorized to perform this action")?;

    let content = validate_content(content)?;

    let updated = store
        .update_comment_content(id, content, chrono::Utc::now().naive_utc())
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".into()))?;

    populate_one(store, updated).await
}

pub async fn delete(store: &dyn Store, caller: &Identity, id: i32) -> Result<(), AppError> {
    let comment = find(store, id).await?;

    authorize(caller, Record::Comment(&comment), Action::Delete)
        .or_forbid("Not authorized to perform this action")?;

    if !store.delete_comment(id).await? {
        return Err(AppError::NotFound("Comment not found".into()));
    }

    Ok(())
}

/// Likes the comment if the caller has not, unlikes it otherwise.
pub async fn toggle_like(
    store: &dyn Store,
    caller: &Identity,
    id: i32,
) -> Result<CommentView, AppError> {
    let comment = find(store, id).await?;

    authorize(caller, Record::Comment(&comment), Action::Like)
        .or_forbid("Not authorized to perform this action")?;

    let toggled = store
        .toggle_comment_like(id, caller.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".into()))?;

    populate_one(store, toggled).await
}
