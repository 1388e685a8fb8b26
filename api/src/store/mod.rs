//! Persistence boundary. Services only ever see `&dyn Store`, so the
//! PostgreSQL store and the in-memory one are interchangeable.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::{
    identity::models::{
        identity::{Identity, NewIdentity, Role},
        session::{NewSession, Session},
    },
    news::models::{
        article::{Article, ArticleChanges, Category, NewArticle},
        comment::{Comment, NewComment},
    },
};

pub mod memory;
pub mod postgres;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// A unique constraint was hit; carries the name of the offending field.
    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error("{0}")]
    Blocked(String),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// What happens to the records of an identity when it is deleted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OnUserDelete {
    /// Delete the identity's articles (with their comments) and comments.
    Cascade,
    /// Keep the articles without an author. Comments cannot exist without
    /// an author and are deleted.
    Orphan,
    /// Refuse while the identity still authors articles or comments.
    #[default]
    Block,
}

impl FromStr for OnUserDelete {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cascade" => Ok(OnUserDelete::Cascade),
            "orphan" => Ok(OnUserDelete::Orphan),
            "block" => Ok(OnUserDelete::Block),
            _ => Err(format!("invalid user delete policy `{s}`")),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ArticleFilter {
    pub published: Option<bool>,
    /// `None` matches every category.
    pub categories: Option<Vec<Category>>,
}

impl ArticleFilter {
    pub fn matches(&self, article: &Article) -> bool {
        self.published.is_none_or(|p| article.published == p)
            && self
                .categories
                .as_ref()
                .is_none_or(|c| c.contains(&article.category))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArticleOrder {
    /// Most recently published first, unpublished last.
    PublishedNewest,
    CreatedNewest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommentScope {
    /// Comments on the article without a parent, newest first.
    TopLevel { article_id: i32 },
    /// Direct replies to a comment, oldest first.
    Replies { parent_id: i32 },
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_identity(&self, identity: NewIdentity) -> Result<Identity, StoreError>;
    async fn find_identity(&self, id: i32) -> Result<Option<Identity>, StoreError>;
    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError>;
    async fn find_identities(&self, ids: &[i32]) -> Result<Vec<Identity>, StoreError>;
    /// Newest first.
    async fn list_identities(&self, limit: Option<i64>) -> Result<Vec<Identity>, StoreError>;
    async fn count_identities(&self, role: Option<Role>) -> Result<i64, StoreError>;
    async fn set_identity_role(
        &self,
        id: i32,
        role: Role,
        now: NaiveDateTime,
    ) -> Result<Option<Identity>, StoreError>;
    /// Returns `false` if there was no such identity.
    async fn delete_identity(&self, id: i32, policy: OnUserDelete) -> Result<bool, StoreError>;

    async fn insert_session(&self, session: NewSession) -> Result<Session, StoreError>;
    /// Resolves an active, unexpired session token to its identity.
    async fn find_session_identity(
        &self,
        token: &str,
        now: NaiveDateTime,
    ) -> Result<Option<Identity>, StoreError>;
    async fn deactivate_session(&self, token: &str) -> Result<(), StoreError>;

    async fn insert_article(&self, article: NewArticle) -> Result<Article, StoreError>;
    async fn find_article(&self, id: i32) -> Result<Option<Article>, StoreError>;
    async fn find_article_by_slug(&self, slug: &str) -> Result<Option<Article>, StoreError>;
    async fn list_articles(
        &self,
        filter: &ArticleFilter,
        order: ArticleOrder,
        limit: Option<i64>,
    ) -> Result<Vec<Article>, StoreError>;
    async fn count_articles(&self, published: Option<bool>) -> Result<i64, StoreError>;
    async fn update_article(
        &self,
        id: i32,
        changes: ArticleChanges,
    ) -> Result<Option<Article>, StoreError>;
    /// `Some(at)` publishes at `at`, `None` unpublishes.
    async fn set_article_publication(
        &self,
        id: i32,
        published_at: Option<NaiveDateTime>,
        now: NaiveDateTime,
    ) -> Result<Option<Article>, StoreError>;
    /// Deletes the article together with its comments.
    async fn delete_article(&self, id: i32) -> Result<bool, StoreError>;

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment, StoreError>;
    async fn find_comment(&self, id: i32) -> Result<Option<Comment>, StoreError>;
    async fn list_comments(&self, scope: CommentScope) -> Result<Vec<Comment>, StoreError>;
    async fn update_comment_content(
        &self,
        id: i32,
        content: String,
        now: NaiveDateTime,
    ) -> Result<Option<Comment>, StoreError>;
    /// Direct replies of a deleted comment lose their parent.
    async fn delete_comment(&self, id: i32) -> Result<bool, StoreError>;
    /// Adds the identity to the likes if absent, removes it otherwise, as a
    /// single atomic mutation.
    async fn toggle_comment_like(
        &self,
        id: i32,
        identity_id: i32,
    ) -> Result<Option<Comment>, StoreError>;
}
