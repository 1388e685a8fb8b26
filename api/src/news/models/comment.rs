use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::identity::models::identity::CommentAuthor;

// The record as persisted
#[derive(Clone, Debug, PartialEq)]
pub struct Comment {
    pub id: i32,
    pub content: String,
    pub article_id: i32,
    pub author_id: i32,
    pub parent_id: Option<i32>,
    /// Identities that liked the comment, in the order the likes were added.
    pub likes: Vec<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Comment {
    pub fn is_liked_by(&self, identity_id: i32) -> bool {
        self.likes.contains(&identity_id)
    }

    pub fn into_view(self, author: Option<CommentAuthor>) -> CommentView {
        CommentView {
            id: self.id,
            content: self.content,
            article: self.article_id,
            author,
            parent_comment: self.parent_id,
            likes: self.likes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NewComment {
    pub content: String,
    pub article_id: i32,
    pub author_id: i32,
    pub parent_id: Option<i32>,
    pub created_at: NaiveDateTime,
}

// The model that will be returned to the client
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: i32,
    pub content: String,
    pub article: i32,
    pub author: Option<CommentAuthor>,
    pub parent_comment: Option<i32>,
    pub likes: Vec<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
