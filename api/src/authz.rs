//! The single authorization gate. Every mutation in the news and admin
//! services asks [`authorize`] before touching the store.

use crate::{
    error::AppError,
    identity::models::identity::Identity,
    news::models::{article::Article, comment::Comment},
};

#[derive(Clone, Copy, Debug)]
pub enum Record<'a> {
    Article(&'a Article),
    Comment(&'a Comment),
    /// Identity management: listing, roles, deletion.
    Identities,
    AdminPanel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Read,
    Update,
    Delete,
    Publish,
    Unpublish,
    Like,
    ChangeRole,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn or_forbid(self, message: &str) -> Result<(), AppError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny => Err(AppError::Unauthorized(message.to_string())),
        }
    }
}

pub fn authorize(identity: &Identity, record: Record<'_>, action: Action) -> Decision {
    use Action::*;

    let allowed = match (record, action) {
        (Record::Article(article), Update | Delete | Publish | Unpublish) => {
            article.is_authored_by(identity.id) || identity.role.is_admin()
        }
        // admins get no override on comments
        (Record::Comment(comment), Update | Delete) => comment.author_id == identity.id,
        (Record::Comment(_), Like) => true,
        (Record::Identities, Read | ChangeRole | Delete) => identity.role.is_admin(),
        (Record::AdminPanel, Read) => identity.role.is_admin(),
        _ => false,
    };

    if allowed {
        Decision::Allow
    } else {
        Decision::Deny
    }
}
