use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Author,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Author => "author",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "author" => Ok(Role::Author),
            _ => Err(format!("invalid role `{s}`")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Identity {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub profile_picture: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Clone, Debug)]
pub struct NewIdentity {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub profile_picture: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Identity {
    pub fn new_with_role(name: String, email: String, password_hash: String, role: Role) -> NewIdentity {
        let now = chrono::Utc::now().naive_utc();
        NewIdentity {
            name,
            email,
            password_hash,
            role,
            profile_picture: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn profile(&self) -> Profile {
        Profile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            profile_picture: self.profile_picture.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Display fields attached to comments.
    pub fn comment_author(&self) -> CommentAuthor {
        CommentAuthor {
            id: self.id,
            name: self.name.clone(),
            profile_picture: self.profile_picture.clone(),
        }
    }

    /// Display fields attached to articles.
    pub fn article_author(&self) -> ArticleAuthor {
        ArticleAuthor {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// What an identity looks like on the wire. The password hash never leaves
/// the server.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub profile_picture: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommentAuthor {
    pub id: i32,
    pub name: String,
    pub profile_picture: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ArticleAuthor {
    pub id: i32,
    pub name: String,
    pub email: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Role::Author.as_str(), "author");
        assert!("editor".parse::<Role>().is_err());
    }

    #[test]
    fn test_profile_has_no_password_hash() {
        let new = Identity::new_with_role(
            "Ada".into(),
            "ada@example.com".into(),
            "$argon2id$secret".into(),
            Role::Author,
        );
        let identity = Identity {
            id: 7,
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            profile_picture: None,
            created_at: new.created_at,
            updated_at: new.updated_at,
        };

        let json = serde_json::to_value(identity.profile()).unwrap();
        assert_eq!(json["role"], "author");
        assert!(!json.to_string().contains("argon2"));
    }
}
