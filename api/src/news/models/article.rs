use std::{fmt, str::FromStr};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::identity::models::identity::ArticleAuthor;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Politics,
    World,
    National,
    Business,
    Finance,
    Education,
    Technology,
    Science,
    Health,
    Entertainment,
    Gaming,
    Art,
    Law,
    Lifestyle,
    Food,
    Travel,
    Books,
    Children,
    RealEstate,
    Environment,
    Opinion,
    Elections,
    Local,
    Interviews,
    Explainers,
    Events,
}

impl Category {
    pub const ALL: [Category; 26] = [
        Category::Politics,
        Category::World,
        Category::National,
        Category::Business,
        Category::Finance,
        Category::Education,
        Category::Technology,
        Category::Science,
        Category::Health,
        Category::Entertainment,
        Category::Gaming,
        Category::Art,
        Category::Law,
        Category::Lifestyle,
        Category::Food,
        Category::Travel,
        Category::Books,
        Category::Children,
        Category::RealEstate,
        Category::Environment,
        Category::Opinion,
        Category::Elections,
        Category::Local,
        Category::Interviews,
        Category::Explainers,
        Category::Events,
    ];

    /// Display name, also the stored representation.
    pub fn name(&self) -> &'static str {
        match self {
            Category::Politics => "Politics",
            Category::World => "World",
            Category::National => "National",
            Category::Business => "Business",
            Category::Finance => "Finance",
            Category::Education => "Education",
            Category::Technology => "Technology",
            Category::Science => "Science",
            Category::Health => "Health",
            Category::Entertainment => "Entertainment",
            Category::Gaming => "Gaming",
            Category::Art => "Art",
            Category::Law => "Law",
            Category::Lifestyle => "Lifestyle",
            Category::Food => "Food",
            Category::Travel => "Travel",
            Category::Books => "Books",
            Category::Children => "Children",
            Category::RealEstate => "Real Estate",
            Category::Environment => "Environment",
            Category::Opinion => "Opinion",
            Category::Elections => "Elections",
            Category::Local => "Local",
            Category::Interviews => "Interviews",
            Category::Explainers => "Explainers",
            Category::Events => "Events",
        }
    }

    /// URL-friendly identifier, e.g. `real-estate`.
    pub fn id(&self) -> String {
        crate::utils::slugify(self.name())
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Category::Politics => "🏛️",
            Category::World => "🌐",
            Category::National => "🇮🇳",
            Category::Business => "💼",
            Category::Finance => "📈",
            Category::Education => "🧠",
            Category::Technology => "💻",
            Category::Science => "🔬",
            Category::Health => "🚑",
            Category::Entertainment => "🎭",
            Category::Gaming => "🕹️",
            Category::Art => "🎨",
            Category::Law => "⚖️",
            Category::Lifestyle => "🧘",
            Category::Food => "👨‍🍳",
            Category::Travel => "✈️",
            Category::Books => "📚",
            Category::Children => "🧒",
            Category::RealEstate => "🏠",
            Category::Environment => "🔋",
            Category::Opinion => "🎯",
            Category::Elections => "🗳️",
            Category::Local => "🧵",
            Category::Interviews => "🎙️",
            Category::Explainers => "💡",
            Category::Events => "📅",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts either the display name or the identifier, case-insensitively.
impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s) || c.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown category `{s}`"))
    }
}

impl Serialize for Category {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Article {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub original_source: Option<String>,
    pub summary: String,
    pub body: String,
    pub tags: Vec<String>,
    pub category: Category,
    pub cover_image: Option<String>,
    pub author: Option<i32>,
    pub published: bool,
    pub published_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Article {
    pub fn is_authored_by(&self, identity_id: i32) -> bool {
        self.author == Some(identity_id)
    }

    pub fn into_view(self, author: Option<ArticleAuthor>) -> ArticleView {
        ArticleView {
            id: self.id,
            title: self.title,
            slug: self.slug,
            original_source: self.original_source,
            summary: self.summary,
            body: self.body,
            tags: self.tags,
            category: self.category,
            cover_image: self.cover_image,
            author,
            published: self.published,
            published_at: self.published_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NewArticle {
    pub title: String,
    pub slug: String,
    pub original_source: Option<String>,
    pub summary: String,
    pub body: String,
    pub tags: Vec<String>,
    pub category: Category,
    pub cover_image: Option<String>,
    pub author: Option<i32>,
    pub created_at: NaiveDateTime,
}

/// Fields to overwrite on an article, `None` leaves the field untouched.
#[derive(Clone, Debug)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub original_source: Option<String>,
    pub summary: Option<String>,
    pub body: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: Option<Category>,
    pub cover_image: Option<String>,
    pub updated_at: NaiveDateTime,
}

// The model that will be returned to the client
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArticleView {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub original_source: Option<String>,
    pub summary: String,
    pub body: String,
    pub tags: Vec<String>,
    pub category: Category,
    pub cover_image: Option<String>,
    pub author: Option<ArticleAuthor>,
    pub published: bool,
    pub published_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_category_parses_name_and_id() {
        assert_eq!("Technology".parse::<Category>().unwrap(), Category::Technology);
        assert_eq!("technology".parse::<Category>().unwrap(), Category::Technology);
        assert_eq!("real-estate".parse::<Category>().unwrap(), Category::RealEstate);
        assert_eq!("Real Estate".parse::<Category>().unwrap(), Category::RealEstate);
        assert!("Sports".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_serializes_as_display_name() {
        let json = serde_json::to_string(&Category::RealEstate).unwrap();
        assert_eq!(json, "\"Real Estate\"");
        assert_eq!(Category::RealEstate.id(), "real-estate");
    }
}
