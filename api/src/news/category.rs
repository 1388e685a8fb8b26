use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use crate::{
    App,
    error::AppError,
    news::models::article::{ArticleView, Category},
};

use super::article::service;

#[derive(Serialize, Debug, PartialEq)]
pub struct CategoryInfo {
    id: String,
    name: &'static str,
    emoji: &'static str,
}

impl From<Category> for CategoryInfo {
    fn from(c: Category) -> Self {
        CategoryInfo {
            id: c.id(),
            name: c.name(),
            emoji: c.emoji(),
        }
    }
}

pub async fn get_categories() -> Json<Vec<CategoryInfo>> {
    Json(Category::ALL.into_iter().map(CategoryInfo::from).collect())
}

pub async fn get_category_articles(
    State(ctx): State<App>,
    Path(category): Path<String>,
) -> Result<Json<Vec<ArticleView>>, AppError> {
    let Ok(parsed) = category.parse::<Category>() else {
        return Err(AppError::NotFound(format!(
            "No articles found in category: {category}"
        )));
    };

    Ok(Json(
        service::list_by_categories(ctx.store.as_ref(), vec![parsed]).await?,
    ))
}

#[derive(Deserialize)]
pub struct CategorySelection {
    categories: Vec<String>,
}

/// Unknown entries in the selection are ignored.
pub async fn get_articles_in_categories(
    State(ctx): State<App>,
    crate::json::Json(selection): crate::json::Json<CategorySelection>,
) -> Result<Json<Vec<ArticleView>>, AppError> {
    let mut categories: Vec<Category> = Vec::new();
    for raw in &selection.categories {
        match raw.parse::<Category>() {
            Ok(c) if !categories.contains(&c) => categories.push(c),
            Ok(_) => {}
            Err(e) => tracing::debug!("Ignoring category selection entry: {e}"),
        }
    }

    Ok(Json(
        service::list_by_categories(ctx.store.as_ref(), categories).await?,
    ))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_category_info() {
        let info = CategoryInfo::from(Category::RealEstate);

        assert_eq!(
            info,
            CategoryInfo {
                id: "real-estate".into(),
                name: "Real Estate",
                emoji: "🏠",
            }
        );
        assert_eq!(Category::ALL.len(), 26);
    }
}
