use std::collections::HashMap;

use serde::Deserialize;

use crate::{
    authz::{Action, Record, authorize},
    error::AppError,
    identity::models::identity::{ArticleAuthor, Identity},
    news::models::article::{Article, ArticleChanges, ArticleView, Category, NewArticle},
    store::{ArticleFilter, ArticleOrder, Store},
    utils::{slugify, trimmed},
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleSubmission {
    pub title: String,
    pub original_source: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default, alias = "explanation")]
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub category: Category,
    pub cover_image: Option<String>,
}

/// Fields of an article to change, absent fields are left as they are.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePatch {
    pub title: Option<String>,
    pub original_source: Option<String>,
    pub summary: Option<String>,
    #[serde(alias = "explanation")]
    pub body: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: Option<Category>,
    pub cover_image: Option<String>,
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !cleaned.iter().any(|t| t == tag) {
            cleaned.push(tag.to_string());
        }
    }
    cleaned
}

fn title_and_slug(title: &str) -> Result<(String, String), AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("No title provided".into()));
    }

    let slug = slugify(title);
    if slug.is_empty() {
        return Err(AppError::Validation(
            "Title must contain at least one letter or digit".into(),
        ));
    }

    Ok((title.to_string(), slug))
}

/// Attaches author display fields, looking every author up once.
pub async fn populate(
    store: &dyn Store,
    articles: Vec<Article>,
) -> Result<Vec<ArticleView>, AppError> {
    let mut ids: Vec<i32> = articles.iter().filter_map(|a| a.author).collect();
    ids.sort_unstable();
    ids.dedup();

    let authors: HashMap<i32, ArticleAuthor> = store
        .find_identities(&ids)
        .await?
        .iter()
        .map(|i| (i.id, i.article_author()))
        .collect();

    Ok(articles
        .into_iter()
        .map(|a| {
            let author = a.author.and_then(|id| authors.get(&id).cloned());
            a.into_view(author)
        })
        .collect())
}

pub async fn populate_one(store: &dyn Store, article: Article) -> Result<ArticleView, AppError> {
    populate(store, vec![article])
        .await?
        .pop()
        .ok_or_else(|| AppError::internal("populating an article yielded nothing"))
}

async fn find(store: &dyn Store, id: i32) -> Result<Article, AppError> {
    store
        .find_article(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Article not found".into()))
}

pub async fn create(
    store: &dyn Store,
    author: &Identity,
    submission: ArticleSubmission,
) -> Result<ArticleView, AppError> {
    let (title, slug) = title_and_slug(&submission.title)?;

    let article = store
        .insert_article(NewArticle {
            title,
            slug,
            original_source: trimmed(submission.original_source),
            summary: submission.summary.trim().to_string(),
            body: submission.body,
            tags: clean_tags(submission.tags),
            category: submission.category,
            cover_image: trimmed(submission.cover_image),
            author: Some(author.id),
            created_at: chrono::Utc::now().naive_utc(),
        })
        .await?;

    tracing::info!(id = article.id, slug = %article.slug, "Article created");

    Ok(article.into_view(Some(author.article_author())))
}

/// Published articles, most recently published first.
pub async fn list_published(store: &dyn Store) -> Result<Vec<ArticleView>, AppError> {
    let filter = ArticleFilter {
        published: Some(true),
        categories: None,
    };
    let articles = store
        .list_articles(&filter, ArticleOrder::PublishedNewest, None)
        .await?;

    populate(store, articles).await
}

/// Every article regardless of state, newest first.
pub async fn list_all(store: &dyn Store, limit: Option<i64>) -> Result<Vec<ArticleView>, AppError> {
    let articles = store
        .list_articles(&ArticleFilter::default(), ArticleOrder::CreatedNewest, limit)
        .await?;

    populate(store, articles).await
}

/// Published articles in any of the categories, newest first. Finding none
/// is reported as not found.
pub async fn list_by_categories(
    store: &dyn Store,
    categories: Vec<Category>,
) -> Result<Vec<ArticleView>, AppError> {
    let missing = || {
        let names: Vec<&str> = categories.iter().map(|c| c.name()).collect();
        AppError::NotFound(format!(
            "No articles found in category: {}",
            names.join(", ")
        ))
    };

    if categories.is_empty() {
        return Err(missing());
    }

    let filter = ArticleFilter {
        published: Some(true),
        categories: Some(categories.clone()),
    };
    let articles = store
        .list_articles(&filter, ArticleOrder::CreatedNewest, None)
        .await?;

    if articles.is_empty() {
        return Err(missing());
    }

    populate(store, articles).await
}

pub async fn get_by_slug(store: &dyn Store, slug: &str) -> Result<ArticleView, AppError> {
    let article = store
        .find_article_by_slug(slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Article not found".into()))?;

    populate_one(store, article).await
}

pub async fn get(store: &dyn Store, id: i32) -> Result<ArticleView, AppError> {
    let article = find(store, id).await?;
    populate_one(store, article).await
}

/// A changed title regenerates the slug.
pub async fn update(
    store: &dyn Store,
    caller: &Identity,
    id: i32,
    patch: ArticlePatch,
) -> Result<ArticleView, AppError> {
    let article = find(store, id).await?;

    authorize(caller, Record::Article(&article), Action::Update)
        .or_forbid("Not authorized to update this article")?;

    let (title, slug) = match patch.title {
        Some(title) => {
            let (title, slug) = title_and_slug(&title)?;
            (Some(title), Some(slug))
        }
        None => (None, None),
    };

    let updated = store
        .update_article(
            id,
            ArticleChanges {
                title,
                slug,
                original_source: trimmed(patch.original_source),
                summary: patch.summary.map(|s| s.trim().to_string()),
                body: patch.body,
                tags: patch.tags.map(clean_tags),
                category: patch.category,
                cover_image: trimmed(patch.cover_image),
                updated_at: chrono::Utc::now().naive_utc(),
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound("Article not found".into()))?;

    populate_one(store, updated).await
}

/// Publishing stamps the current time, unpublishing clears it.
pub async fn set_published(
    store: &dyn Store,
    caller: &Identity,
    id: i32,
    published: bool,
) -> Result<ArticleView, AppError> {
    let article = find(store, id).await?;

    let (action, message) = if published {
        (Action::Publish, "Not authorized to publish this article")
    } else {
        (Action::Unpublish, "Not authorized to unpublish this article")
    };
    authorize(caller, Record::Article(&article), action).or_forbid(message)?;

    let now = chrono::Utc::now().naive_utc();
    let updated = store
        .set_article_publication(id, published.then_some(now), now)
        .await?
        .ok_or_else(|| AppError::NotFound("Article not found".into()))?;

    tracing::info!(id, published, "Article publication changed");

    populate_one(store, updated).await
}

pub async fn delete(store: &dyn Store, caller: &Identity, id: i32) -> Result<(), AppError> {
    let article = find(store, id).await?;

    authorize(caller, Record::Article(&article), Action::Delete)
        .or_forbid("Not authorized to delete this article")?;

    if !store.delete_article(id).await? {
        return Err(AppError::NotFound("Article not found".into()));
    }

    tracing::info!(id, "Article deleted");

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{identity::models::identity::Role, store::memory::MemoryStore};

    async fn identity(store: &MemoryStore, name: &str, role: Role) -> Identity {
        store
            .insert_identity(Identity::new_with_role(
                name.into(),
                format!("{}@example.com", name.to_lowercase()),
                String::new(),
                role,
            ))
            .await
            .unwrap()
    }

    fn submission(title: &str, category: Category) -> ArticleSubmission {
        ArticleSubmission {
            title: title.into(),
            original_source: None,
            summary: "summary".into(),
            body: "body".into(),
            tags: vec![" rust ".into(), "".into(), "rust".into(), "web".into()],
            category,
            cover_image: Some("  ".into()),
        }
    }

    #[tokio::test]
    async fn test_create_derives_slug_and_cleans_input() {
        let store = MemoryStore::new();
        let a = identity(&store, "Ada", Role::Author).await;

        let article = create(&store, &a, submission("Hello World", Category::Technology))
            .await
            .unwrap();

        assert_eq!(article.slug, "hello-world");
        assert_eq!(article.tags, vec!["rust", "web"]);
        assert_eq!(article.cover_image, None);
        assert!(!article.published);
        assert_eq!(article.author.unwrap().name, "Ada");
    }

    #[tokio::test]
    async fn test_slug_collision_is_a_conflict() {
        let store = MemoryStore::new();
        let a = identity(&store, "Ada", Role::Author).await;

        create(&store, &a, submission("Hello World", Category::Technology))
            .await
            .unwrap();
        let again = create(&store, &a, submission("Hello, world!", Category::World)).await;

        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_title_without_slug_characters_is_rejected() {
        let store = MemoryStore::new();
        let a = identity(&store, "Ada", Role::Author).await;

        assert!(matches!(
            create(&store, &a, submission("  ", Category::World)).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            create(&store, &a, submission("!!!", Category::World)).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_is_owner_or_admin_and_regenerates_slug() {
        let store = MemoryStore::new();
        let a = identity(&store, "Ada", Role::Author).await;
        let b = identity(&store, "Bob", Role::Author).await;
        let admin = identity(&store, "Root", Role::Admin).await;
        let article = create(&store, &a, submission("Hello World", Category::Technology))
            .await
            .unwrap();

        let patch = || ArticlePatch {
            title: Some("Goodbye World".into()),
            ..Default::default()
        };

        assert!(matches!(
            update(&store, &b, article.id, patch()).await,
            Err(AppError::Unauthorized(_))
        ));

        let updated = update(&store, &admin, article.id, patch()).await.unwrap();
        assert_eq!(updated.slug, "goodbye-world");
        assert_eq!(updated.summary, "summary");
        assert!(get_by_slug(&store, "hello-world").await.is_err());
    }

    #[tokio::test]
    async fn test_publish_cycle() {
        let store = MemoryStore::new();
        let a = identity(&store, "Ada", Role::Author).await;
        let b = identity(&store, "Bob", Role::Author).await;
        let article = create(&store, &a, submission("Hello World", Category::Technology))
            .await
            .unwrap();

        assert!(list_published(&store).await.unwrap().is_empty());
        assert!(matches!(
            set_published(&store, &b, article.id, true).await,
            Err(AppError::Unauthorized(_))
        ));

        let published = set_published(&store, &a, article.id, true).await.unwrap();
        assert!(published.published);
        assert!(published.published_at.is_some());
        assert_eq!(list_published(&store).await.unwrap().len(), 1);

        let unpublished = set_published(&store, &a, article.id, false).await.unwrap();
        assert!(!unpublished.published);
        assert_eq!(unpublished.published_at, None);
    }

    #[tokio::test]
    async fn test_category_browsing_shows_published_only() {
        let store = MemoryStore::new();
        let a = identity(&store, "Ada", Role::Author).await;
        let draft = create(&store, &a, submission("Draft", Category::Technology))
            .await
            .unwrap();
        let live = create(&store, &a, submission("Live", Category::Technology))
            .await
            .unwrap();
        create(&store, &a, submission("Elsewhere", Category::Food))
            .await
            .unwrap();
        set_published(&store, &a, live.id, true).await.unwrap();

        let found = list_by_categories(&store, vec![Category::Technology])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, live.id);
        assert_ne!(found[0].id, draft.id);

        assert!(matches!(
            list_by_categories(&store, vec![Category::Food]).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            list_by_categories(&store, vec![]).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_comments() {
        let store = MemoryStore::new();
        let a = identity(&store, "Ada", Role::Author).await;
        let b = identity(&store, "Bob", Role::Author).await;
        let article = create(&store, &a, submission("Hello World", Category::Technology))
            .await
            .unwrap();
        let comment = store
            .insert_comment(crate::news::models::comment::NewComment {
                content: "hi".into(),
                article_id: article.id,
                author_id: b.id,
                parent_id: None,
                created_at: chrono::Utc::now().naive_utc(),
            })
            .await
            .unwrap();

        assert!(matches!(
            delete(&store, &b, article.id).await,
            Err(AppError::Unauthorized(_))
        ));
        delete(&store, &a, article.id).await.unwrap();

        assert!(store.find_comment(comment.id).await.unwrap().is_none());
        assert!(matches!(
            get(&store, article.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
