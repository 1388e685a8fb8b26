use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::RwLock;

use super::{ArticleFilter, ArticleOrder, CommentScope, OnUserDelete, Store, StoreError};
use crate::{
    identity::models::{
        identity::{Identity, NewIdentity, Role},
        session::{NewSession, Session},
    },
    news::models::{
        article::{Article, ArticleChanges, NewArticle},
        comment::{Comment, NewComment},
    },
};

/// Keeps everything in process memory. Used when no database is configured
/// and by the tests.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    identities: BTreeMap<i32, Identity>,
    sessions: BTreeMap<i32, Session>,
    articles: BTreeMap<i32, Article>,
    comments: BTreeMap<i32, Comment>,
    last_id: i32,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn remove_comments(&mut self, doomed: impl Fn(&Comment) -> bool) {
        let ids: Vec<i32> = self
            .comments
            .values()
            .filter(|c| doomed(c))
            .map(|c| c.id)
            .collect();

        for id in &ids {
            self.comments.remove(id);
        }

        for comment in self.comments.values_mut() {
            if comment.parent_id.is_some_and(|p| ids.contains(&p)) {
                comment.parent_id = None;
            }
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_identity(&self, identity: NewIdentity) -> Result<Identity, StoreError> {
        let mut state = self.state.write().await;

        if state.identities.values().any(|i| i.email == identity.email) {
            return Err(StoreError::Conflict("email"));
        }

        let id = state.next_id();
        let identity = Identity {
            id,
            name: identity.name,
            email: identity.email,
            password_hash: identity.password_hash,
            role: identity.role,
            profile_picture: identity.profile_picture,
            created_at: identity.created_at,
            updated_at: identity.updated_at,
        };
        state.identities.insert(id, identity.clone());

        Ok(identity)
    }

    async fn find_identity(&self, id: i32) -> Result<Option<Identity>, StoreError> {
        Ok(self.state.read().await.identities.get(&id).cloned())
    }

    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        let state = self.state.read().await;
        Ok(state.identities.values().find(|i| i.email == email).cloned())
    }

    async fn find_identities(&self, ids: &[i32]) -> Result<Vec<Identity>, StoreError> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.identities.get(id).cloned())
            .collect())
    }

    async fn list_identities(&self, limit: Option<i64>) -> Result<Vec<Identity>, StoreError> {
        let state = self.state.read().await;
        let mut identities: Vec<Identity> = state.identities.values().cloned().collect();
        identities.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        if let Some(limit) = limit {
            identities.truncate(limit.max(0) as usize);
        }
        Ok(identities)
    }

    async fn count_identities(&self, role: Option<Role>) -> Result<i64, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .identities
            .values()
            .filter(|i| role.is_none_or(|r| i.role == r))
            .count() as i64)
    }

    async fn set_identity_role(
        &self,
        id: i32,
        role: Role,
        now: NaiveDateTime,
    ) -> Result<Option<Identity>, StoreError> {
        let mut state = self.state.write().await;
        Ok(state.identities.get_mut(&id).map(|identity| {
            identity.role = role;
            identity.updated_at = now;
            identity.clone()
        }))
    }

    async fn delete_identity(&self, id: i32, policy: OnUserDelete) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;

        if !state.identities.contains_key(&id) {
            return Ok(false);
        }

        match policy {
            OnUserDelete::Block => {
                let articles = state.articles.values().filter(|a| a.is_authored_by(id)).count();
                let comments = state.comments.values().filter(|c| c.author_id == id).count();
                if articles + comments > 0 {
                    return Err(StoreError::Blocked(format!(
                        "Identity still authors {articles} articles and {comments} comments"
                    )));
                }
            }
            OnUserDelete::Orphan => {
                for article in state.articles.values_mut() {
                    if article.is_authored_by(id) {
                        article.author = None;
                    }
                }
                state.remove_comments(|c| c.author_id == id);
            }
            OnUserDelete::Cascade => {
                let articles: Vec<i32> = state
                    .articles
                    .values()
                    .filter(|a| a.is_authored_by(id))
                    .map(|a| a.id)
                    .collect();
                state.articles.retain(|_, a| !articles.contains(&a.id));
                state.remove_comments(|c| c.author_id == id || articles.contains(&c.article_id));
            }
        }

        for comment in state.comments.values_mut() {
            comment.likes.retain(|l| *l != id);
        }
        state.sessions.retain(|_, s| s.identity_id != id);
        state.identities.remove(&id);

        Ok(true)
    }

    async fn insert_session(&self, session: NewSession) -> Result<Session, StoreError> {
        let mut state = self.state.write().await;
        let id = state.next_id();
        let session = Session {
            id,
            token: session.token,
            active: session.active,
            issued_at: session.issued_at,
            expires_at: session.expires_at,
            identity_id: session.identity_id,
        };
        state.sessions.insert(id, session.clone());
        Ok(session)
    }

    async fn find_session_identity(
        &self,
        token: &str,
        now: NaiveDateTime,
    ) -> Result<Option<Identity>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .sessions
            .values()
            .find(|s| s.token == token && s.active && s.expires_at > now && s.issued_at <= now)
            .and_then(|s| state.identities.get(&s.identity_id).cloned()))
    }

    async fn deactivate_session(&self, token: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        for session in state.sessions.values_mut().filter(|s| s.token == token) {
            session.active = false;
        }
        Ok(())
    }

    async fn insert_article(&self, article: NewArticle) -> Result<Article, StoreError> {
        let mut state = self.state.write().await;

        if state.articles.values().any(|a| a.slug == article.slug) {
            return Err(StoreError::Conflict("slug"));
        }

        let id = state.next_id();
        let article = Article {
            id,
            title: article.title,
            slug: article.slug,
            original_source: article.original_source,
            summary: article.summary,
            body: article.body,
            tags: article.tags,
            category: article.category,
            cover_image: article.cover_image,
            author: article.author,
            published: false,
            published_at: None,
            created_at: article.created_at,
            updated_at: article.created_at,
        };
        state.articles.insert(id, article.clone());

        Ok(article)
    }

    async fn find_article(&self, id: i32) -> Result<Option<Article>, StoreError> {
        Ok(self.state.read().await.articles.get(&id).cloned())
    }

    async fn find_article_by_slug(&self, slug: &str) -> Result<Option<Article>, StoreError> {
        let state = self.state.read().await;
        Ok(state.articles.values().find(|a| a.slug == slug).cloned())
    }

    async fn list_articles(
        &self,
        filter: &ArticleFilter,
        order: ArticleOrder,
        limit: Option<i64>,
    ) -> Result<Vec<Article>, StoreError> {
        let state = self.state.read().await;
        let mut articles: Vec<Article> = state
            .articles
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();

        match order {
            // `None` sorts below `Some`, so drafts end up last
            ArticleOrder::PublishedNewest => {
                articles.sort_by(|a, b| (b.published_at, b.id).cmp(&(a.published_at, a.id)))
            }
            ArticleOrder::CreatedNewest => {
                articles.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)))
            }
        }

        if let Some(limit) = limit {
            articles.truncate(limit.max(0) as usize);
        }

        Ok(articles)
    }

    async fn count_articles(&self, published: Option<bool>) -> Result<i64, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .articles
            .values()
            .filter(|a| published.is_none_or(|p| a.published == p))
            .count() as i64)
    }

    async fn update_article(
        &self,
        id: i32,
        changes: ArticleChanges,
    ) -> Result<Option<Article>, StoreError> {
        let mut state = self.state.write().await;

        if let Some(slug) = &changes.slug {
            if state.articles.values().any(|a| a.id != id && &a.slug == slug) {
                return Err(StoreError::Conflict("slug"));
            }
        }

        let Some(article) = state.articles.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            article.title = title;
        }
        if let Some(slug) = changes.slug {
            article.slug = slug;
        }
        if let Some(original_source) = changes.original_source {
            article.original_source = Some(original_source);
        }
        if let Some(summary) = changes.summary {
            article.summary = summary;
        }
        if let Some(body) = changes.body {
            article.body = body;
        }
        if let Some(tags) = changes.tags {
            article.tags = tags;
        }
        if let Some(category) = changes.category {
            article.category = category;
        }
        if let Some(cover_image) = changes.cover_image {
            article.cover_image = Some(cover_image);
        }
        article.updated_at = changes.updated_at;

        Ok(Some(article.clone()))
    }

    async fn set_article_publication(
        &self,
        id: i32,
        published_at: Option<NaiveDateTime>,
        now: NaiveDateTime,
    ) -> Result<Option<Article>, StoreError> {
        let mut state = self.state.write().await;
        Ok(state.articles.get_mut(&id).map(|article| {
            article.published = published_at.is_some();
            article.published_at = published_at;
            article.updated_at = now;
            article.clone()
        }))
    }

    async fn delete_article(&self, id: i32) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        if state.articles.remove(&id).is_none() {
            return Ok(false);
        }
        state.remove_comments(|c| c.article_id == id);
        Ok(true)
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment, StoreError> {
        let mut state = self.state.write().await;
        let id = state.next_id();
        let comment = Comment {
            id,
            content: comment.content,
            article_id: comment.article_id,
            author_id: comment.author_id,
            parent_id: comment.parent_id,
            likes: vec![],
            created_at: comment.created_at,
            updated_at: comment.created_at,
        };
        state.comments.insert(id, comment.clone());
        Ok(comment)
    }

    async fn find_comment(&self, id: i32) -> Result<Option<Comment>, StoreError> {
        Ok(self.state.read().await.comments.get(&id).cloned())
    }

    async fn list_comments(&self, scope: CommentScope) -> Result<Vec<Comment>, StoreError> {
        let state = self.state.read().await;
        let mut comments: Vec<Comment> = state
            .comments
            .values()
            .filter(|c| match scope {
                CommentScope::TopLevel { article_id } => {
                    c.article_id == article_id && c.parent_id.is_none()
                }
                CommentScope::Replies { parent_id } => c.parent_id == Some(parent_id),
            })
            .cloned()
            .collect();

        match scope {
            CommentScope::TopLevel { .. } => {
                comments.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)))
            }
            CommentScope::Replies { .. } => comments.sort_by_key(|c| (c.created_at, c.id)),
        }

        Ok(comments)
    }

    async fn update_comment_content(
        &self,
        id: i32,
        content: String,
        now: NaiveDateTime,
    ) -> Result<Option<Comment>, StoreError> {
        let mut state = self.state.write().await;
        Ok(state.comments.get_mut(&id).map(|comment| {
            comment.content = content;
            comment.updated_at = now;
            comment.clone()
        }))
    }

    async fn delete_comment(&self, id: i32) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        if !state.comments.contains_key(&id) {
            return Ok(false);
        }
        state.remove_comments(|c| c.id == id);
        Ok(true)
    }

    async fn toggle_comment_like(
        &self,
        id: i32,
        identity_id: i32,
    ) -> Result<Option<Comment>, StoreError> {
        let mut state = self.state.write().await;
        Ok(state.comments.get_mut(&id).map(|comment| {
            if comment.is_liked_by(identity_id) {
                comment.likes.retain(|l| *l != identity_id);
            } else {
                comment.likes.push(identity_id);
            }
            comment.clone()
        }))
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::news::models::article::Category;

    fn now() -> NaiveDateTime {
        chrono::Utc::now().naive_utc()
    }

    fn new_identity(email: &str) -> NewIdentity {
        Identity::new_with_role("Someone".into(), email.into(), "hash".into(), Role::Author)
    }

    fn new_article(slug: &str, author: Option<i32>) -> NewArticle {
        NewArticle {
            title: slug.into(),
            slug: slug.into(),
            original_source: None,
            summary: String::new(),
            body: String::new(),
            tags: vec![],
            category: Category::Technology,
            cover_image: None,
            author,
            created_at: now(),
        }
    }

    fn new_comment(article_id: i32, author_id: i32, parent_id: Option<i32>) -> NewComment {
        NewComment {
            content: "hi".into(),
            article_id,
            author_id,
            parent_id,
            created_at: now(),
        }
    }

    #[tokio::test]
    async fn test_email_and_slug_are_unique() {
        let store = MemoryStore::new();
        store.insert_identity(new_identity("a@x.io")).await.unwrap();
        let dup = store.insert_identity(new_identity("a@x.io")).await;
        assert!(matches!(dup, Err(StoreError::Conflict("email"))));

        store.insert_article(new_article("hello", None)).await.unwrap();
        let dup = store.insert_article(new_article("hello", None)).await;
        assert!(matches!(dup, Err(StoreError::Conflict("slug"))));
    }

    #[tokio::test]
    async fn test_concurrent_toggles_do_not_lose_likes() {
        let store = Arc::new(MemoryStore::new());
        let comment_id = store.insert_comment(new_comment(1, 1, None)).await.unwrap().id;

        let handles: Vec<_> = (1..=50)
            .map(|identity_id| {
                let store = store.clone();
                tokio::spawn(async move {
                    store.toggle_comment_like(comment_id, identity_id).await.unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let comment = store.find_comment(comment_id).await.unwrap().unwrap();
        assert_eq!(comment.likes.len(), 50);
    }

    #[tokio::test]
    async fn test_deleting_parent_promotes_replies() {
        let store = MemoryStore::new();
        let parent = store.insert_comment(new_comment(1, 1, None)).await.unwrap();
        let reply = store
            .insert_comment(new_comment(1, 2, Some(parent.id)))
            .await
            .unwrap();

        assert!(store.delete_comment(parent.id).await.unwrap());

        let reply = store.find_comment(reply.id).await.unwrap().unwrap();
        assert_eq!(reply.parent_id, None);
        assert!(!store.delete_comment(parent.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_identity_policies() {
        let store = MemoryStore::new();
        let author = store.insert_identity(new_identity("a@x.io")).await.unwrap();
        let other = store.insert_identity(new_identity("b@x.io")).await.unwrap();
        let article = store
            .insert_article(new_article("a", Some(author.id)))
            .await
            .unwrap();
        let comment = store
            .insert_comment(new_comment(article.id, author.id, None))
            .await
            .unwrap();
        let liked = store
            .insert_comment(new_comment(article.id, other.id, None))
            .await
            .unwrap();
        store.toggle_comment_like(liked.id, author.id).await.unwrap();

        let blocked = store.delete_identity(author.id, OnUserDelete::Block).await;
        assert!(matches!(blocked, Err(StoreError::Blocked(_))));
        assert!(store.find_identity(author.id).await.unwrap().is_some());

        assert!(store.delete_identity(author.id, OnUserDelete::Orphan).await.unwrap());
        let article = store.find_article(article.id).await.unwrap().unwrap();
        assert_eq!(article.author, None);
        assert!(store.find_comment(comment.id).await.unwrap().is_none());
        let liked = store.find_comment(liked.id).await.unwrap().unwrap();
        assert!(liked.likes.is_empty());
    }

    #[tokio::test]
    async fn test_cascade_removes_articles_and_their_comments() {
        let store = MemoryStore::new();
        let author = store.insert_identity(new_identity("a@x.io")).await.unwrap();
        let other = store.insert_identity(new_identity("b@x.io")).await.unwrap();
        let article = store
            .insert_article(new_article("a", Some(author.id)))
            .await
            .unwrap();
        let foreign = store
            .insert_comment(new_comment(article.id, other.id, None))
            .await
            .unwrap();

        assert!(store.delete_identity(author.id, OnUserDelete::Cascade).await.unwrap());
        assert!(store.find_article(article.id).await.unwrap().is_none());
        assert!(store.find_comment(foreign.id).await.unwrap().is_none());
        assert!(store.find_identity(other.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_expired_or_inactive_sessions_do_not_resolve() {
        let store = MemoryStore::new();
        let identity = store.insert_identity(new_identity("a@x.io")).await.unwrap();
        let session = Session::new_with_identity_id(identity.id, 30);
        let token = session.token.clone();
        let expires_at = session.expires_at;
        store.insert_session(session).await.unwrap();

        assert!(store.find_session_identity(&token, now()).await.unwrap().is_some());
        assert!(
            store
                .find_session_identity(&token, expires_at)
                .await
                .unwrap()
                .is_none()
        );

        store.deactivate_session(&token).await.unwrap();
        assert!(store.find_session_identity(&token, now()).await.unwrap().is_none());
    }
}
