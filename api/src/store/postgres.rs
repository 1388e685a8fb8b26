use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use diesel::{
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
};
use diesel_async::{
    AsyncConnection, AsyncPgConnection, RunQueryDsl,
    pooled_connection::{AsyncDieselConnectionManager, deadpool::Pool},
    scoped_futures::ScopedFutureExt,
};

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
    schema::{articles, comment_likes, comments, identities, sessions},
};

pub struct PgStore {
    pool: Pool<AsyncPgConnection>,
}

impl PgStore {
    pub fn new(database_url: &str, max_size: usize) -> Result<Self, StoreError> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = Pool::builder(manager)
            .max_size(max_size)
            .build()
            .map_err(pool_error)?;

        Ok(Self { pool })
    }
}

fn pool_error(e: impl std::fmt::Display) -> StoreError {
    StoreError::Pool(e.to_string())
}

fn unique_violation(field: &'static str) -> impl FnOnce(DieselError) -> StoreError {
    move |e| match e {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            StoreError::Conflict(field)
        }
        e => StoreError::Database(e),
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = identities)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct IdentityRow {
    id: i32,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    profile_picture: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl TryFrom<IdentityRow> for Identity {
    type Error = StoreError;

    fn try_from(row: IdentityRow) -> Result<Self, Self::Error> {
        Ok(Identity {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role.parse().map_err(StoreError::Corrupt)?,
            profile_picture: row.profile_picture,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = identities)]
struct NewIdentityRow {
    name: String,
    email: String,
    password_hash: String,
    role: String,
    profile_picture: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl From<NewIdentity> for NewIdentityRow {
    fn from(i: NewIdentity) -> Self {
        NewIdentityRow {
            name: i.name,
            email: i.email,
            password_hash: i.password_hash,
            role: i.role.as_str().to_string(),
            profile_picture: i.profile_picture,
            created_at: i.created_at,
            updated_at: i.updated_at,
        }
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct SessionRow {
    id: i32,
    token: String,
    active: bool,
    issued_at: NaiveDateTime,
    expires_at: NaiveDateTime,
    identity_id: i32,
}

#[derive(Insertable)]
#[diesel(table_name = sessions)]
struct NewSessionRow {
    token: String,
    active: bool,
    issued_at: NaiveDateTime,
    expires_at: NaiveDateTime,
    identity_id: i32,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = articles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct ArticleRow {
    id: i32,
    title: String,
    slug: String,
    original_source: Option<String>,
    summary: String,
    body: String,
    tags: Vec<String>,
    category: String,
    cover_image: Option<String>,
    author_id: Option<i32>,
    published: bool,
    published_at: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl TryFrom<ArticleRow> for Article {
    type Error = StoreError;

    fn try_from(row: ArticleRow) -> Result<Self, Self::Error> {
        Ok(Article {
            id: row.id,
            title: row.title,
            slug: row.slug,
            original_source: row.original_source,
            summary: row.summary,
            body: row.body,
            tags: row.tags,
            category: row.category.parse().map_err(StoreError::Corrupt)?,
            cover_image: row.cover_image,
            author: row.author_id,
            published: row.published,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = articles)]
struct NewArticleRow {
    title: String,
    slug: String,
    original_source: Option<String>,
    summary: String,
    body: String,
    tags: Vec<String>,
    category: String,
    cover_image: Option<String>,
    author_id: Option<i32>,
    published: bool,
    published_at: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl From<NewArticle> for NewArticleRow {
    fn from(a: NewArticle) -> Self {
        NewArticleRow {
            title: a.title,
            slug: a.slug,
            original_source: a.original_source,
            summary: a.summary,
            body: a.body,
            tags: a.tags,
            category: a.category.name().to_string(),
            cover_image: a.cover_image,
            author_id: a.author,
            published: false,
            published_at: None,
            created_at: a.created_at,
            updated_at: a.created_at,
        }
    }
}

#[derive(AsChangeset)]
#[diesel(table_name = articles)]
struct ArticleChangesRow {
    title: Option<String>,
    slug: Option<String>,
    original_source: Option<String>,
    summary: Option<String>,
    body: Option<String>,
    tags: Option<Vec<String>>,
    category: Option<String>,
    cover_image: Option<String>,
    updated_at: NaiveDateTime,
}

impl From<ArticleChanges> for ArticleChangesRow {
    fn from(c: ArticleChanges) -> Self {
        ArticleChangesRow {
            title: c.title,
            slug: c.slug,
            original_source: c.original_source,
            summary: c.summary,
            body: c.body,
            tags: c.tags,
            category: c.category.map(|c| c.name().to_string()),
            cover_image: c.cover_image,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct CommentRow {
    id: i32,
    content: String,
    article_id: i32,
    identity_id: i32,
    parent_id: Option<i32>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl CommentRow {
    fn into_comment(self, likes: Vec<i32>) -> Comment {
        Comment {
            id: self.id,
            content: self.content,
            article_id: self.article_id,
            author_id: self.identity_id,
            parent_id: self.parent_id,
            likes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = comments)]
struct NewCommentRow {
    content: String,
    article_id: i32,
    identity_id: i32,
    parent_id: Option<i32>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

// Attaches the likers of each comment, in the order the likes were added.
async fn with_likes(
    conn: &mut AsyncPgConnection,
    rows: Vec<CommentRow>,
) -> Result<Vec<Comment>, StoreError> {
    let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();

    let likes: Vec<(i32, i32)> = comment_likes::table
        .filter(comment_likes::comment_id.eq_any(ids))
        .order((
            comment_likes::created_at.asc(),
            comment_likes::identity_id.asc(),
        ))
        .select((comment_likes::comment_id, comment_likes::identity_id))
        .load(conn)
        .await?;

    let mut by_comment: HashMap<i32, Vec<i32>> = HashMap::new();
    for (comment_id, identity_id) in likes {
        by_comment.entry(comment_id).or_default().push(identity_id);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let likes = by_comment.remove(&row.id).unwrap_or_default();
            row.into_comment(likes)
        })
        .collect())
}

async fn one_with_likes(
    conn: &mut AsyncPgConnection,
    row: Option<CommentRow>,
) -> Result<Option<Comment>, StoreError> {
    match row {
        Some(row) => Ok(with_likes(conn, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_identity(&self, identity: NewIdentity) -> Result<Identity, StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        diesel::insert_into(identities::table)
            .values(NewIdentityRow::from(identity))
            .returning(IdentityRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(unique_violation("email"))?
            .try_into()
    }

    async fn find_identity(&self, id: i32) -> Result<Option<Identity>, StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        identities::table
            .find(id)
            .select(IdentityRow::as_select())
            .first(&mut conn)
            .await
            .optional()?
            .map(Identity::try_from)
            .transpose()
    }

    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        identities::table
            .filter(identities::email.eq(email))
            .select(IdentityRow::as_select())
            .first(&mut conn)
            .await
            .optional()?
            .map(Identity::try_from)
            .transpose()
    }

    async fn find_identities(&self, ids: &[i32]) -> Result<Vec<Identity>, StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        identities::table
            .filter(identities::id.eq_any(ids.to_vec()))
            .select(IdentityRow::as_select())
            .load(&mut conn)
            .await?
            .into_iter()
            .map(Identity::try_from)
            .collect()
    }

    async fn list_identities(&self, limit: Option<i64>) -> Result<Vec<Identity>, StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let mut query = identities::table
            .select(IdentityRow::as_select())
            .order((identities::created_at.desc(), identities::id.desc()))
            .into_boxed();
        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        query
            .load(&mut conn)
            .await?
            .into_iter()
            .map(Identity::try_from)
            .collect()
    }

    async fn count_identities(&self, role: Option<Role>) -> Result<i64, StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let mut query = identities::table.into_boxed();
        if let Some(role) = role {
            query = query.filter(identities::role.eq(role.as_str()));
        }

        Ok(query.count().get_result(&mut conn).await?)
    }

    async fn set_identity_role(
        &self,
        id: i32,
        role: Role,
        now: NaiveDateTime,
    ) -> Result<Option<Identity>, StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        diesel::update(identities::table.find(id))
            .set((
                identities::role.eq(role.as_str()),
                identities::updated_at.eq(now),
            ))
            .returning(IdentityRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?
            .map(Identity::try_from)
            .transpose()
    }

    async fn delete_identity(&self, id: i32, policy: OnUserDelete) -> Result<bool, StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        conn.transaction(|conn| {
            async move {
                let exists = identities::table
                    .find(id)
                    .select(identities::id)
                    .first::<i32>(conn)
                    .await
                    .optional()?;
                if exists.is_none() {
                    return Ok(false);
                }

                // articles.author_id is ON DELETE SET NULL, the identity's
                // comments, likes and sessions are ON DELETE CASCADE
                match policy {
                    OnUserDelete::Block => {
                        let article_count: i64 = articles::table
                            .filter(articles::author_id.eq(id))
                            .count()
                            .get_result(conn)
                            .await?;
                        let comment_count: i64 = comments::table
                            .filter(comments::identity_id.eq(id))
                            .count()
                            .get_result(conn)
                            .await?;
                        if article_count + comment_count > 0 {
                            return Err(StoreError::Blocked(format!(
                                "Identity still authors {article_count} articles and {comment_count} comments"
                            )));
                        }
                    }
                    OnUserDelete::Orphan => {}
                    OnUserDelete::Cascade => {
                        let authored = articles::table
                            .filter(articles::author_id.eq(id))
                            .select(articles::id);

                        diesel::delete(comments::table.filter(comments::article_id.eq_any(authored)))
                            .execute(conn)
                            .await?;
                        diesel::delete(articles::table.filter(articles::author_id.eq(id)))
                            .execute(conn)
                            .await?;
                    }
                }

                diesel::delete(identities::table.find(id))
                    .execute(conn)
                    .await?;

                Ok::<bool, StoreError>(true)
            }
            .scope_boxed()
        })
        .await
    }

    async fn insert_session(&self, session: NewSession) -> Result<Session, StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let row = diesel::insert_into(sessions::table)
            .values(NewSessionRow {
                token: session.token,
                active: session.active,
                issued_at: session.issued_at,
                expires_at: session.expires_at,
                identity_id: session.identity_id,
                created_at: session.created_at,
                updated_at: session.updated_at,
            })
            .returning(SessionRow::as_returning())
            .get_result(&mut conn)
            .await?;

        Ok(Session {
            id: row.id,
            token: row.token,
            active: row.active,
            issued_at: row.issued_at,
            expires_at: row.expires_at,
            identity_id: row.identity_id,
        })
    }

    async fn find_session_identity(
        &self,
        token: &str,
        now: NaiveDateTime,
    ) -> Result<Option<Identity>, StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        sessions::table
            .inner_join(identities::table)
            .filter(sessions::token.eq(token))
            .filter(sessions::active.eq(true))
            .filter(sessions::expires_at.gt(now))
            .filter(sessions::issued_at.le(now))
            .select(IdentityRow::as_select())
            .first(&mut conn)
            .await
            .optional()?
            .map(Identity::try_from)
            .transpose()
    }

    async fn deactivate_session(&self, token: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        diesel::update(sessions::table.filter(sessions::token.eq(token)))
            .set((
                sessions::active.eq(false),
                sessions::updated_at.eq(chrono::Utc::now().naive_utc()),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    async fn insert_article(&self, article: NewArticle) -> Result<Article, StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        diesel::insert_into(articles::table)
            .values(NewArticleRow::from(article))
            .returning(ArticleRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(unique_violation("slug"))?
            .try_into()
    }

    async fn find_article(&self, id: i32) -> Result<Option<Article>, StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        articles::table
            .find(id)
            .select(ArticleRow::as_select())
            .first(&mut conn)
            .await
            .optional()?
            .map(Article::try_from)
            .transpose()
    }

    async fn find_article_by_slug(&self, slug: &str) -> Result<Option<Article>, StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        articles::table
            .filter(articles::slug.eq(slug))
            .select(ArticleRow::as_select())
            .first(&mut conn)
            .await
            .optional()?
            .map(Article::try_from)
            .transpose()
    }

    async fn list_articles(
        &self,
        filter: &ArticleFilter,
        order: ArticleOrder,
        limit: Option<i64>,
    ) -> Result<Vec<Article>, StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let mut query = articles::table.select(ArticleRow::as_select()).into_boxed();

        if let Some(published) = filter.published {
            query = query.filter(articles::published.eq(published));
        }
        if let Some(categories) = &filter.categories {
            let names: Vec<&'static str> = categories.iter().map(|c| c.name()).collect();
            query = query.filter(articles::category.eq_any(names));
        }

        query = match order {
            // published rows first, drafts have no publish time
            ArticleOrder::PublishedNewest => query.order((
                articles::published.desc(),
                articles::published_at.desc(),
                articles::id.desc(),
            )),
            ArticleOrder::CreatedNewest => {
                query.order((articles::created_at.desc(), articles::id.desc()))
            }
        };

        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        query
            .load(&mut conn)
            .await?
            .into_iter()
            .map(Article::try_from)
            .collect()
    }

    async fn count_articles(&self, published: Option<bool>) -> Result<i64, StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let mut query = articles::table.into_boxed();
        if let Some(published) = published {
            query = query.filter(articles::published.eq(published));
        }

        Ok(query.count().get_result(&mut conn).await?)
    }

    async fn update_article(
        &self,
        id: i32,
        changes: ArticleChanges,
    ) -> Result<Option<Article>, StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        diesel::update(articles::table.find(id))
            .set(ArticleChangesRow::from(changes))
            .returning(ArticleRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(unique_violation("slug"))?
            .map(Article::try_from)
            .transpose()
    }

    async fn set_article_publication(
        &self,
        id: i32,
        published_at: Option<NaiveDateTime>,
        now: NaiveDateTime,
    ) -> Result<Option<Article>, StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        diesel::update(articles::table.find(id))
            .set((
                articles::published.eq(published_at.is_some()),
                articles::published_at.eq(published_at),
                articles::updated_at.eq(now),
            ))
            .returning(ArticleRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?
            .map(Article::try_from)
            .transpose()
    }

    async fn delete_article(&self, id: i32) -> Result<bool, StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        conn.transaction(|conn| {
            async move {
                diesel::delete(comments::table.filter(comments::article_id.eq(id)))
                    .execute(conn)
                    .await?;

                let deleted = diesel::delete(articles::table.find(id))
                    .execute(conn)
                    .await?;

                Ok::<bool, StoreError>(deleted > 0)
            }
            .scope_boxed()
        })
        .await
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment, StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let row = diesel::insert_into(comments::table)
            .values(NewCommentRow {
                content: comment.content,
                article_id: comment.article_id,
                identity_id: comment.author_id,
                parent_id: comment.parent_id,
                created_at: comment.created_at,
                updated_at: comment.created_at,
            })
            .returning(CommentRow::as_returning())
            .get_result(&mut conn)
            .await?;

        Ok(row.into_comment(vec![]))
    }

    async fn find_comment(&self, id: i32) -> Result<Option<Comment>, StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let row = comments::table
            .find(id)
            .select(CommentRow::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        one_with_likes(&mut conn, row).await
    }

    async fn list_comments(&self, scope: CommentScope) -> Result<Vec<Comment>, StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let query = comments::table.select(CommentRow::as_select()).into_boxed();
        let query = match scope {
            CommentScope::TopLevel { article_id } => query
                .filter(comments::article_id.eq(article_id))
                .filter(comments::parent_id.is_null())
                .order((comments::created_at.desc(), comments::id.desc())),
            CommentScope::Replies { parent_id } => query
                .filter(comments::parent_id.eq(parent_id))
                .order((comments::created_at.asc(), comments::id.asc())),
        };

        let rows = query.load(&mut conn).await?;

        with_likes(&mut conn, rows).await
    }

    async fn update_comment_content(
        &self,
        id: i32,
        content: String,
        now: NaiveDateTime,
    ) -> Result<Option<Comment>, StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let row = diesel::update(comments::table.find(id))
            .set((comments::content.eq(content), comments::updated_at.eq(now)))
            .returning(CommentRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?;

        one_with_likes(&mut conn, row).await
    }

    async fn delete_comment(&self, id: i32) -> Result<bool, StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        // replies keep existing, parent_id is ON DELETE SET NULL
        let deleted = diesel::delete(comments::table.find(id))
            .execute(&mut conn)
            .await?;

        Ok(deleted > 0)
    }

    async fn toggle_comment_like(
        &self,
        id: i32,
        identity_id: i32,
    ) -> Result<Option<Comment>, StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        conn.transaction(|conn| {
            async move {
                // the row lock serialises toggles on the same comment
                let Some(row) = comments::table
                    .find(id)
                    .select(CommentRow::as_select())
                    .for_update()
                    .first(conn)
                    .await
                    .optional()?
                else {
                    return Ok(None);
                };

                let removed = diesel::delete(comment_likes::table.find((id, identity_id)))
                    .execute(conn)
                    .await?;

                if removed == 0 {
                    diesel::insert_into(comment_likes::table)
                        .values((
                            comment_likes::comment_id.eq(id),
                            comment_likes::identity_id.eq(identity_id),
                            comment_likes::created_at.eq(chrono::Utc::now().naive_utc()),
                        ))
                        .execute(conn)
                        .await?;
                }

                one_with_likes(conn, Some(row)).await
            }
            .scope_boxed()
        })
        .await
    }
}
