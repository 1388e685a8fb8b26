use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    App,
    error::AppError,
    identity::{
        AdminUser,
        models::identity::{Profile, Role},
    },
    news::{
        article::service::{self as articles, ArticlePatch},
        models::article::ArticleView,
    },
};

use super::service::{self, Dashboard};

pub fn route() -> Router<App> {
    Router::<App>::new()
        .route("/dashboard", get(get_dashboard))
        .route("/users", get(get_users))
        .route("/users/{id}", get(get_user).delete(delete_user))
        .route("/users/{id}/role", patch(patch_user_role))
        .route("/articles", get(get_articles))
        .route(
            "/articles/{id}",
            get(get_article).put(put_article).delete(delete_article),
        )
}

#[derive(Deserialize)]
pub struct DashboardQuery {
    limit: Option<i64>,
}

async fn get_dashboard(
    State(ctx): State<App>,
    AdminUser(admin): AdminUser,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Dashboard>, AppError> {
    Ok(Json(
        service::dashboard(ctx.store.as_ref(), &admin, query.limit).await?,
    ))
}

async fn get_users(
    State(ctx): State<App>,
    AdminUser(admin): AdminUser,
) -> Result<Json<Vec<Profile>>, AppError> {
    Ok(Json(service::list_users(ctx.store.as_ref(), &admin).await?))
}

async fn get_user(
    State(ctx): State<App>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i32>,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(service::get_user(ctx.store.as_ref(), &admin, id).await?))
}

#[derive(Deserialize)]
pub struct RoleChange {
    role: String,
}

async fn patch_user_role(
    State(ctx): State<App>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i32>,
    crate::json::Json(change): crate::json::Json<RoleChange>,
) -> Result<Json<Value>, AppError> {
    let role: Role = change
        .role
        .parse()
        .map_err(|_| AppError::Validation("Invalid role".into()))?;

    let user = service::set_role(ctx.store.as_ref(), &admin, id, role).await?;

    Ok(Json(
        json!({ "message": "User role updated successfully", "user": user }),
    ))
}

async fn delete_user(
    State(ctx): State<App>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i32>,
) -> Result<Json<Value>, AppError> {
    service::delete_user(ctx.store.as_ref(), &admin, id, ctx.config.on_user_delete).await?;

    Ok(Json(json!({ "message": "User deleted successfully" })))
}

async fn get_articles(
    State(ctx): State<App>,
    AdminUser(_): AdminUser,
) -> Result<Json<Vec<ArticleView>>, AppError> {
    Ok(Json(articles::list_all(ctx.store.as_ref(), None).await?))
}

async fn get_article(
    State(ctx): State<App>,
    AdminUser(_): AdminUser,
    Path(id): Path<i32>,
) -> Result<Json<ArticleView>, AppError> {
    Ok(Json(articles::get(ctx.store.as_ref(), id).await?))
}

async fn put_article(
    State(ctx): State<App>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i32>,
    crate::json::Json(patch): crate::json::Json<ArticlePatch>,
) -> Result<Json<Value>, AppError> {
    let article = articles::update(ctx.store.as_ref(), &admin, id, patch).await?;

    Ok(Json(
        json!({ "message": "Article updated successfully", "article": article }),
    ))
}

async fn delete_article(
    State(ctx): State<App>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i32>,
) -> Result<Json<Value>, AppError> {
    articles::delete(ctx.store.as_ref(), &admin, id).await?;

    Ok(Json(json!({ "message": "Article deleted successfully" })))
}
