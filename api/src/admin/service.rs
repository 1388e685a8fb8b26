use serde::Serialize;

use crate::{
    authz::{Action, Record, authorize},
    config::AdminSeed,
    error::AppError,
    identity::{
        models::identity::{Identity, Profile, Role},
        password,
    },
    news::{article::service as articles, models::article::ArticleView},
    store::{OnUserDelete, Store},
};

pub const DEFAULT_RECENT_LIMIT: i64 = 5;

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_users: i64,
    pub admin_users: i64,
    pub author_users: i64,
    pub total_articles: i64,
    pub published_articles: i64,
    pub unpublished_articles: i64,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub statistics: Statistics,
    pub recent_articles: Vec<ArticleView>,
    pub recent_users: Vec<Profile>,
}

pub async fn dashboard(
    store: &dyn Store,
    caller: &Identity,
    limit: Option<i64>,
) -> Result<Dashboard, AppError> {
    authorize(caller, Record::AdminPanel, Action::Read)
        .or_forbid("Access denied. Admin privileges required.")?;

    let limit = limit.unwrap_or(DEFAULT_RECENT_LIMIT).max(0);

    let statistics = Statistics {
        total_users: store.count_identities(None).await?,
        admin_users: store.count_identities(Some(Role::Admin)).await?,
        author_users: store.count_identities(Some(Role::Author)).await?,
        total_articles: store.count_articles(None).await?,
        published_articles: store.count_articles(Some(true)).await?,
        unpublished_articles: store.count_articles(Some(false)).await?,
    };

    let recent_articles = articles::list_all(store, Some(limit)).await?;
    let recent_users: Vec<Profile> = store
        .list_identities(Some(limit))
        .await?
        .iter()
        .map(Identity::profile)
        .collect();

    Ok(Dashboard {
        statistics,
        recent_articles,
        recent_users,
    })
}

async fn find(store: &dyn Store, id: i32) -> Result<Identity, AppError> {
    store
        .find_identity(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// Every identity, newest first.
pub async fn list_users(store: &dyn Store, caller: &Identity) -> Result<Vec<Profile>, AppError> {
    authorize(caller, Record::AdminPanel, Action::Read)
        .or_forbid("Access denied. Admin privileges required.")?;

    Ok(store
        .list_identities(None)
        .await?
        .iter()
        .map(Identity::profile)
        .collect())
}

pub async fn get_user(store: &dyn Store, caller: &Identity, id: i32) -> Result<Profile, AppError> {
    authorize(caller, Record::Identities, Action::Read)
        .or_forbid("Access denied. Admin privileges required.")?;

    Ok(find(store, id).await?.profile())
}

pub async fn set_role(
    store: &dyn Store,
    caller: &Identity,
    id: i32,
    role: Role,
) -> Result<Profile, AppError> {
    authorize(caller, Record::Identities, Action::ChangeRole)
        .or_forbid("Access denied. Admin privileges required.")?;

    let updated = store
        .set_identity_role(id, role, chrono::Utc::now().naive_utc())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    tracing::info!(id, role = role.as_str(), by = caller.id, "Role changed");

    Ok(updated.profile())
}

/// Deletes an identity according to `policy`. Admins cannot delete themselves.
pub async fn delete_user(
    store: &dyn Store,
    caller: &Identity,
    id: i32,
    policy: OnUserDelete,
) -> Result<(), AppError> {
    authorize(caller, Record::Identities, Action::Delete)
        .or_forbid("Access denied. Admin privileges required.")?;

    let identity = find(store, id).await?;

    if identity.id == caller.id {
        return Err(AppError::Validation(
            "Cannot delete your own account".into(),
        ));
    }

    if !store.delete_identity(id, policy).await? {
        return Err(AppError::NotFound("User not found".into()));
    }

    tracing::info!(id, ?policy, by = caller.id, "Identity deleted");

    Ok(())
}

/// Creates the configured admin unless an identity with its email exists.
pub async fn seed_admin(store: &dyn Store, seed: &AdminSeed) -> Result<(), AppError> {
    let email = seed.email.trim().to_lowercase();

    if let Some(existing) = store.find_identity_by_email(&email).await? {
        if !existing.role.is_admin() {
            tracing::warn!(id = existing.id, "Seed admin email belongs to a non-admin identity");
        }
        return Ok(());
    }

    let password_hash = password::hash(seed.password.clone()).await?;
    let admin = store
        .insert_identity(Identity::new_with_role(
            seed.name.trim().to_string(),
            email,
            password_hash,
            Role::Admin,
        ))
        .await?;

    tracing::info!(id = admin.id, "Seeded admin identity");

    Ok(())
}
