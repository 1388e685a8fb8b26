use std::str::FromStr;

use crate::store::OnUserDelete;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Env {
    Dev,
    Staging,
    Production,
}

pub struct ServerConfig {
    pub env: Env,
    pub port: u16,
    pub database_url: Option<String>,
    pub database_pool_size: usize,
    pub cors_origin: String,
    pub session_ttl_days: i64,
    pub on_user_delete: OnUserDelete,
    /// Reject comments on articles that do not exist.
    pub comments_require_article: bool,
    pub admin: Option<AdminSeed>,
}

pub struct AdminSeed {
    pub name: String,
    pub email: String,
    pub password: String,
}

fn var(key: &str) -> Result<Option<String>, String> {
    match std::env::var(key) {
        Ok(env) => Ok(Some(env)),
        Err(e) => {
            tracing::debug!("Missing environment variable `{key}`");
            match e {
                std::env::VarError::NotPresent => Ok(None),
                std::env::VarError::NotUnicode(_) => Err(format!(
                    "Could not get the environment variable `{key}` due to unicode error"
                )),
            }
        }
    }
}

/// Parses a variable, falling back to `default` when it is missing or invalid
fn parsed_var<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Ok(Some(raw)) => match raw.trim().parse() {
            Ok(val) => val,
            Err(e) => {
                tracing::warn!("Invalid value `{raw}` for `{key}`, using the default: {e}");
                default
            }
        },
        Ok(None) => default,
        Err(e) => {
            tracing::warn!("{e}, using the default");
            default
        }
    }
}

const MAX_SESSION_TTL_DAYS: i64 = 365;

fn session_ttl_days(days: i64) -> i64 {
    if (1..=MAX_SESSION_TTL_DAYS).contains(&days) {
        days
    } else {
        tracing::warn!(
            "`SESSION_TTL_DAYS` must be between 1 and {MAX_SESSION_TTL_DAYS}, got {days}, using 30"
        );
        30
    }
}

/// Either all or none variables are set
fn all_or_none_vars(keys: Vec<&str>) -> Option<Vec<String>> {
    let vals: Vec<Option<String>> = keys.iter().map(|k| var(k).ok().flatten()).collect();

    if vals.iter().all(Option::is_some) {
        return Some(vals.into_iter().flatten().collect());
    }

    if vals.iter().any(Option::is_some) {
        for (k, v) in keys.iter().zip(&vals) {
            if v.is_none() {
                tracing::error!(
                    "Environment variable `{k}` is required if variables {keys:?} are present"
                );
            }
        }
    }

    None
}

impl ServerConfig {
    pub fn new_from_env() -> Self {
        let admin = all_or_none_vars(vec!["ADMIN_NAME", "ADMIN_EMAIL", "ADMIN_PASSWORD"]).map(
            |mut vars| AdminSeed {
                name: vars.remove(0),
                email: vars.remove(0),
                password: vars.remove(0),
            },
        );

        ServerConfig {
            env: match var("ENVIRONMENT") {
                Ok(Some(env)) => match env.as_str() {
                    "dev" => Env::Dev,
                    "staging" => Env::Staging,
                    "production" => Env::Production,
                    _ => Env::Dev,
                },
                _ => Env::Dev,
            },
            port: parsed_var("PORT", 5000),
            database_url: var("DATABASE_URL").ok().flatten(),
            database_pool_size: parsed_var("DATABASE_POOL_SIZE", 10),
            cors_origin: var("CORS_ORIGIN")
                .ok()
                .flatten()
                .unwrap_or_else(|| "http://localhost:3000".into()),
            session_ttl_days: session_ttl_days(parsed_var("SESSION_TTL_DAYS", 30)),
            on_user_delete: parsed_var("ON_USER_DELETE", OnUserDelete::Block),
            comments_require_article: parsed_var("COMMENTS_REQUIRE_ARTICLE", true),
            admin,
        }
    }

    pub fn is_production(&self) -> bool {
        self.env == Env::Production
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            env: Env::Dev,
            port: 5000,
            database_url: None,
            database_pool_size: 10,
            cors_origin: "http://localhost:3000".into(),
            session_ttl_days: 30,
            on_user_delete: OnUserDelete::Block,
            comments_require_article: true,
            admin: None,
        }
    }
}
