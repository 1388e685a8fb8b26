use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
};
use dotenv::dotenv;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    config::ServerConfig,
    store::{Store, memory::MemoryStore, postgres::PgStore},
};

mod admin;
mod authz;
mod config;
mod error;
mod identity;
mod json;
mod news;
mod schema;
mod store;
#[cfg(test)]
mod test_utils;
mod utils;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Clone)]
pub struct App {
    store: Arc<dyn Store>,
    config: Arc<ServerConfig>,
}

pub fn router(app: App) -> Router {
    let api = Router::<App>::new()
        .nest("/users", identity::routes::route())
        .nest("/articles", news::routes::articles())
        .nest("/categories", news::routes::categories())
        .nest("/comments", news::routes::comments())
        .nest("/admin", admin::routes::route());

    Router::new().nest("/api", api).with_state(app)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("newsroom=debug,tower_http=info"));

    let registry = tracing_subscriber::registry().with(filter);

    // config is not loaded yet, the subscriber has to exist before it logs
    if std::env::var("ENVIRONMENT").as_deref() == Ok("production") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn cors(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    match config.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            tracing::warn!(
                "Invalid `CORS_ORIGIN` `{}`, cross-origin requests are disabled: {e}",
                config.cors_origin
            );
            layer
        }
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_tracing();

    let config = ServerConfig::new_from_env();

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => match PgStore::new(url, config.database_pool_size) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::error!("Could not create the database pool: {e}");
                std::process::exit(1)
            }
        },
        None => {
            tracing::warn!(
                "`DATABASE_URL` is not set, using an in-memory store. Nothing will be persisted."
            );
            Arc::new(MemoryStore::new())
        }
    };

    if let Some(seed) = &config.admin {
        if let Err(e) = admin::service::seed_admin(store.as_ref(), seed).await {
            tracing::error!("Could not seed the admin identity: {e}");
            std::process::exit(1)
        }
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let cors = cors(&config);

    let app = router(App {
        store,
        config: Arc::new(config),
    })
    .layer(cors)
    .layer(TraceLayer::new_for_http());

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Could not bind to {addr}: {e}");
            std::process::exit(1)
        }
    };

    tracing::info!("Listening on {addr}");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await
    {
        tracing::error!("Server error: {e}");
    }
}
