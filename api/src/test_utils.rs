use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use crate::{
    App,
    config::ServerConfig,
    identity::models::{
        identity::{Identity, Role},
        session::Session,
    },
    router,
    store::{Store, memory::MemoryStore},
};

/// The full router over an in-memory store.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let router = router(App {
            store: store.clone(),
            config: Arc::new(config),
        });

        TestApp { store, router }
    }

    /// Seeds an identity with a live session, returning the session token.
    pub async fn identity(&self, name: &str, role: Role) -> (Identity, String) {
        let identity = self
            .store
            .insert_identity(Identity::new_with_role(
                name.into(),
                format!("{}@example.com", name.to_lowercase()),
                String::new(),
                role,
            ))
            .await
            .unwrap();

        let session = self
            .store
            .insert_session(Session::new_with_identity_id(identity.id, 1))
            .await
            .unwrap();

        (identity, session.token)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        (status, json)
    }
}
