//! Shared helpers for driving the router in-process.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderValue, Method, Request, StatusCode},
    Router,
};
use campus_api::{
    config::Config,
    web::{build_router, AppState},
};
use campus_core::{Caller, DatabaseService, InMemoryDatabase, NewUser, Role};
use chrono::{Duration, Utc};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub struct TestApp {
    pub app: Router,
    pub db: Arc<InMemoryDatabase>,
}

pub fn test_config() -> Arc<Config> {
    Arc::new(Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        db_max_connections: 1,
        log_level: tracing::Level::INFO,
        cors_origin: HeaderValue::from_static("http://localhost:5173"),
        session_ttl: Duration::hours(24),
    })
}

impl TestApp {
    pub fn new() -> Self {
        let db = Arc::new(InMemoryDatabase::new());
        let state = Arc::new(AppState::new(db.clone(), test_config()));
        Self {
            app: build_router(state),
            db,
        }
    }

    /// Creates an account and a live token for it without going through the
    /// password endpoints.
    pub async fn signed_in(&self, name: &str, role: Role) -> (Caller, String) {
        let student_id = match role {
            Role::Student => Some(format!("{:09}", Uuid::new_v4().as_u128() % 1_000_000_000)),
            Role::Admin => None,
        };
        let user = self
            .db
            .create_user(NewUser {
                name: name.to_string(),
                email: format!("{}@campus.test", name.to_lowercase()),
                student_id,
                hashed_password: "unused".to_string(),
                role,
            })
            .await
            .unwrap();
        let token = Uuid::new_v4().to_string();
        self.db
            .create_auth_session(&token, user.id, Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        (Caller { user_id: user.id, role }, token)
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}
