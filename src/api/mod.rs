//! Remote accessor boundary.
//!
//! One `ApiClient` wraps the reqwest client, attaches the bearer credential,
//! classifies failures into [`ApiError`] and owns the two process-wide side
//! effects of the HTTP layer: tearing the session down on 401 and surfacing
//! every failure exactly once as a notification-log entry. Per-domain traits
//! (`AuthApi`, `GigsApi`, ...) sit on top so stores can be tested against
//! scripted accessors.

mod applications;
mod auth;
mod gigs;
mod machines;
mod profile;

pub use applications::{ApplicationsApi, HttpApplicationsApi};
pub use auth::{AuthApi, HttpAuthApi, LoginResponse};
pub use gigs::{GigsApi, HttpGigsApi};
pub use machines::{HttpMachinesApi, MachinesApi};
pub use profile::{HttpProfileApi, ProfileApi};

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::core::notify::{NotificationDraft, NotificationLog};
use crate::core::session::{SessionEvent, SessionHandle};
use crate::core::types::NotificationKind;
use crate::error::ApiError;

pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    session: Arc<SessionHandle>,
    notifications: Arc<NotificationLog>,
    events: broadcast::Sender<SessionEvent>,
}

impl ApiClient {
    pub fn new(
        config: &ClientConfig,
        session: Arc<SessionHandle>,
        notifications: Arc<NotificationLog>,
    ) -> Result<Self> {
        let mut base = Url::parse(&config.base_url)
            .with_context(|| format!("invalid base URL {}", config.base_url))?;
        // Url::join drops the last path segment unless the base ends in '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("building HTTP client")?;
        let (events, _) = broadcast::channel(16);
        Ok(Self {
            http,
            base,
            session,
            notifications,
            events,
        })
    }

    /// Session-expiry events (401 teardown). The UI subscribes to redirect to
    /// login; this layer never navigates.
    pub fn session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn session(&self) -> Arc<SessionHandle> {
        self.session.clone()
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url = self
            .base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::Unknown(Some(format!("bad endpoint {path}: {e}"))))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Issue one request and return the parsed JSON body (Null for empty
    /// bodies). All classification, teardown and failure reporting funnels
    /// through here.
    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
        op: &str,
    ) -> Result<Value, ApiError> {
        let result = self.request_inner(method, path, query, body).await;
        if let Err(err) = &result {
            self.report_failure(op, err);
        }
        result
    }

    async fn request_inner(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let url = self.endpoint(path, query)?;
        let mut req = self.http.request(method.clone(), url);
        let had_session = match self.session.credential() {
            Some(token) => {
                req = req.bearer_auth(token);
                true
            }
            None => false,
        };
        if let Some(body) = &body {
            req = req.json(body);
        }

        let res = req.send().await?;
        let status = res.status();
        let raw = res.text().await.unwrap_or_default();

        if status.is_success() {
            debug!("{method} {path} -> {status}");
            if raw.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&raw)
                .map_err(|e| ApiError::Unknown(Some(format!("malformed response body: {e}"))));
        }

        let message = extract_message(&raw);
        let err = ApiError::classify(status, message);
        if status == StatusCode::UNAUTHORIZED && had_session {
            self.expire_session();
        }
        Err(err)
    }

    /// Process-wide teardown: clear the shared credential cell and notify
    /// subscribers. Not scoped to whichever store issued the call.
    fn expire_session(&self) {
        warn!("Received 401 with an active session; tearing the session down");
        self.session.clear();
        let _ = self.events.send(SessionEvent::Expired);
    }

    /// Exactly one user-facing entry per failed call. Stores must not add
    /// their own on top of this.
    fn report_failure(&self, op: &str, err: &ApiError) {
        let kind = match err {
            ApiError::Validation(_) => NotificationKind::Warning,
            _ => NotificationKind::Error,
        };
        self.notifications.append(
            NotificationDraft::new(kind, format!("{op} failed"), err.to_string())
                .category("api"),
        );
    }

    // ── Typed helpers used by the per-domain accessors ──

    pub(crate) async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        op: &str,
    ) -> Result<Vec<T>, ApiError> {
        let value = self.request(Method::GET, path, query, None, op).await?;
        Ok(self.coerce_list(path, value))
    }

    /// Single ingestion point for list responses: a bare array passes
    /// through, anything else (null, absent, object) degrades to empty with
    /// a warning, so store state is always an array by construction.
    fn coerce_list<T: DeserializeOwned>(&self, path: &str, value: Value) -> Vec<T> {
        let items = match value {
            Value::Array(items) => items,
            Value::Null => {
                warn!("{path} returned no list; treating as empty");
                return Vec::new();
            }
            other => {
                warn!(
                    "{path} returned a non-list ({}); treating as empty",
                    json_type(&other)
                );
                return Vec::new();
            }
        };
        items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(parsed) => Some(parsed),
                Err(err) => {
                    warn!("{path} item failed to parse, skipping: {err}");
                    None
                }
            })
            .collect()
    }

    pub(crate) async fn get_one<T: DeserializeOwned>(
        &self,
        path: &str,
        op: &str,
    ) -> Result<T, ApiError> {
        let value = self.request(Method::GET, path, &[], None, op).await?;
        decode(path, value)
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
        op: &str,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)
            .map_err(|e| ApiError::Unknown(Some(format!("unserializable payload: {e}"))))?;
        let value = self
            .request(Method::POST, path, &[], Some(body), op)
            .await?;
        decode(path, value)
    }

    pub(crate) async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
        op: &str,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)
            .map_err(|e| ApiError::Unknown(Some(format!("unserializable payload: {e}"))))?;
        let value = self
            .request(Method::PATCH, path, &[], Some(body), op)
            .await?;
        decode(path, value)
    }

    pub(crate) async fn delete(&self, path: &str, op: &str) -> Result<(), ApiError> {
        self.request(Method::DELETE, path, &[], None, op).await?;
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(path: &str, value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value)
        .map_err(|e| ApiError::Unknown(Some(format!("unexpected shape from {path}: {e}"))))
}

/// Error bodies are either `{"message": "..."}` or free text.
fn extract_message(raw: &str) -> Option<String> {
    if raw.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        Ok(Value::String(s)) => Some(s),
        _ => Some(raw.trim().to_string()),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
