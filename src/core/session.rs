//! Authenticated-session state.
//!
//! Two pieces: [`SessionHandle`], the shared credential cell every accessor
//! reads (and the 401 teardown clears), and [`SessionStore`], the two-state
//! machine (`Anonymous` / `Authenticated`) that owns transitions, persistence
//! and rehydration. A rehydrated session is untrusted until a `validate()`
//! round trip confirms the credential.

use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::AuthApi;
use crate::core::types::{Identity, IdentityPatch, Role};
use crate::error::ApiError;
use crate::persist::StateDir;

const STATE_KEY: &str = "session";

#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub credential: String,
    pub identity: Identity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The accessor saw a 401 on an authenticated call and tore the session
    /// down. Subscribers (the UI) decide where to navigate.
    Expired,
}

#[derive(Debug, Default)]
struct HandleInner {
    credential: Option<String>,
    identity: Option<Identity>,
}

/// Shared cell read by the HTTP layer and owned (for writes) by the session
/// flows. A session is observable only when credential and identity are both
/// present; a credential alone exists transiently while a "who am I" round
/// trip is in flight.
#[derive(Debug, Default)]
pub struct SessionHandle {
    inner: RwLock<HandleInner>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credential(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .credential
            .clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        if inner.credential.is_some() {
            inner.identity.clone()
        } else {
            None
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.identity().map(|i| i.role)
    }

    pub fn current(&self) -> Option<AuthSession> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        match (&inner.credential, &inner.identity) {
            (Some(credential), Some(identity)) => Some(AuthSession {
                credential: credential.clone(),
                identity: identity.clone(),
            }),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    pub(crate) fn set(&self, credential: String, identity: Identity) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.credential = Some(credential);
        inner.identity = Some(identity);
    }

    /// Stage a credential for validation without exposing a session.
    pub(crate) fn begin_validation(&self, credential: String) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.credential = Some(credential);
        inner.identity = None;
    }

    pub(crate) fn merge_identity(&self, patch: &IdentityPatch) -> Option<Identity> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let identity = inner.identity.as_mut()?;
        if let Some(name) = &patch.display_name {
            identity.display_name = Some(name.clone());
        }
        if let Some(name) = &patch.company_name {
            identity.company_name = Some(name.clone());
        }
        Some(identity.clone())
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.credential = None;
        inner.identity = None;
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
    credential: String,
    identity: Identity,
}

pub struct SessionStore {
    auth: Arc<dyn AuthApi>,
    handle: Arc<SessionHandle>,
    state: StateDir,
    /// True once the current credential has survived a `/me` round trip this
    /// process lifetime. Rehydrated sessions start false.
    validated: AtomicBool,
}

impl SessionStore {
    pub fn new(auth: Arc<dyn AuthApi>, handle: Arc<SessionHandle>, state: StateDir) -> Self {
        let store = Self {
            auth,
            handle,
            state,
            validated: AtomicBool::new(false),
        };
        store.rehydrate();
        store
    }

    fn rehydrate(&self) {
        let persisted: Option<PersistedSession> =
            self.state.load(STATE_KEY).ok().flatten();
        if let Some(session) = persisted {
            info!("Rehydrated session for {}", session.identity.email);
            self.handle.set(session.credential, session.identity);
        }
    }

    pub fn handle(&self) -> Arc<SessionHandle> {
        self.handle.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.handle.is_authenticated()
    }

    pub fn is_validated(&self) -> bool {
        self.validated.load(Ordering::Acquire) && self.is_authenticated()
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.handle.identity()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, ApiError> {
        let res = self.auth.login(email, password).await?;
        self.establish(res.token, res.user.clone());
        Ok(res.user)
    }

    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<Identity, ApiError> {
        let res = self.auth.signup(email, password, role).await?;
        self.establish(res.token, res.user.clone());
        Ok(res.user)
    }

    /// Adopt an externally obtained credential. Without an identity this
    /// performs the "who am I" round trip; failure leaves the state
    /// `Anonymous`.
    pub async fn adopt_credential(
        &self,
        credential: String,
        identity: Option<Identity>,
    ) -> Result<Identity, ApiError> {
        if let Some(identity) = identity {
            self.establish(credential, identity.clone());
            return Ok(identity);
        }
        self.handle.begin_validation(credential.clone());
        match self.auth.me().await {
            Ok(identity) => {
                self.establish(credential, identity.clone());
                Ok(identity)
            }
            Err(err) => {
                self.teardown();
                Err(err)
            }
        }
    }

    /// Confirm a (typically rehydrated) credential against the server. On
    /// `Unauthorized` the session degrades to `Anonymous`; any other failure
    /// leaves it in place but unvalidated.
    pub async fn validate(&self) -> Result<Identity, ApiError> {
        if self.handle.credential().is_none() {
            return Err(ApiError::Unauthorized(Some("no session".to_string())));
        }
        match self.auth.me().await {
            Ok(identity) => {
                if let Some(credential) = self.handle.credential() {
                    self.establish(credential, identity.clone());
                }
                Ok(identity)
            }
            Err(err) => {
                if err.is_unauthorized() {
                    warn!("Persisted credential rejected; degrading to anonymous");
                    self.teardown();
                }
                Err(err)
            }
        }
    }

    pub fn logout(&self) {
        self.teardown();
    }

    /// Shallow identity merge after a profile edit already persisted
    /// server-side. No network call.
    pub fn update_identity(&self, patch: &IdentityPatch) -> Option<Identity> {
        let merged = self.handle.merge_identity(patch)?;
        if let Some(credential) = self.handle.credential() {
            self.state.save_quiet(
                STATE_KEY,
                &PersistedSession {
                    credential,
                    identity: merged.clone(),
                },
            );
        }
        Some(merged)
    }

    fn establish(&self, credential: String, identity: Identity) {
        self.state.save_quiet(
            STATE_KEY,
            &PersistedSession {
                credential: credential.clone(),
                identity: identity.clone(),
            },
        );
        self.handle.set(credential, identity);
        self.validated.store(true, Ordering::Release);
    }

    fn teardown(&self) {
        self.handle.clear();
        self.validated.store(false, Ordering::Release);
        if let Err(err) = self.state.remove(STATE_KEY) {
            warn!("Failed to remove persisted session: {err:#}");
        }
    }
}
