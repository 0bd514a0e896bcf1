//! Current-user profile cache.
//!
//! Exactly one profile is cached at a time, keyed by the identity it was
//! fetched under. Any access under a different identity (or none) discards
//! the cached copy, so a profile never leaks across a login switch.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use super::OpCounter;
use crate::api::ProfileApi;
use crate::core::session::SessionHandle;
use crate::core::types::{Profile, ProfilePatch};
use crate::error::ApiError;

#[derive(Debug, Clone)]
struct CachedProfile {
    owner_id: String,
    profile: Profile,
}

pub struct ProfileStore {
    api: Arc<dyn ProfileApi>,
    session: Arc<SessionHandle>,
    cache: RwLock<Option<CachedProfile>>,
    loading: OpCounter,
    updating: OpCounter,
}

impl ProfileStore {
    pub fn new(api: Arc<dyn ProfileApi>, session: Arc<SessionHandle>) -> Self {
        Self {
            api,
            session,
            cache: RwLock::new(None),
            loading: OpCounter::default(),
            updating: OpCounter::default(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading.active()
    }

    pub fn is_updating(&self) -> bool {
        self.updating.active()
    }

    /// Cached profile for the *current* identity, if any. A cached profile
    /// belonging to a previous identity is dropped here rather than returned.
    pub async fn current(&self) -> Option<Profile> {
        let owner = self.session.identity()?.id;
        let mut cache = self.cache.write().await;
        match &*cache {
            Some(cached) if cached.owner_id == owner => Some(cached.profile.clone()),
            Some(_) => {
                debug!("Dropping cached profile from a previous identity");
                *cache = None;
                None
            }
            None => None,
        }
    }

    pub async fn fetch(&self) -> Result<Profile, ApiError> {
        let owner = self
            .session
            .identity()
            .ok_or_else(|| ApiError::Unauthorized(Some("not signed in".to_string())))?
            .id;
        let _busy = self.loading.begin();
        let profile = self.api.fetch().await?;
        *self.cache.write().await = Some(CachedProfile {
            owner_id: owner,
            profile: profile.clone(),
        });
        Ok(profile)
    }

    pub async fn update(&self, patch: &ProfilePatch) -> Result<Profile, ApiError> {
        let owner = self
            .session
            .identity()
            .ok_or_else(|| ApiError::Unauthorized(Some("not signed in".to_string())))?
            .id;
        let _busy = self.updating.begin();
        let profile = self.api.update(patch).await?;
        *self.cache.write().await = Some(CachedProfile {
            owner_id: owner,
            profile: profile.clone(),
        });
        Ok(profile)
    }

    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::core::types::{Identity, Role, WorkerProfile};

    #[derive(Default)]
    struct ScriptedProfileApi {
        fetch: Mutex<VecDeque<Result<Profile, ApiError>>>,
        update: Mutex<VecDeque<Result<Profile, ApiError>>>,
    }

    #[async_trait]
    impl ProfileApi for ScriptedProfileApi {
        async fn fetch(&self) -> Result<Profile, ApiError> {
            self.fetch.lock().unwrap().pop_front().expect("unscripted fetch")
        }
        async fn update(&self, _patch: &ProfilePatch) -> Result<Profile, ApiError> {
            self.update.lock().unwrap().pop_front().expect("unscripted update")
        }
    }

    fn worker_profile(name: &str) -> Profile {
        Profile::Worker(WorkerProfile {
            display_name: name.to_string(),
            phone: None,
            location: None,
            skills: vec![],
            bio: None,
            total_applications: 0,
            approved_applications: 0,
        })
    }

    fn sign_in(handle: &SessionHandle, id: &str) {
        handle.set(
            "tok".to_string(),
            Identity {
                id: id.to_string(),
                email: format!("{id}@example.com"),
                role: Role::Worker,
                display_name: None,
                company_name: None,
            },
        );
    }

    #[tokio::test]
    async fn fetch_caches_for_the_current_identity() {
        let api = Arc::new(ScriptedProfileApi::default());
        let handle = Arc::new(SessionHandle::new());
        sign_in(&handle, "u1");
        let store = ProfileStore::new(api.clone(), handle);

        api.fetch
            .lock()
            .unwrap()
            .push_back(Ok(worker_profile("Sam")));
        store.fetch().await.unwrap();
        assert_eq!(store.current().await, Some(worker_profile("Sam")));
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn identity_switch_invalidates_the_cache() {
        let api = Arc::new(ScriptedProfileApi::default());
        let handle = Arc::new(SessionHandle::new());
        sign_in(&handle, "u1");
        let store = ProfileStore::new(api.clone(), handle.clone());

        api.fetch
            .lock()
            .unwrap()
            .push_back(Ok(worker_profile("Sam")));
        store.fetch().await.unwrap();

        // Another identity signs in; the old profile must not surface.
        sign_in(&handle, "u2");
        assert!(store.current().await.is_none());
    }

    #[tokio::test]
    async fn logged_out_access_sees_nothing_and_fetch_fails_fast() {
        let api = Arc::new(ScriptedProfileApi::default());
        let handle = Arc::new(SessionHandle::new());
        let store = ProfileStore::new(api, handle);
        assert!(store.current().await.is_none());
        assert!(store.fetch().await.unwrap_err().is_unauthorized());
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn update_replaces_the_cached_profile() {
        let api = Arc::new(ScriptedProfileApi::default());
        let handle = Arc::new(SessionHandle::new());
        sign_in(&handle, "u1");
        let store = ProfileStore::new(api.clone(), handle);

        api.update
            .lock()
            .unwrap()
            .push_back(Ok(worker_profile("Sam R.")));
        let updated = store.update(&ProfilePatch::default()).await.unwrap();
        assert_eq!(updated, worker_profile("Sam R."));
        assert_eq!(store.current().await, Some(worker_profile("Sam R.")));
        assert!(!store.is_updating());
    }

    #[tokio::test]
    async fn failed_update_keeps_the_previous_cache() {
        let api = Arc::new(ScriptedProfileApi::default());
        let handle = Arc::new(SessionHandle::new());
        sign_in(&handle, "u1");
        let store = ProfileStore::new(api.clone(), handle);

        api.fetch
            .lock()
            .unwrap()
            .push_back(Ok(worker_profile("Sam")));
        store.fetch().await.unwrap();

        api.update
            .lock()
            .unwrap()
            .push_back(Err(ApiError::Validation(Some("phone".into()))));
        assert!(store.update(&ProfilePatch::default()).await.is_err());
        assert_eq!(store.current().await, Some(worker_profile("Sam")));
    }
}
