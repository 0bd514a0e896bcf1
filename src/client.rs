//! Top-level wiring: one constructed object graph per client.
//!
//! Nothing here is a global. Tests and embedding UIs build as many isolated
//! instances as they like, each with its own state directory, session cell
//! and caches.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast;

use crate::api::{
    ApiClient, HttpApplicationsApi, HttpAuthApi, HttpGigsApi, HttpMachinesApi, HttpProfileApi,
};
use crate::config::ClientConfig;
use crate::core::notify::NotificationLog;
use crate::core::session::{SessionEvent, SessionHandle, SessionStore};
use crate::core::store::{ApplicationStore, GigStore, MachineStore, ProfileStore};
use crate::persist::StateDir;

pub struct MakerLink {
    api: Arc<ApiClient>,
    pub session: Arc<SessionStore>,
    pub gigs: Arc<GigStore>,
    pub machines: Arc<MachineStore>,
    pub applications: Arc<ApplicationStore>,
    pub profile: Arc<ProfileStore>,
    pub notifications: Arc<NotificationLog>,
}

impl MakerLink {
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let state = match &config.state_dir {
            Some(dir) => StateDir::new(dir),
            None => StateDir::default_location(),
        };
        let notifications = Arc::new(NotificationLog::persisted(state.clone()));
        let handle = Arc::new(SessionHandle::new());
        let api = Arc::new(ApiClient::new(config, handle.clone(), notifications.clone())?);

        let session = Arc::new(SessionStore::new(
            Arc::new(HttpAuthApi::new(api.clone())),
            handle.clone(),
            state.clone(),
        ));
        let gigs = Arc::new(GigStore::new(
            Arc::new(HttpGigsApi::new(api.clone())),
            handle.clone(),
            state.clone(),
        ));
        let machines = Arc::new(MachineStore::new(
            Arc::new(HttpMachinesApi::new(api.clone())),
            handle.clone(),
            state.clone(),
        ));
        let applications = Arc::new(ApplicationStore::new(
            Arc::new(HttpApplicationsApi::new(api.clone())),
            handle.clone(),
            state,
        ));
        let profile = Arc::new(ProfileStore::new(
            Arc::new(HttpProfileApi::new(api.clone())),
            handle,
        ));

        Ok(Self {
            api,
            session,
            gigs,
            machines,
            applications,
            profile,
            notifications,
        })
    }

    /// Session-expiry events from the HTTP layer (401 teardown). The UI
    /// subscribes to route back to login.
    pub fn session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.api.session_events()
    }
}
