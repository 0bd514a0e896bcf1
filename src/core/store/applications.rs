//! Application cache: the caller's own applications (as applicant) or the
//! incoming ones to review (as listing owner), for gigs and machines.
//!
//! Review transitions are supported symmetrically for both application kinds
//! through the shared `/applications/{id}/status` endpoint.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use super::{FetchGate, OpCounter, require_role};
use crate::api::ApplicationsApi;
use crate::core::select::ApplicationFilters;
use crate::core::session::SessionHandle;
use crate::core::types::{
    ApplicationStatus, GigApplication, MachineApplication, RentalRequest, Role,
};
use crate::error::ApiError;
use crate::persist::StateDir;

const FILTERS_KEY: &str = "application-filters";

#[derive(Debug, Default)]
struct ApplicationLists {
    gigs: Vec<GigApplication>,
    machines: Vec<MachineApplication>,
    /// Identity the cached lists belong to. Both lists are role-scoped, so
    /// any access under a different identity discards them first.
    owner: Option<String>,
}

pub struct ApplicationStore {
    api: Arc<dyn ApplicationsApi>,
    session: Arc<SessionHandle>,
    state: StateDir,
    lists: RwLock<ApplicationLists>,
    filters: std::sync::RwLock<ApplicationFilters>,
    loading: OpCounter,
    creating: OpCounter,
    updating: OpCounter,
    gigs_gate: FetchGate,
    machines_gate: FetchGate,
}

impl ApplicationStore {
    pub fn new(
        api: Arc<dyn ApplicationsApi>,
        session: Arc<SessionHandle>,
        state: StateDir,
    ) -> Self {
        let filters = state.load(FILTERS_KEY).ok().flatten().unwrap_or_default();
        Self {
            api,
            session,
            state,
            lists: RwLock::new(ApplicationLists::default()),
            filters: std::sync::RwLock::new(filters),
            loading: OpCounter::default(),
            creating: OpCounter::default(),
            updating: OpCounter::default(),
            gigs_gate: FetchGate::default(),
            machines_gate: FetchGate::default(),
        }
    }

    pub async fn gig_applications(&self) -> Vec<GigApplication> {
        let mut lists = self.lists.write().await;
        self.drop_foreign(&mut lists);
        lists.gigs.clone()
    }

    pub async fn machine_applications(&self) -> Vec<MachineApplication> {
        let mut lists = self.lists.write().await;
        self.drop_foreign(&mut lists);
        lists.machines.clone()
    }

    /// Discard lists cached under an identity other than the current one.
    fn drop_foreign(&self, lists: &mut ApplicationLists) {
        let owner = self.session.identity().map(|i| i.id);
        if lists.owner.is_some() && lists.owner != owner {
            debug!("Dropping applications cached for a previous identity");
            lists.gigs.clear();
            lists.machines.clear();
            lists.owner = None;
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading.active()
    }

    pub fn is_creating(&self) -> bool {
        self.creating.active()
    }

    pub fn is_updating(&self) -> bool {
        self.updating.active()
    }

    pub fn filters(&self) -> ApplicationFilters {
        self.filters.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_filters(&self, filters: ApplicationFilters) {
        *self.filters.write().unwrap_or_else(|e| e.into_inner()) = filters.clone();
        self.state.save_quiet(FILTERS_KEY, &filters);
    }

    pub async fn fetch_gig_applications(&self) -> Result<(), ApiError> {
        let who = require_role(
            &self.session,
            &[Role::Worker, Role::Startup, Role::Manufacturer],
        )?;
        let _busy = self.loading.begin();
        let ticket = self.gigs_gate.begin();
        tokio::select! {
            _ = ticket.cancel.cancelled() => Ok(()),
            result = self.api.list_gig_applications() => {
                let apps = result?;
                let mut lists = self.lists.write().await;
                if self.gigs_gate.admit(ticket.seq) {
                    self.drop_foreign(&mut lists);
                    lists.gigs = apps;
                    lists.owner = Some(who.id);
                }
                Ok(())
            }
        }
    }

    pub async fn fetch_machine_applications(&self) -> Result<(), ApiError> {
        let who = require_role(
            &self.session,
            &[Role::Worker, Role::Startup, Role::Manufacturer],
        )?;
        let _busy = self.loading.begin();
        let ticket = self.machines_gate.begin();
        tokio::select! {
            _ = ticket.cancel.cancelled() => Ok(()),
            result = self.api.list_machine_applications() => {
                let apps = result?;
                let mut lists = self.lists.write().await;
                if self.machines_gate.admit(ticket.seq) {
                    self.drop_foreign(&mut lists);
                    lists.machines = apps;
                    lists.owner = Some(who.id);
                }
                Ok(())
            }
        }
    }

    /// Apply to a gig. Workers only. The confirmed application is prepended
    /// to the caller's list; the gig's `application_count` is left alone —
    /// counts come from the server on the next fetch, never from a local
    /// guess.
    pub async fn apply_to_gig(
        &self,
        gig_id: &str,
        message: Option<&str>,
    ) -> Result<GigApplication, ApiError> {
        let who = require_role(&self.session, &[Role::Worker])?;
        let _busy = self.creating.begin();
        let application = self.api.apply_to_gig(gig_id, message).await?;
        let mut lists = self.lists.write().await;
        self.drop_foreign(&mut lists);
        lists.gigs.insert(0, application.clone());
        lists.owner = Some(who.id);
        Ok(application)
    }

    /// Request a machine rental. Workers and startups may apply.
    pub async fn apply_to_machine(
        &self,
        machine_id: &str,
        request: &RentalRequest,
    ) -> Result<MachineApplication, ApiError> {
        let who = require_role(&self.session, &[Role::Worker, Role::Startup])?;
        let _busy = self.creating.begin();
        let application = self.api.apply_to_machine(machine_id, request).await?;
        let mut lists = self.lists.write().await;
        self.drop_foreign(&mut lists);
        lists.machines.insert(0, application.clone());
        lists.owner = Some(who.id);
        Ok(application)
    }

    /// Approve or reject a gig application. Reviewer roles only.
    pub async fn review_gig_application(
        &self,
        id: &str,
        status: ApplicationStatus,
    ) -> Result<GigApplication, ApiError> {
        require_role(&self.session, &[Role::Startup, Role::Manufacturer])?;
        let _busy = self.updating.begin();
        let confirmed = self.api.set_gig_application_status(id, status).await?;
        let mut lists = self.lists.write().await;
        self.drop_foreign(&mut lists);
        for app in lists.gigs.iter_mut() {
            if app.id == confirmed.id {
                *app = confirmed.clone();
            }
        }
        Ok(confirmed)
    }

    pub async fn review_machine_application(
        &self,
        id: &str,
        status: ApplicationStatus,
    ) -> Result<MachineApplication, ApiError> {
        require_role(&self.session, &[Role::Startup, Role::Manufacturer])?;
        let _busy = self.updating.begin();
        let confirmed = self.api.set_machine_application_status(id, status).await?;
        let mut lists = self.lists.write().await;
        self.drop_foreign(&mut lists);
        for app in lists.machines.iter_mut() {
            if app.id == confirmed.id {
                *app = confirmed.clone();
            }
        }
        Ok(confirmed)
    }

    /// Drop everything cached. Called when the active identity changes so
    /// one user's role-scoped lists never leak into another's view.
    pub async fn invalidate(&self) {
        let mut lists = self.lists.write().await;
        lists.gigs.clear();
        lists.machines.clear();
        lists.owner = None;
    }
}
