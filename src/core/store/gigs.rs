//! Gig cache: the public board plus the poster's own listings.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use super::{FetchGate, OpCounter, require_role};
use crate::api::GigsApi;
use crate::core::select::GigFilters;
use crate::core::session::SessionHandle;
use crate::core::types::{Gig, GigDraft, GigStatus, Role};
use crate::error::ApiError;
use crate::persist::StateDir;

const FILTERS_KEY: &str = "gig-filters";

#[derive(Debug, Default)]
struct GigLists {
    items: Vec<Gig>,
    mine: Vec<Gig>,
    /// Identity that fetched `mine`. Role-scoped data must not survive an
    /// identity switch; reads drop the list when the owner no longer matches.
    mine_owner: Option<String>,
}

pub struct GigStore {
    api: Arc<dyn GigsApi>,
    session: Arc<SessionHandle>,
    state: StateDir,
    lists: RwLock<GigLists>,
    filters: std::sync::RwLock<GigFilters>,
    loading: OpCounter,
    creating: OpCounter,
    updating: OpCounter,
    deleting: OpCounter,
    items_gate: FetchGate,
    mine_gate: FetchGate,
}

impl GigStore {
    pub fn new(api: Arc<dyn GigsApi>, session: Arc<SessionHandle>, state: StateDir) -> Self {
        let filters = state.load(FILTERS_KEY).ok().flatten().unwrap_or_default();
        Self {
            api,
            session,
            state,
            lists: RwLock::new(GigLists::default()),
            filters: std::sync::RwLock::new(filters),
            loading: OpCounter::default(),
            creating: OpCounter::default(),
            updating: OpCounter::default(),
            deleting: OpCounter::default(),
            items_gate: FetchGate::default(),
            mine_gate: FetchGate::default(),
        }
    }

    // ── Reads ──

    pub async fn items(&self) -> Vec<Gig> {
        self.lists.read().await.items.clone()
    }

    pub async fn mine(&self) -> Vec<Gig> {
        let owner = self.session.identity().map(|i| i.id);
        let mut lists = self.lists.write().await;
        if lists.mine_owner.is_some() && lists.mine_owner != owner {
            debug!("Dropping gigs posted under a previous identity");
            lists.mine.clear();
            lists.mine_owner = None;
        }
        lists.mine.clone()
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

    pub fn is_deleting(&self) -> bool {
        self.deleting.active()
    }

    pub fn filters(&self) -> GigFilters {
        self.filters.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_filters(&self, filters: GigFilters) {
        *self.filters.write().unwrap_or_else(|e| e.into_inner()) = filters.clone();
        self.state.save_quiet(FILTERS_KEY, &filters);
    }

    // ── Actions ──

    /// Replace the public board wholesale. Superseded fetches are cancelled
    /// and late responses discarded, so the cache always reflects the newest
    /// issued request that completed.
    pub async fn fetch_all(&self, search: Option<&str>) -> Result<(), ApiError> {
        let _busy = self.loading.begin();
        let ticket = self.items_gate.begin();
        tokio::select! {
            _ = ticket.cancel.cancelled() => {
                debug!("gigs.fetch_all superseded before completion");
                Ok(())
            }
            result = self.api.list(search) => {
                let items = result?;
                // Admission happens while holding the list lock, so a late
                // response cannot slip in between a newer fetch's admit and
                // its write.
                let mut lists = self.lists.write().await;
                if self.items_gate.admit(ticket.seq) {
                    lists.items = items;
                }
                Ok(())
            }
        }
    }

    /// Gigs posted by the current identity, scoped server-side.
    pub async fn fetch_mine(&self) -> Result<(), ApiError> {
        let owner = self.session.identity().map(|i| i.id);
        let _busy = self.loading.begin();
        let ticket = self.mine_gate.begin();
        tokio::select! {
            _ = ticket.cancel.cancelled() => Ok(()),
            result = self.api.list_mine() => {
                let mine = result?;
                let mut lists = self.lists.write().await;
                if self.mine_gate.admit(ticket.seq) {
                    lists.mine = mine;
                    lists.mine_owner = owner;
                }
                Ok(())
            }
        }
    }

    /// Post a gig. The server assigns the id; the confirmed entity is
    /// prepended to both cached lists. On failure the cache is untouched.
    pub async fn create(&self, draft: GigDraft) -> Result<Gig, ApiError> {
        let who = require_role(&self.session, &[Role::Startup, Role::Manufacturer])?;
        let _busy = self.creating.begin();
        let gig = self.api.create(&draft).await?;
        let mut lists = self.lists.write().await;
        if lists.mine_owner.as_ref() != Some(&who.id) {
            lists.mine.clear();
        }
        lists.mine_owner = Some(who.id);
        lists.items.insert(0, gig.clone());
        lists.mine.insert(0, gig.clone());
        Ok(gig)
    }

    /// Delete a gig everywhere it is cached. Consistency across lists is the
    /// point: a gig must not survive in `mine` after vanishing from `items`.
    pub async fn remove(&self, id: &str) -> Result<(), ApiError> {
        require_role(&self.session, &[Role::Startup, Role::Manufacturer])?;
        let _busy = self.deleting.begin();
        self.api.delete(id).await?;
        let mut lists = self.lists.write().await;
        lists.items.retain(|g| g.id != id);
        lists.mine.retain(|g| g.id != id);
        Ok(())
    }

    /// Toggle active/closed. This is the one optimistic mutation in the
    /// store: the new status is applied locally first and rolled back if the
    /// server rejects it.
    pub async fn set_status(&self, id: &str, status: GigStatus) -> Result<Gig, ApiError> {
        require_role(&self.session, &[Role::Startup, Role::Manufacturer])?;
        let _busy = self.updating.begin();

        let prior = {
            let mut lists = self.lists.write().await;
            let prior = lists
                .items
                .iter()
                .chain(lists.mine.iter())
                .find(|g| g.id == id)
                .map(|g| g.status);
            set_status_in(&mut lists, id, status);
            prior
        };

        match self.api.set_status(id, status).await {
            Ok(confirmed) => {
                let mut lists = self.lists.write().await;
                replace_in(&mut lists.items, &confirmed);
                replace_in(&mut lists.mine, &confirmed);
                Ok(confirmed)
            }
            Err(err) => {
                if let Some(prior) = prior {
                    let mut lists = self.lists.write().await;
                    set_status_in(&mut lists, id, prior);
                }
                Err(err)
            }
        }
    }
}

fn set_status_in(lists: &mut GigLists, id: &str, status: GigStatus) {
    for gig in lists.items.iter_mut().chain(lists.mine.iter_mut()) {
        if gig.id == id {
            gig.status = status;
        }
    }
}

fn replace_in(list: &mut [Gig], confirmed: &Gig) {
    for gig in list.iter_mut() {
        if gig.id == confirmed.id {
            *gig = confirmed.clone();
        }
    }
}
