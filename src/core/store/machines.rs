//! Machine cache: the rental catalog plus the manufacturer's own fleet.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use super::{FetchGate, OpCounter, require_role};
use crate::api::MachinesApi;
use crate::core::select::MachineFilters;
use crate::core::session::SessionHandle;
use crate::core::types::{Machine, MachineDraft, Role};
use crate::error::ApiError;
use crate::persist::StateDir;

const FILTERS_KEY: &str = "machine-filters";

#[derive(Debug, Default)]
struct MachineLists {
    items: Vec<Machine>,
    mine: Vec<Machine>,
    /// Identity that fetched `mine`. Role-scoped data must not survive an
    /// identity switch; reads drop the list when the owner no longer matches.
    mine_owner: Option<String>,
}

pub struct MachineStore {
    api: Arc<dyn MachinesApi>,
    session: Arc<SessionHandle>,
    state: StateDir,
    lists: RwLock<MachineLists>,
    filters: std::sync::RwLock<MachineFilters>,
    loading: OpCounter,
    creating: OpCounter,
    updating: OpCounter,
    deleting: OpCounter,
    items_gate: FetchGate,
    mine_gate: FetchGate,
}

impl MachineStore {
    pub fn new(api: Arc<dyn MachinesApi>, session: Arc<SessionHandle>, state: StateDir) -> Self {
        let filters = state.load(FILTERS_KEY).ok().flatten().unwrap_or_default();
        Self {
            api,
            session,
            state,
            lists: RwLock::new(MachineLists::default()),
            filters: std::sync::RwLock::new(filters),
            loading: OpCounter::default(),
            creating: OpCounter::default(),
            updating: OpCounter::default(),
            deleting: OpCounter::default(),
            items_gate: FetchGate::default(),
            mine_gate: FetchGate::default(),
        }
    }

    pub async fn items(&self) -> Vec<Machine> {
        self.lists.read().await.items.clone()
    }

    pub async fn mine(&self) -> Vec<Machine> {
        let owner = self.session.identity().map(|i| i.id);
        let mut lists = self.lists.write().await;
        if lists.mine_owner.is_some() && lists.mine_owner != owner {
            debug!("Dropping machines listed under a previous identity");
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

    pub fn filters(&self) -> MachineFilters {
        self.filters.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_filters(&self, filters: MachineFilters) {
        *self.filters.write().unwrap_or_else(|e| e.into_inner()) = filters.clone();
        self.state.save_quiet(FILTERS_KEY, &filters);
    }

    pub async fn fetch_all(&self, search: Option<&str>) -> Result<(), ApiError> {
        let _busy = self.loading.begin();
        let ticket = self.items_gate.begin();
        tokio::select! {
            _ = ticket.cancel.cancelled() => {
                debug!("machines.fetch_all superseded before completion");
                Ok(())
            }
            result = self.api.list(search) => {
                let items = result?;
                let mut lists = self.lists.write().await;
                if self.items_gate.admit(ticket.seq) {
                    lists.items = items;
                }
                Ok(())
            }
        }
    }

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

    /// List a machine. Manufacturer only; the confirmed entity lands at the
    /// front of both cached lists.
    pub async fn create(&self, draft: MachineDraft) -> Result<Machine, ApiError> {
        let who = require_role(&self.session, &[Role::Manufacturer])?;
        let _busy = self.creating.begin();
        let machine = self.api.create(&draft).await?;
        let mut lists = self.lists.write().await;
        if lists.mine_owner.as_ref() != Some(&who.id) {
            lists.mine.clear();
        }
        lists.mine_owner = Some(who.id);
        lists.items.insert(0, machine.clone());
        lists.mine.insert(0, machine.clone());
        Ok(machine)
    }

    pub async fn remove(&self, id: &str) -> Result<(), ApiError> {
        require_role(&self.session, &[Role::Manufacturer])?;
        let _busy = self.deleting.begin();
        self.api.delete(id).await?;
        let mut lists = self.lists.write().await;
        lists.items.retain(|m| m.id != id);
        lists.mine.retain(|m| m.id != id);
        Ok(())
    }

    /// Availability is never guessed locally: the server-confirmed entity is
    /// merged into every cached copy. The `isAvailable` wire alias is derived
    /// from the same field, so the two cannot disagree.
    pub async fn set_availability(&self, id: &str, available: bool) -> Result<Machine, ApiError> {
        require_role(&self.session, &[Role::Manufacturer])?;
        let _busy = self.updating.begin();
        let confirmed = self.api.set_availability(id, available).await?;
        let mut lists = self.lists.write().await;
        let MachineLists { items, mine, .. } = &mut *lists;
        for machine in items.iter_mut().chain(mine.iter_mut()) {
            if machine.id == confirmed.id {
                *machine = confirmed.clone();
            }
        }
        Ok(confirmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::core::types::Identity;

    type Scripted<T> = Mutex<VecDeque<Result<T, ApiError>>>;

    #[derive(Default)]
    struct ScriptedMachinesApi {
        list: Scripted<Vec<Machine>>,
        list_mine: Scripted<Vec<Machine>>,
        create: Scripted<Machine>,
        delete: Scripted<()>,
        set_availability: Scripted<Machine>,
    }

    impl ScriptedMachinesApi {
        fn push<T>(queue: &Scripted<T>, result: Result<T, ApiError>) {
            queue.lock().unwrap().push_back(result);
        }

        fn take<T>(queue: &Scripted<T>, what: &str) -> Result<T, ApiError> {
            queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("unscripted {what} call"))
        }
    }

    #[async_trait]
    impl MachinesApi for ScriptedMachinesApi {
        async fn list(&self, _search: Option<&str>) -> Result<Vec<Machine>, ApiError> {
            Self::take(&self.list, "list")
        }
        async fn list_mine(&self) -> Result<Vec<Machine>, ApiError> {
            Self::take(&self.list_mine, "list_mine")
        }
        async fn create(&self, _draft: &MachineDraft) -> Result<Machine, ApiError> {
            Self::take(&self.create, "create")
        }
        async fn delete(&self, _id: &str) -> Result<(), ApiError> {
            Self::take(&self.delete, "delete")
        }
        async fn set_availability(&self, _id: &str, _a: bool) -> Result<Machine, ApiError> {
            Self::take(&self.set_availability, "set_availability")
        }
    }

    fn machine(id: &str, available: bool) -> Machine {
        Machine {
            id: id.to_string(),
            name: format!("machine {id}"),
            machine_type: "cnc".to_string(),
            description: String::new(),
            manufacturer: "u1".to_string(),
            location: "Austin".to_string(),
            specifications: Default::default(),
            price_per_hour: Some(40.0),
            availability: available,
            has_applied: None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    fn draft() -> MachineDraft {
        MachineDraft {
            name: "Mill".to_string(),
            machine_type: "cnc".to_string(),
            description: String::new(),
            location: "Austin".to_string(),
            specifications: Default::default(),
            price_per_hour: Some(40.0),
            availability: true,
        }
    }

    fn session_as(role: Role) -> Arc<SessionHandle> {
        let handle = Arc::new(SessionHandle::new());
        handle.set(
            "tok".to_string(),
            Identity {
                id: "u1".to_string(),
                email: "u1@example.com".to_string(),
                role,
                display_name: None,
                company_name: None,
            },
        );
        handle
    }

    struct Fixture {
        api: Arc<ScriptedMachinesApi>,
        store: MachineStore,
        _dir: tempfile::TempDir,
    }

    fn fixture(role: Role) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(ScriptedMachinesApi::default());
        let store = MachineStore::new(api.clone(), session_as(role), StateDir::new(dir.path()));
        Fixture {
            api,
            store,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn availability_update_merges_confirmed_entity_everywhere() {
        let f = fixture(Role::Manufacturer);
        ScriptedMachinesApi::push(&f.api.list, Ok(vec![machine("m1", true), machine("m2", true)]));
        ScriptedMachinesApi::push(&f.api.list_mine, Ok(vec![machine("m1", true)]));
        f.store.fetch_all(None).await.unwrap();
        f.store.fetch_mine().await.unwrap();

        ScriptedMachinesApi::push(&f.api.set_availability, Ok(machine("m1", false)));
        let confirmed = f.store.set_availability("m1", false).await.unwrap();
        assert!(!confirmed.availability);
        assert_eq!(confirmed.is_available(), confirmed.availability);

        for list in [f.store.items().await, f.store.mine().await] {
            let m1 = list.iter().find(|m| m.id == "m1").unwrap();
            assert!(!m1.availability);
            assert_eq!(m1.is_available(), m1.availability);
        }
        // Untouched machine keeps its state.
        assert!(f.store.items().await.iter().find(|m| m.id == "m2").unwrap().availability);
    }

    #[tokio::test]
    async fn failed_availability_update_leaves_cache_alone() {
        let f = fixture(Role::Manufacturer);
        ScriptedMachinesApi::push(&f.api.list, Ok(vec![machine("m1", true)]));
        f.store.fetch_all(None).await.unwrap();
        let before = f.store.items().await;

        ScriptedMachinesApi::push(&f.api.set_availability, Err(ApiError::NotFound(None)));
        assert!(f.store.set_availability("m1", false).await.is_err());
        assert_eq!(f.store.items().await, before);
        assert!(!f.store.is_updating());
    }

    #[tokio::test]
    async fn create_and_remove_are_manufacturer_only() {
        let f = fixture(Role::Worker);
        assert!(matches!(
            f.store.create(draft()).await.unwrap_err(),
            ApiError::Forbidden(_)
        ));
        assert!(matches!(
            f.store.remove("m1").await.unwrap_err(),
            ApiError::Forbidden(_)
        ));
    }

    #[tokio::test]
    async fn create_prepends_and_remove_clears_both_lists() {
        let f = fixture(Role::Manufacturer);
        ScriptedMachinesApi::push(&f.api.list, Ok(vec![machine("m1", true)]));
        ScriptedMachinesApi::push(&f.api.list_mine, Ok(vec![machine("m1", true)]));
        f.store.fetch_all(None).await.unwrap();
        f.store.fetch_mine().await.unwrap();

        ScriptedMachinesApi::push(&f.api.create, Ok(machine("m9", true)));
        f.store.create(draft()).await.unwrap();
        assert_eq!(f.store.items().await[0].id, "m9");
        assert_eq!(f.store.mine().await[0].id, "m9");

        ScriptedMachinesApi::push(&f.api.delete, Ok(()));
        f.store.remove("m1").await.unwrap();
        assert!(f.store.items().await.iter().all(|m| m.id != "m1"));
        assert!(f.store.mine().await.iter().all(|m| m.id != "m1"));
    }

    #[tokio::test]
    async fn fleet_list_is_dropped_when_the_identity_changes() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(ScriptedMachinesApi::default());
        let handle = session_as(Role::Manufacturer);
        let store = MachineStore::new(api.clone(), handle.clone(), StateDir::new(dir.path()));

        ScriptedMachinesApi::push(&api.list, Ok(vec![machine("m1", true)]));
        ScriptedMachinesApi::push(&api.list_mine, Ok(vec![machine("m1", true)]));
        store.fetch_all(None).await.unwrap();
        store.fetch_mine().await.unwrap();
        assert_eq!(store.mine().await.len(), 1);

        // Another account signs in on the same handle.
        handle.set(
            "tok-2".to_string(),
            Identity {
                id: "u2".to_string(),
                email: "u2@example.com".to_string(),
                role: Role::Manufacturer,
                display_name: None,
                company_name: None,
            },
        );
        assert!(store.mine().await.is_empty());
        // The public catalog is not role-scoped and stays.
        assert_eq!(store.items().await.len(), 1);
    }

    #[tokio::test]
    async fn fetch_failure_resets_loading_flag() {
        let f = fixture(Role::Worker);
        ScriptedMachinesApi::push(&f.api.list, Err(ApiError::Network("down".into())));
        assert!(f.store.fetch_all(None).await.is_err());
        assert!(!f.store.is_loading());
    }
}
