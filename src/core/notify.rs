//! User-facing event log.
//!
//! Append-only with per-entry read accounting. `unread_count` is always
//! counted, never stored, so it cannot drift. Retention is bounded at append
//! time: once over capacity, the oldest already-read entries are evicted
//! first, then the oldest overall.

use std::sync::RwLock;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::core::types::{Notification, NotificationKind};
use crate::persist::StateDir;

const STATE_KEY: &str = "notifications";
pub const DEFAULT_CAPACITY: usize = 200;

pub struct NotificationLog {
    entries: RwLock<Vec<Notification>>,
    capacity: usize,
    state: Option<StateDir>,
}

/// What to create; id, timestamp and read flag are assigned at append.
#[derive(Debug, Clone)]
pub struct NotificationDraft {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub category: Option<String>,
    pub action_ref: Option<String>,
}

impl NotificationDraft {
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            category: None,
            action_ref: None,
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

impl NotificationLog {
    /// In-memory only; nothing survives the process.
    pub fn ephemeral() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            capacity: DEFAULT_CAPACITY,
            state: None,
        }
    }

    /// Backed by the state directory: prior entries load at construction and
    /// every mutation re-serializes.
    pub fn persisted(state: StateDir) -> Self {
        let entries: Vec<Notification> = state.load(STATE_KEY).ok().flatten().unwrap_or_default();
        Self {
            entries: RwLock::new(entries),
            capacity: DEFAULT_CAPACITY,
            state: Some(state),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn append(&self, draft: NotificationDraft) -> Notification {
        let entry = Notification {
            id: uuid::Uuid::new_v4().to_string(),
            kind: draft.kind,
            title: draft.title,
            message: draft.message,
            created_at: now_rfc3339(),
            read: false,
            category: draft.category,
            action_ref: draft.action_ref,
        };
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.push(entry.clone());
        while entries.len() > self.capacity {
            // Oldest read entry goes first; if everything is unread, the
            // oldest entry overall goes.
            let victim = entries.iter().position(|n| n.read).unwrap_or(0);
            entries.remove(victim);
        }
        self.flush(&entries);
        entry
    }

    pub fn mark_read(&self, id: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let Some(entry) = entries.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        entry.read = true;
        self.flush(&entries);
        true
    }

    pub fn mark_all_read(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        for entry in entries.iter_mut() {
            entry.read = true;
        }
        self.flush(&entries);
    }

    pub fn remove(&self, id: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|n| n.id != id);
        let removed = entries.len() != before;
        if removed {
            self.flush(&entries);
        }
        removed
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.clear();
        self.flush(&entries);
    }

    pub fn entries(&self) -> Vec<Notification> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn unread_count(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|n| !n.read)
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn flush(&self, entries: &[Notification]) {
        if let Some(state) = &self.state {
            state.save_quiet(STATE_KEY, &entries);
        }
    }
}

pub(crate) fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| String::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str) -> NotificationDraft {
        NotificationDraft::new(NotificationKind::Info, title, "body")
    }

    #[test]
    fn unread_count_is_derived_from_entries() {
        let log = NotificationLog::ephemeral();
        let a = log.append(draft("a"));
        log.append(draft("b"));
        log.append(draft("c"));
        assert_eq!(log.unread_count(), 3);
        assert!(log.mark_read(&a.id));
        assert_eq!(log.unread_count(), 2);
        log.mark_all_read();
        assert_eq!(log.unread_count(), 0);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn mark_read_on_unknown_id_is_a_noop() {
        let log = NotificationLog::ephemeral();
        log.append(draft("a"));
        assert!(!log.mark_read("no-such-id"));
        assert_eq!(log.unread_count(), 1);
    }

    #[test]
    fn remove_and_clear() {
        let log = NotificationLog::ephemeral();
        let a = log.append(draft("a"));
        log.append(draft("b"));
        assert!(log.remove(&a.id));
        assert!(!log.remove(&a.id));
        assert_eq!(log.len(), 1);
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn capacity_evicts_oldest_read_first() {
        let log = NotificationLog::ephemeral().with_capacity(3);
        let a = log.append(draft("a"));
        let b = log.append(draft("b"));
        log.append(draft("c"));
        log.mark_read(&b.id);
        log.append(draft("d"));
        let titles: Vec<String> = log.entries().into_iter().map(|n| n.title).collect();
        // "b" was the only read entry, so it went first even though "a" is older.
        assert_eq!(titles, vec!["a", "c", "d"]);
        let _ = a;
    }

    #[test]
    fn capacity_falls_back_to_oldest_overall_when_all_unread() {
        let log = NotificationLog::ephemeral().with_capacity(2);
        log.append(draft("a"));
        log.append(draft("b"));
        log.append(draft("c"));
        let titles: Vec<String> = log.entries().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["b", "c"]);
    }

    #[test]
    fn persisted_log_survives_reconstruction() {
        let dir = tempfile::tempdir().unwrap();
        {
            let log = NotificationLog::persisted(StateDir::new(dir.path()));
            let a = log.append(draft("kept"));
            log.mark_read(&a.id);
        }
        let log = NotificationLog::persisted(StateDir::new(dir.path()));
        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "kept");
        assert!(entries[0].read);
    }

    #[test]
    fn timestamps_are_monotonic_enough_to_sort() {
        let log = NotificationLog::ephemeral();
        let a = log.append(draft("a"));
        let b = log.append(draft("b"));
        assert!(a.created_at <= b.created_at);
        assert!(a.created_at.ends_with('Z'));
    }
}
