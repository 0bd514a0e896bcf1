//! Entity stores: the authoritative client-side caches.
//!
//! Each store is a constructed service object (share it via `Arc`, inject it
//! wherever the UI needs it — never a global) owning one domain's lists, its
//! transient operation flags and its persisted filter preferences. Stores are
//! the sole mutators of their caches; selectors and the UI only read.
//!
//! Mutation discipline, uniform across stores:
//! - a transient flag is raised for the duration of every action and dropped
//!   on settle, success or failure, via an RAII guard;
//! - the cache changes only after the accessor confirms (the one exception,
//!   the optimistic gig-status toggle, records the prior value and rolls
//!   back);
//! - fetches are guarded against response reordering: each carries a
//!   monotonic sequence number, a newer issue cancels the older in-flight
//!   request, and a response older than the last applied one is discarded
//!   (admission is checked under the list lock, in the same critical section
//!   as the write);
//! - role-scoped lists remember which identity fetched them; any access
//!   under a different identity (or none) drops them first, so one user's
//!   data never surfaces under another's session.

mod applications;
mod gigs;
mod machines;
mod profile;

pub use applications::ApplicationStore;
pub use gigs::GigStore;
pub use machines::MachineStore;
pub use profile::ProfileStore;

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio_util::sync::CancellationToken;

use crate::core::session::SessionHandle;
use crate::core::types::{Identity, Role};
use crate::error::ApiError;

/// Counts in-flight operations of one kind; "is the store busy" reads as
/// count > 0, so overlapping operations cannot clear each other's flag.
#[derive(Debug, Default)]
pub(crate) struct OpCounter(AtomicUsize);

impl OpCounter {
    pub fn begin(&self) -> OpGuard<'_> {
        self.0.fetch_add(1, Ordering::AcqRel);
        OpGuard(&self.0)
    }

    pub fn active(&self) -> bool {
        self.0.load(Ordering::Acquire) > 0
    }
}

pub(crate) struct OpGuard<'a>(&'a AtomicUsize);

impl Drop for OpGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Stale-response guard for one fetched list. `begin` hands out a sequence
/// number and cancels the previous in-flight fetch; `admit` accepts a
/// response only if nothing newer has been applied yet.
#[derive(Debug)]
pub(crate) struct FetchGate {
    issued: AtomicU64,
    applied: AtomicU64,
    cancel: Mutex<CancellationToken>,
}

pub(crate) struct FetchTicket {
    pub seq: u64,
    pub cancel: CancellationToken,
}

impl Default for FetchGate {
    fn default() -> Self {
        Self {
            issued: AtomicU64::new(0),
            applied: AtomicU64::new(0),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }
}

impl FetchGate {
    pub fn begin(&self) -> FetchTicket {
        let seq = self.issued.fetch_add(1, Ordering::AcqRel) + 1;
        let token = CancellationToken::new();
        let previous = {
            let mut slot = self.cancel.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::replace(&mut *slot, token.clone())
        };
        previous.cancel();
        FetchTicket { seq, cancel: token }
    }

    pub fn admit(&self, seq: u64) -> bool {
        let mut current = self.applied.load(Ordering::Acquire);
        loop {
            if seq <= current {
                return false;
            }
            match self.applied.compare_exchange_weak(
                current,
                seq,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }
}

/// Action-layer role gate. Checked before any network call; the server
/// enforces it again, this just fails fast with the right classification.
pub(crate) fn require_role(
    session: &SessionHandle,
    allowed: &[Role],
) -> Result<Identity, ApiError> {
    let identity = session
        .identity()
        .ok_or_else(|| ApiError::Unauthorized(Some("not signed in".to_string())))?;
    if allowed.contains(&identity.role) {
        Ok(identity)
    } else {
        Err(ApiError::Forbidden(Some(format!(
            "role {:?} may not perform this action",
            identity.role
        ))))
    }
}
