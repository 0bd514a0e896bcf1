//! Derived view selectors: pure projections over store state.
//!
//! Every function here is a pure value mapping — no store access, no hidden
//! state, inputs never mutated — so identical inputs always produce
//! structurally equal outputs. Filtering is a conjunction of whichever
//! predicates the filter record carries; sorting is a single-key stable sort
//! (ties keep input order). Aggregations deliberately take the *unfiltered*
//! authoritative list: dashboard counts must not shrink because a text filter
//! is active on the displayed view.

use serde::{Deserialize, Serialize};

use crate::core::types::{
    ApplicationStatus, Gig, GigApplication, GigStatus, Machine, MachineApplication,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn apply(self, ord: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

// ── Gigs ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GigSortKey {
    CreatedAt,
    Title,
    Company,
    Location,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GigFilters {
    pub search: Option<String>,
    pub status: Option<GigStatus>,
    pub job_type: Option<String>,
    pub sort: Option<GigSortKey>,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GigStatusCounts {
    pub active: usize,
    pub closed: usize,
    pub total: usize,
}

pub fn select_gigs(items: &[Gig], filters: &GigFilters) -> Vec<Gig> {
    let needle = normalized_needle(&filters.search);
    let mut out: Vec<Gig> = items
        .iter()
        .filter(|gig| {
            let text_ok = needle.as_deref().is_none_or(|n| {
                contains_ci(&gig.title, n)
                    || contains_ci(&gig.company, n)
                    || contains_ci(&gig.location, n)
                    || contains_ci(&gig.description, n)
            });
            let status_ok = filters.status.is_none_or(|s| gig.status == s);
            let type_ok = filters
                .job_type
                .as_deref()
                .is_none_or(|t| gig.job_type.eq_ignore_ascii_case(t));
            text_ok && status_ok && type_ok
        })
        .cloned()
        .collect();

    if let Some(key) = filters.sort {
        out.sort_by(|a, b| {
            let ord = match key {
                GigSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
                GigSortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
                GigSortKey::Company => a.company.to_lowercase().cmp(&b.company.to_lowercase()),
                GigSortKey::Location => a.location.to_lowercase().cmp(&b.location.to_lowercase()),
            };
            filters.direction.apply(ord)
        });
    }
    out
}

pub fn active_gigs(items: &[Gig]) -> Vec<Gig> {
    items
        .iter()
        .filter(|g| g.status == GigStatus::Active)
        .cloned()
        .collect()
}

pub fn gigs_posted_by(items: &[Gig], owner_id: &str) -> Vec<Gig> {
    items
        .iter()
        .filter(|g| g.posted_by == owner_id)
        .cloned()
        .collect()
}

/// Counts over the unfiltered authoritative list, never the displayed view.
pub fn gig_status_counts(items: &[Gig]) -> GigStatusCounts {
    let mut counts = GigStatusCounts::default();
    for gig in items {
        match gig.status {
            GigStatus::Active => counts.active += 1,
            GigStatus::Closed => counts.closed += 1,
        }
        counts.total += 1;
    }
    counts
}

// ── Machines ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineSortKey {
    CreatedAt,
    Name,
    Location,
    PricePerHour,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineFilters {
    pub search: Option<String>,
    pub machine_type: Option<String>,
    pub available: Option<bool>,
    pub sort: Option<MachineSortKey>,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MachineStats {
    pub total: usize,
    pub available: usize,
}

pub fn select_machines(items: &[Machine], filters: &MachineFilters) -> Vec<Machine> {
    let needle = normalized_needle(&filters.search);
    let mut out: Vec<Machine> = items
        .iter()
        .filter(|m| {
            let text_ok = needle.as_deref().is_none_or(|n| {
                contains_ci(&m.name, n)
                    || contains_ci(&m.machine_type, n)
                    || contains_ci(&m.location, n)
                    || contains_ci(&m.description, n)
            });
            let type_ok = filters
                .machine_type
                .as_deref()
                .is_none_or(|t| m.machine_type.eq_ignore_ascii_case(t));
            let avail_ok = filters.available.is_none_or(|a| m.availability == a);
            text_ok && type_ok && avail_ok
        })
        .cloned()
        .collect();

    if let Some(key) = filters.sort {
        out.sort_by(|a, b| match key {
            MachineSortKey::CreatedAt => filters.direction.apply(a.created_at.cmp(&b.created_at)),
            MachineSortKey::Name => filters
                .direction
                .apply(a.name.to_lowercase().cmp(&b.name.to_lowercase())),
            MachineSortKey::Location => filters
                .direction
                .apply(a.location.to_lowercase().cmp(&b.location.to_lowercase())),
            MachineSortKey::PricePerHour => {
                cmp_price(a.price_per_hour, b.price_per_hour, filters.direction)
            }
        });
    }
    out
}

pub fn machines_owned_by(items: &[Machine], manufacturer_id: &str) -> Vec<Machine> {
    items
        .iter()
        .filter(|m| m.manufacturer == manufacturer_id)
        .cloned()
        .collect()
}

pub fn machine_stats(items: &[Machine]) -> MachineStats {
    MachineStats {
        total: items.len(),
        available: items.iter().filter(|m| m.availability).count(),
    }
}

fn cmp_price(a: Option<f64>, b: Option<f64>, direction: SortDirection) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Some(a), Some(b)) => direction.apply(a.partial_cmp(&b).unwrap_or(Ordering::Equal)),
        // Unpriced listings sort after priced ones regardless of direction,
        // which is why the direction is applied inside rather than on the
        // whole ordering.
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// ── Applications ──

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationFilters {
    pub status: Option<ApplicationStatus>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplicationStatusCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub total: usize,
}

fn count_statuses<'a>(statuses: impl Iterator<Item = &'a ApplicationStatus>) -> ApplicationStatusCounts {
    let mut counts = ApplicationStatusCounts::default();
    for status in statuses {
        match status {
            ApplicationStatus::Pending => counts.pending += 1,
            ApplicationStatus::Approved => counts.approved += 1,
            ApplicationStatus::Rejected => counts.rejected += 1,
        }
        counts.total += 1;
    }
    counts
}

pub fn gig_application_status_counts(items: &[GigApplication]) -> ApplicationStatusCounts {
    count_statuses(items.iter().map(|a| &a.status))
}

pub fn machine_application_status_counts(
    items: &[MachineApplication],
) -> ApplicationStatusCounts {
    count_statuses(items.iter().map(|a| &a.status))
}

pub fn select_gig_applications(
    items: &[GigApplication],
    filters: &ApplicationFilters,
) -> Vec<GigApplication> {
    items
        .iter()
        .filter(|a| filters.status.is_none_or(|s| a.status == s))
        .cloned()
        .collect()
}

pub fn select_machine_applications(
    items: &[MachineApplication],
    filters: &ApplicationFilters,
) -> Vec<MachineApplication> {
    items
        .iter()
        .filter(|a| filters.status.is_none_or(|s| a.status == s))
        .cloned()
        .collect()
}

fn normalized_needle(search: &Option<String>) -> Option<String> {
    search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

fn contains_ci(haystack: &str, lowered_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowered_needle)
}
