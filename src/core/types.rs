//! Domain entities mirrored from the MakerLink REST API.
//!
//! All identifiers are opaque strings assigned server-side. Timestamps are
//! RFC 3339 strings as the backend sends them; lexicographic order on them is
//! chronological order, which the selectors rely on.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Marketplace role attached to an authenticated identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Worker,
    Startup,
    Manufacturer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

/// Partial identity update applied after a profile edit has been persisted
/// server-side. Only the two mutable fields are patchable.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GigStatus {
    Active,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gig {
    pub id: String,
    pub title: String,
    pub description: String,
    pub company: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    pub job_type: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    pub posted_by: String,
    pub status: GigStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_count: Option<u64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Payload for creating a gig. The server assigns id, timestamps, owner and
/// initial status.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GigDraft {
    pub title: String,
    pub description: String,
    pub company: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    pub job_type: String,
    pub required_skills: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GigApplication {
    pub id: String,
    pub gig_id: String,
    pub worker_id: String,
    pub status: ApplicationStatus,
    pub applied_at: String,
    /// Denormalized copy of the gig at application time. Goes stale when the
    /// gig itself changes; see DESIGN.md on cross-store snapshot consistency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gig: Option<Gig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub machine_type: String,
    pub description: String,
    pub manufacturer: String,
    pub location: String,
    #[serde(default)]
    pub specifications: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_hour: Option<f64>,
    /// Single source of truth for bookability. The backend historically sent
    /// both `availability` and an `isAvailable` alias; the alias is accepted
    /// on input and derived on read, never stored.
    #[serde(alias = "isAvailable")]
    pub availability: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_applied: Option<bool>,
    pub created_at: String,
    pub updated_at: String,
}

impl Machine {
    /// Legacy alias for `availability`. Derived, so the two can never drift.
    pub fn is_available(&self) -> bool {
        self.availability
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineDraft {
    pub name: String,
    #[serde(rename = "type")]
    pub machine_type: String,
    pub description: String,
    pub location: String,
    pub specifications: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_hour: Option<f64>,
    pub availability: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicantType {
    Worker,
    Startup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineApplication {
    pub id: String,
    pub machine_id: String,
    pub applicant_id: String,
    pub applicant_type: ApplicantType,
    pub status: ApplicationStatus,
    pub applied_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine: Option<Machine>,
}

/// Rental request details sent with a machine application.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_end_date: Option<String>,
}

/// Role-specific profile, tagged explicitly so store actions can dispatch on
/// the variant exhaustively instead of sniffing which fields are populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Profile {
    Worker(WorkerProfile),
    Startup(StartupProfile),
    Manufacturer(ManufacturerProfile),
}

impl Profile {
    pub fn role(&self) -> Role {
        match self {
            Profile::Worker(_) => Role::Worker,
            Profile::Startup(_) => Role::Startup,
            Profile::Manufacturer(_) => Role::Manufacturer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerProfile {
    pub display_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub total_applications: u64,
    #[serde(default)]
    pub approved_applications: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartupProfile {
    pub company_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub total_gigs: u64,
    #[serde(default)]
    pub active_gigs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManufacturerProfile {
    pub company_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub total_machines: u64,
    #[serde(default)]
    pub active_machines: u64,
}

/// Flat partial update for the current profile; the server decides which
/// fields apply to which role.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub created_at: String,
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_ref: Option<String>,
}
