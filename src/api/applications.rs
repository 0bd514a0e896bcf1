use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::ApiClient;
use crate::core::types::{
    ApplicationStatus, GigApplication, MachineApplication, RentalRequest,
};
use crate::error::ApiError;

#[async_trait]
pub trait ApplicationsApi: Send + Sync {
    /// The authenticated applicant's own gig applications.
    async fn list_gig_applications(&self) -> Result<Vec<GigApplication>, ApiError>;
    async fn list_machine_applications(&self) -> Result<Vec<MachineApplication>, ApiError>;
    async fn apply_to_gig(
        &self,
        gig_id: &str,
        message: Option<&str>,
    ) -> Result<GigApplication, ApiError>;
    async fn apply_to_machine(
        &self,
        machine_id: &str,
        request: &RentalRequest,
    ) -> Result<MachineApplication, ApiError>;
    /// Reviewer transition; the same endpoint serves gig and machine
    /// applications symmetrically.
    async fn set_gig_application_status(
        &self,
        id: &str,
        status: ApplicationStatus,
    ) -> Result<GigApplication, ApiError>;
    async fn set_machine_application_status(
        &self,
        id: &str,
        status: ApplicationStatus,
    ) -> Result<MachineApplication, ApiError>;
}

pub struct HttpApplicationsApi {
    client: Arc<ApiClient>,
}

impl HttpApplicationsApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ApplicationsApi for HttpApplicationsApi {
    async fn list_gig_applications(&self) -> Result<Vec<GigApplication>, ApiError> {
        self.client
            .get_list("applications/gigs", &[], "applications.list_gigs")
            .await
    }

    async fn list_machine_applications(&self) -> Result<Vec<MachineApplication>, ApiError> {
        self.client
            .get_list("applications/machines", &[], "applications.list_machines")
            .await
    }

    async fn apply_to_gig(
        &self,
        gig_id: &str,
        message: Option<&str>,
    ) -> Result<GigApplication, ApiError> {
        self.client
            .post(
                &format!("gigs/{gig_id}/apply"),
                &json!({ "message": message }),
                "applications.apply_gig",
            )
            .await
    }

    async fn apply_to_machine(
        &self,
        machine_id: &str,
        request: &RentalRequest,
    ) -> Result<MachineApplication, ApiError> {
        self.client
            .post(
                &format!("machines/{machine_id}/apply"),
                request,
                "applications.apply_machine",
            )
            .await
    }

    async fn set_gig_application_status(
        &self,
        id: &str,
        status: ApplicationStatus,
    ) -> Result<GigApplication, ApiError> {
        self.client
            .patch(
                &format!("applications/{id}/status"),
                &json!({ "status": status }),
                "applications.review",
            )
            .await
    }

    async fn set_machine_application_status(
        &self,
        id: &str,
        status: ApplicationStatus,
    ) -> Result<MachineApplication, ApiError> {
        self.client
            .patch(
                &format!("applications/{id}/status"),
                &json!({ "status": status }),
                "applications.review",
            )
            .await
    }
}
