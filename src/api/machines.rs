use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::ApiClient;
use crate::core::types::{Machine, MachineDraft};
use crate::error::ApiError;

#[async_trait]
pub trait MachinesApi: Send + Sync {
    async fn list(&self, search: Option<&str>) -> Result<Vec<Machine>, ApiError>;
    /// Machines listed by the authenticated manufacturer, scoped server-side.
    async fn list_mine(&self) -> Result<Vec<Machine>, ApiError>;
    async fn create(&self, draft: &MachineDraft) -> Result<Machine, ApiError>;
    async fn delete(&self, id: &str) -> Result<(), ApiError>;
    async fn set_availability(&self, id: &str, available: bool) -> Result<Machine, ApiError>;
}

pub struct HttpMachinesApi {
    client: Arc<ApiClient>,
}

impl HttpMachinesApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MachinesApi for HttpMachinesApi {
    async fn list(&self, search: Option<&str>) -> Result<Vec<Machine>, ApiError> {
        let query: Vec<(&str, &str)> = search.map(|q| ("q", q)).into_iter().collect();
        self.client.get_list("machines", &query, "machines.list").await
    }

    async fn list_mine(&self) -> Result<Vec<Machine>, ApiError> {
        self.client
            .get_list("machines/mine", &[], "machines.list_mine")
            .await
    }

    async fn create(&self, draft: &MachineDraft) -> Result<Machine, ApiError> {
        self.client.post("machines", draft, "machines.create").await
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("machines/{id}"), "machines.delete")
            .await
    }

    async fn set_availability(&self, id: &str, available: bool) -> Result<Machine, ApiError> {
        self.client
            .patch(
                &format!("machines/{id}/availability"),
                &json!({ "availability": available }),
                "machines.set_availability",
            )
            .await
    }
}
