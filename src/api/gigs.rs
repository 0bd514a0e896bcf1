use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::ApiClient;
use crate::core::types::{Gig, GigDraft, GigStatus};
use crate::error::ApiError;

#[async_trait]
pub trait GigsApi: Send + Sync {
    async fn list(&self, search: Option<&str>) -> Result<Vec<Gig>, ApiError>;
    /// Gigs posted by the authenticated identity, scoped server-side.
    async fn list_mine(&self) -> Result<Vec<Gig>, ApiError>;
    async fn create(&self, draft: &GigDraft) -> Result<Gig, ApiError>;
    async fn delete(&self, id: &str) -> Result<(), ApiError>;
    async fn set_status(&self, id: &str, status: GigStatus) -> Result<Gig, ApiError>;
}

pub struct HttpGigsApi {
    client: Arc<ApiClient>,
}

impl HttpGigsApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl GigsApi for HttpGigsApi {
    async fn list(&self, search: Option<&str>) -> Result<Vec<Gig>, ApiError> {
        let query: Vec<(&str, &str)> = search.map(|q| ("q", q)).into_iter().collect();
        self.client.get_list("gigs", &query, "gigs.list").await
    }

    async fn list_mine(&self) -> Result<Vec<Gig>, ApiError> {
        self.client.get_list("gigs/mine", &[], "gigs.list_mine").await
    }

    async fn create(&self, draft: &GigDraft) -> Result<Gig, ApiError> {
        self.client.post("gigs", draft, "gigs.create").await
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&format!("gigs/{id}"), "gigs.delete").await
    }

    async fn set_status(&self, id: &str, status: GigStatus) -> Result<Gig, ApiError> {
        self.client
            .patch(
                &format!("gigs/{id}/status"),
                &json!({ "status": status }),
                "gigs.set_status",
            )
            .await
    }
}
