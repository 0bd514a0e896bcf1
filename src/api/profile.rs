use std::sync::Arc;

use async_trait::async_trait;

use super::ApiClient;
use crate::core::types::{Profile, ProfilePatch};
use crate::error::ApiError;

#[async_trait]
pub trait ProfileApi: Send + Sync {
    async fn fetch(&self) -> Result<Profile, ApiError>;
    async fn update(&self, patch: &ProfilePatch) -> Result<Profile, ApiError>;
}

pub struct HttpProfileApi {
    client: Arc<ApiClient>,
}

impl HttpProfileApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProfileApi for HttpProfileApi {
    async fn fetch(&self) -> Result<Profile, ApiError> {
        self.client.get_one("profile", "profile.fetch").await
    }

    async fn update(&self, patch: &ProfilePatch) -> Result<Profile, ApiError> {
        self.client.patch("profile", patch, "profile.update").await
    }
}
