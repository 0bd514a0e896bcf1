use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::ApiClient;
use crate::core::types::{Identity, Role};
use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: Identity,
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError>;
    async fn signup(&self, email: &str, password: &str, role: Role)
    -> Result<LoginResponse, ApiError>;
    /// Validate the current bearer credential and return who it belongs to.
    async fn me(&self) -> Result<Identity, ApiError>;
}

pub struct HttpAuthApi {
    client: Arc<ApiClient>,
}

impl HttpAuthApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        self.client
            .post(
                "auth/login",
                &json!({ "email": email, "password": password }),
                "auth.login",
            )
            .await
    }

    async fn signup(
        &self,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<LoginResponse, ApiError> {
        self.client
            .post(
                "auth/signup",
                &json!({ "email": email, "password": password, "role": role }),
                "auth.signup",
            )
            .await
    }

    async fn me(&self) -> Result<Identity, ApiError> {
        self.client.get_one("me", "auth.me").await
    }
}
