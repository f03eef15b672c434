use reqwest::Method;

use super::ApiClient;
use crate::error::ApiResult;
use crate::models::{Ack, LoginRequest, LoginResponse, ProfileUpdate, Registration, User};

#[derive(Clone)]
pub struct AuthClient {
    api: ApiClient,
}

impl AuthClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse> {
        let request = self
            .api
            .public(Method::POST, "/auth/login")
            .json(&LoginRequest { email, password });
        self.api.send_json(request).await
    }

    /// Creates the account; the caller still has to log in.
    pub async fn register(&self, form: &Registration) -> ApiResult<String> {
        let request = self.api.public(Method::POST, "/auth/register").json(form);
        let ack: Ack = self.api.send_json(request).await?;
        Ok(ack.message.unwrap_or_else(|| "Registration successful".to_string()))
    }

    pub async fn current_user(&self) -> ApiResult<User> {
        let request = self.api.authed(Method::GET, "/auth/user")?;
        self.api.send_json(request).await
    }

    pub async fn update_user(&self, update: &ProfileUpdate) -> ApiResult<String> {
        let request = self.api.authed(Method::PATCH, "/auth/user")?.json(update);
        let ack: Ack = self.api.send_json(request).await?;
        Ok(ack.message.unwrap_or_else(|| "Profile updated successfully!".to_string()))
    }

    pub async fn delete_user(&self) -> ApiResult<()> {
        let request = self.api.authed(Method::DELETE, "/auth/user")?;
        self.api.send_empty(request).await
    }
}
