use crate::api::client::{ApiClient, ApiResponse};
use crate::api::request::ApiRequest;
use crate::core::error::ApiError;
use crate::models::user::ProfileForm;
use serde_json::Value;

const PROFILE: &str = "/api/cliente/perfil";

pub struct Users<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    pub fn users(&self) -> Users<'_> {
        Users { client: self }
    }
}

impl Users<'_> {
    /// Fetch the current profile and refresh the cached copy
    pub async fn profile(&self) -> Result<ApiResponse, ApiError> {
        let response = self.client.send(ApiRequest::get(PROFILE)).await?;
        self.cache_profile(&response);
        Ok(response)
    }

    pub async fn update_profile(&self, form: &ProfileForm) -> Result<ApiResponse, ApiError> {
        let request = ApiRequest::post(PROFILE).form(form.update_fields());
        let response = self.client.send(request).await?;
        self.cache_profile(&response);
        Ok(response)
    }

    pub async fn register(&self, form: &ProfileForm) -> Result<ApiResponse, ApiError> {
        let request = ApiRequest::post("/api/register-cliente").form(form.registration_fields());
        self.client.send(request).await
    }

    /// The server has already applied the change, so a local storage
    /// failure only leaves the display cache stale.
    fn cache_profile(&self, response: &ApiResponse) {
        let Some(profile) = cacheable_profile(response) else {
            return;
        };
        if let Err(e) = self.client.session().set_cached_user(profile) {
            tracing::warn!(error = %e, "Failed to cache user profile");
        }
    }
}

/// The profile object of a successful response: its `user` member when
/// present, otherwise the whole body.
fn cacheable_profile(response: &ApiResponse) -> Option<&Value> {
    if !response.is_success() || response.application_failure().is_some() {
        return None;
    }
    let profile = response.body.get("user").unwrap_or(&response.body);
    profile.is_object().then_some(profile)
}
