use crate::api::client::{ApiClient, ApiResponse};
use crate::api::request::ApiRequest;
use crate::core::error::ApiError;

pub struct Clubs<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    pub fn clubs(&self) -> Clubs<'_> {
        Clubs { client: self }
    }
}

impl Clubs<'_> {
    pub async fn list(&self) -> Result<ApiResponse, ApiError> {
        self.client.send(ApiRequest::get("/api/cliente/clubs")).await
    }
}
