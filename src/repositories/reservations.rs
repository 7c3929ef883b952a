use crate::api::client::{ApiClient, ApiResponse};
use crate::api::request::{path_segment, ApiRequest};
use crate::core::error::ApiError;
use serde::Serialize;

const RESERVATIONS: &str = "/api/cliente/reservaciones";

pub struct Reservations<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    pub fn reservations(&self) -> Reservations<'_> {
        Reservations { client: self }
    }
}

impl Reservations<'_> {
    /// Landing screen data: upcoming reservations and featured clubs
    pub async fn home(&self) -> Result<ApiResponse, ApiError> {
        self.client.send(ApiRequest::get("/api/cliente/home")).await
    }

    pub async fn list(&self) -> Result<ApiResponse, ApiError> {
        self.client.send(ApiRequest::get(RESERVATIONS)).await
    }

    /// Clubs, courts and time slots offered by the booking form
    pub async fn creation_data(&self) -> Result<ApiResponse, ApiError> {
        self.client
            .send(ApiRequest::get(format!("{RESERVATIONS}/create")))
            .await
    }

    pub async fn create<T: Serialize + ?Sized>(
        &self,
        reservation: &T,
    ) -> Result<ApiResponse, ApiError> {
        let request = ApiRequest::post(RESERVATIONS).json(reservation)?;
        self.client.send(request).await
    }

    pub async fn cancel(&self, id: &str) -> Result<ApiResponse, ApiError> {
        let path = format!("{RESERVATIONS}/{}", path_segment(id)?);
        self.client.send(ApiRequest::delete(path)).await
    }
}
