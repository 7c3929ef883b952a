use crate::api::client::{ApiClient, ApiResponse};
use crate::api::request::{path_segment, ApiRequest};
use crate::core::error::ApiError;
use crate::models::tournament::TeamRegistration;

pub struct Tournaments<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    pub fn tournaments(&self) -> Tournaments<'_> {
        Tournaments { client: self }
    }
}

impl Tournaments<'_> {
    pub async fn tournament(&self, id: &str) -> Result<ApiResponse, ApiError> {
        let path = format!("/api/cliente/torneos/{}", path_segment(id)?);
        self.client.send(ApiRequest::get(path)).await
    }

    /// Sign a new team up for the tournament
    pub async fn join(&self, id: &str, team: &TeamRegistration) -> Result<ApiResponse, ApiError> {
        let request = ApiRequest::post(format!(
            "/api/cliente/torneos/{}/unirse",
            path_segment(id)?
        ))
        .json(team)?;
        self.client.send(request).await
    }

    /// Team details by invitation code
    pub async fn team(&self, code: &str) -> Result<ApiResponse, ApiError> {
        self.client
            .send(ApiRequest::get(team_path(code, None)?))
            .await
    }

    /// Accept an invitation to an existing team
    pub async fn join_team(&self, code: &str) -> Result<ApiResponse, ApiError> {
        self.client
            .send(ApiRequest::post(team_path(code, Some("unirse"))?))
            .await
    }

    pub async fn leave_team(&self, code: &str) -> Result<ApiResponse, ApiError> {
        self.client
            .send(ApiRequest::post(team_path(code, Some("abandonar"))?))
            .await
    }
}

fn team_path(code: &str, action: Option<&str>) -> Result<String, ApiError> {
    let code = path_segment(code)?;
    Ok(match action {
        Some(action) => format!("/api/cliente/equipos/{code}/{action}"),
        None => format!("/api/cliente/equipos/{code}"),
    })
}
