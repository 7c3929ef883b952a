use crate::api::cookie::{decode_component, CookieAccessor};
use crate::api::request::{ApiRequest, Payload};
use crate::core::config::ApiConfig;
use crate::core::error::ApiError;
use crate::stores::session_store::SessionStore;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Request pipeline for the booking backend.
///
/// Every call runs a fresh anti-forgery pre-flight, carries the session
/// cookies, and clears the session on a 401. There are no retries.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
    cookies: CookieAccessor,
    session: Arc<SessionStore>,
    csrf_path: String,
    csrf_cookie: String,
    csrf_header: HeaderName,
    timeout: Option<Duration>,
}

/// Parsed JSON body of any non-401 response, whatever its status
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Server-reported failure (`"success": false`), with its message if any.
    /// This is ordinary data for the caller to present, not an error.
    pub fn application_failure(&self) -> Option<String> {
        if self.body.get("success").and_then(Value::as_bool) != Some(false) {
            return None;
        }
        let message = self
            .body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("The request was not successful");
        Some(message.to_string())
    }

    pub fn into_body(self) -> Value {
        self.body
    }
}

impl ApiClient {
    pub fn new(config: &ApiConfig, session: Arc<SessionStore>) -> anyhow::Result<Self> {
        let base_url = config.base()?;
        let csrf_header = HeaderName::from_bytes(config.csrf_header.as_bytes())?;

        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .build()?;

        Ok(Self {
            client,
            cookies: CookieAccessor::new(jar, base_url.clone()),
            base_url,
            session,
            csrf_path: config.csrf_path.clone(),
            csrf_cookie: config.csrf_cookie.clone(),
            csrf_header,
            timeout: config.timeout(),
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn cookies(&self) -> &CookieAccessor {
        &self.cookies
    }

    /// Run one call through the pipeline.
    ///
    /// A 401 clears the session (which announces the redirect) and yields
    /// `ApiError::Unauthorized`. Every other status is returned with its
    /// parsed JSON body.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let method = request.method.clone();
        let path = request.path.clone();
        let response = self.dispatch_unguarded(request).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(%method, %path, "Server returned 401, clearing session");
            // The redirect is announced even if the removal fails, and the
            // caller always sees the 401 as such.
            if let Err(e) = self.session.clear() {
                tracing::error!(error = %e, "Session storage failed during forced logout");
            }
            return Err(ApiError::Unauthorized);
        }

        let response = read_json(response).await?;
        tracing::debug!(%method, %path, status = %response.status, "Request completed");
        Ok(response)
    }

    /// Pre-flight and dispatch without the 401 handling. Only the login
    /// flow uses this: a rejected login is not an expired session.
    pub(crate) async fn dispatch_unguarded(
        &self,
        request: ApiRequest,
    ) -> Result<reqwest::Response, ApiError> {
        let token = self.fetch_csrf_token().await?;

        let url = self.url(&request.path)?;
        tracing::debug!(method = %request.method, url = %url, "Dispatching request");

        let mut builder = self
            .client
            .request(request.method, url)
            .header(ACCEPT, "application/json");

        match token {
            Some(token) => match HeaderValue::from_str(&token) {
                Ok(value) => builder = builder.header(self.csrf_header.clone(), value),
                Err(_) => {
                    tracing::warn!("Anti-forgery token is not a valid header value, omitting it")
                }
            },
            None => tracing::warn!(
                cookie = %self.csrf_cookie,
                "No anti-forgery token available, sending request without it"
            ),
        }

        builder = match request.payload {
            Payload::Empty => builder.header(CONTENT_TYPE, "application/json"),
            Payload::Json(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_string()),
            // The multipart boundary comes from reqwest
            Payload::Multipart(fields) => builder.multipart(Payload::into_form(fields)?),
        };

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!(error = %e, "Request failed before a response arrived");
            ApiError::from(e)
        })?;

        Ok(response)
    }

    /// Ask the server for a new anti-forgery cookie and return its decoded
    /// value. Prefer the cookie set on this very response so a concurrent
    /// pre-flight cannot swap tokens between calls; fall back to the jar when
    /// the server did not reissue it.
    async fn fetch_csrf_token(&self) -> Result<Option<String>, ApiError> {
        let url = self.url(&self.csrf_path)?;

        let mut builder = self.client.get(url);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!(error = %e, "Anti-forgery pre-flight failed");
            ApiError::from(e)
        })?;

        let issued = response
            .cookies()
            .find(|cookie| cookie.name() == self.csrf_cookie)
            .map(|cookie| decode_component(cookie.value()));

        tracing::debug!(
            status = %response.status(),
            reissued = issued.is_some(),
            "Anti-forgery pre-flight completed"
        );

        Ok(issued.or_else(|| self.cookies.get(&self.csrf_cookie)))
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let joined = if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        };
        Url::parse(&joined).map_err(|e| ApiError::Encode(format!("Invalid request URL '{joined}': {e}")))
    }
}

async fn read_json(response: reqwest::Response) -> Result<ApiResponse, ApiError> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(ApiError::from)?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(body) => Ok(ApiResponse { status, body }),
        Err(e) => {
            tracing::warn!(%status, error = %e, "Response body is not JSON");
            Err(ApiError::InvalidResponse {
                status,
                reason: e.to_string(),
            })
        }
    }
}
