use crate::api::client::ApiClient;
use crate::api::request::ApiRequest;
use crate::core::error::ApiError;
use crate::models::user::Credentials;
use reqwest::StatusCode;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Authenticated,
    /// The backend refused the credentials; the session is untouched.
    Rejected {
        status: StatusCode,
        message: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogoutOutcome {
    LoggedOut,
    /// The backend answered with an error status; the local session is
    /// kept so the user can retry.
    Rejected {
        status: StatusCode,
        message: Option<String>,
    },
}

pub struct Auth<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    pub fn auth(&self) -> Auth<'_> {
        Auth { client: self }
    }
}

impl Auth<'_> {
    /// Any 2xx marks the session authenticated. A refusal (including 401)
    /// is reported as `Rejected` and never triggers the session-expiry path.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome, ApiError> {
        tracing::info!("Logging in");
        tracing::debug!(email = %credentials.email, "Login attempt");

        let request = ApiRequest::post("/login").json(credentials)?;
        let response = self.client.dispatch_unguarded(request).await?;
        let status = response.status();

        if status.is_success() {
            self.client.session().set_authenticated()?;
            tracing::info!("Logged in");
            return Ok(LoginOutcome::Authenticated);
        }

        let message = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|body| body.get("message").and_then(Value::as_str).map(String::from));

        tracing::warn!(%status, "Login rejected");
        Ok(LoginOutcome::Rejected { status, message })
    }

    /// Log out on the server, then clear the local session.
    ///
    /// Only a success status (Laravel answers 204 with no body) clears the
    /// session here. A 401 means the server already considers us logged out
    /// and the pipeline has cleared the session. Any other status, and any
    /// network failure, leaves the local session as it was.
    pub async fn logout(&self) -> Result<LogoutOutcome, ApiError> {
        tracing::info!("Logging out");

        match self.client.send(ApiRequest::post("/logout")).await {
            Ok(response) if response.is_success() => {}
            Ok(response) => {
                let status = response.status;
                let message = response
                    .body
                    .get("message")
                    .and_then(Value::as_str)
                    .map(String::from);
                tracing::warn!(%status, "Logout rejected, keeping local session");
                return Ok(LogoutOutcome::Rejected { status, message });
            }
            Err(ApiError::InvalidResponse { status, .. }) if status.is_success() => {}
            Err(ApiError::InvalidResponse { status, reason }) => {
                tracing::warn!(%status, %reason, "Logout rejected, keeping local session");
                return Ok(LogoutOutcome::Rejected {
                    status,
                    message: None,
                });
            }
            Err(ApiError::Unauthorized) => return Ok(LogoutOutcome::LoggedOut),
            Err(e) => return Err(e),
        }

        self.client.session().clear()?;
        tracing::info!("Logged out");
        Ok(LogoutOutcome::LoggedOut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock_backend::{MockBackend, VALID_PASSWORD};
    use crate::core::config::ApiConfig;
    use crate::stores::key_value::MemoryStore;
    use crate::stores::session_store::{SessionEvent, SessionStore};
    use serde_json::json;
    use std::sync::Arc;

    fn create_test_client(base_url: String) -> ApiClient {
        let config = ApiConfig {
            base_url,
            ..ApiConfig::default()
        };
        let session = Arc::new(SessionStore::new(Arc::new(MemoryStore::new()), "/"));
        ApiClient::new(&config, session).unwrap()
    }

    #[tokio::test]
    async fn test_successful_login() {
        let backend = MockBackend::start().await;
        let client = create_test_client(backend.base_url());
        let mut events = client.session().subscribe();

        let outcome = client
            .auth()
            .login(&Credentials::new("ana@example.com", VALID_PASSWORD))
            .await
            .unwrap();

        assert_eq!(outcome, LoginOutcome::Authenticated);
        assert!(client.session().is_authenticated());
        assert_eq!(backend.preflights(), 1);
        assert_eq!(events.try_recv().unwrap(), SessionEvent::Authenticated);
        // No redirect
        assert!(events.try_recv().is_err());
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_login_keeps_email_out_of_info_logs() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let backend = MockBackend::start().await;
        let client = create_test_client(backend.base_url());
        let auth = client.auth();
        auth.login(&Credentials::new("ana@example.com", VALID_PASSWORD))
            .await
            .unwrap();
        auth.login(&Credentials::new("ana@example.com", "wrong"))
            .await
            .unwrap();

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Logged in"));
        assert!(output.contains("Login rejected"));
        assert!(!output.contains("ana@example.com"));
    }

    #[tokio::test]
    async fn test_rejected_login() {
        let backend = MockBackend::start().await;
        let client = create_test_client(backend.base_url());
        let mut events = client.session().subscribe();

        let outcome = client
            .auth()
            .login(&Credentials::new("ana@example.com", "wrong"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            LoginOutcome::Rejected {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                message: Some("These credentials do not match our records.".to_string()),
            }
        );
        assert!(!client.session().is_authenticated());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let backend = MockBackend::start().await;
        let client = create_test_client(backend.base_url());
        let session = Arc::clone(client.session());
        session.set_authenticated().unwrap();
        session.set_cached_user(&json!({ "name": "Ana" })).unwrap();
        let mut events = session.subscribe();

        let outcome = client.auth().logout().await.unwrap();

        assert_eq!(outcome, LogoutOutcome::LoggedOut);
        assert!(!session.is_authenticated());
        assert!(session.get_cached_user().is_none());
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::Cleared {
                redirect_to: "/".to_string()
            }
        );
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_logout_keeps_session_on_server_error() {
        let backend = MockBackend::start().await;
        backend.fail_logout();
        let client = create_test_client(backend.base_url());
        let session = Arc::clone(client.session());
        session.set_authenticated().unwrap();
        session.set_cached_user(&json!({ "name": "Ana" })).unwrap();
        let mut events = session.subscribe();

        let outcome = client.auth().logout().await.unwrap();

        assert_eq!(
            outcome,
            LogoutOutcome::Rejected {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: Some("Server Error".to_string()),
            }
        );
        assert!(session.is_authenticated());
        assert_eq!(session.get_cached_user(), Some(json!({ "name": "Ana" })));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_logout_keeps_session_when_server_unreachable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = create_test_client(format!("http://127.0.0.1:{port}"));
        client.session().set_authenticated().unwrap();

        let result = client.auth().logout().await;

        assert!(matches!(result, Err(ApiError::Network(_))));
        assert!(client.session().is_authenticated());
    }
}
