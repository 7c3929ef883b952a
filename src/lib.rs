pub mod core {
    pub mod config;
    pub mod error;
    pub mod startup;
    pub mod tracing_init;
}

pub mod api {
    pub mod client;
    pub mod cookie;
    pub mod request;

    #[cfg(test)]
    pub(crate) mod mock_backend;
}

pub mod stores {
    pub mod file_store;
    pub mod key_value;
    pub mod session_store;
}

pub mod models {
    pub mod tournament;
    pub mod user;
}

pub mod repositories {
    pub mod auth;
    pub mod clubs;
    pub mod reservations;
    pub mod tournaments;
    pub mod users;
}

pub use crate::api::client::{ApiClient, ApiResponse};
pub use crate::api::request::{ApiRequest, FormField, Payload};
pub use crate::core::config::Config;
pub use crate::core::startup::build_client;
pub use crate::core::tracing_init::init_tracing;
pub use crate::core::error::{ApiError, StorageError};
pub use crate::stores::session_store::{RouteAccess, SessionEvent, SessionStore};
pub use crate::repositories::auth::{LoginOutcome, LogoutOutcome};
