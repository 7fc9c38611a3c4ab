//! Campus Session - Client session and identity management
//!
//! This crate owns the one piece of durable design contract in the Campus
//! front end: the client-held session state for the two mutually exclusive
//! user roles (staff and enrolled learner). It covers:
//!
//! - Sanitization of every value crossing the trust boundary
//! - Two storage tiers with different lifetimes (ephemeral and durable)
//! - The authenticated-role state machine with login/logout flows
//! - A cache of the active academic context (year, term, section)
//! - Inactivity tracking with forced logout on expiry
//!
//! ## Architecture
//!
//! The [`SessionManager`] is constructed once per process and handed by
//! reference to consumers. Its collaborators (backend API, navigation,
//! storage tiers, clock) are injected ports, so tests substitute in-memory
//! fakes for all of them.

pub mod activity;
pub mod context;
pub mod identity;
pub mod manager;
pub mod sanitize;
pub mod storage;
pub mod transport;

pub use activity::{ActivityTracker, Clock, ManualClock, SystemClock};
pub use context::{AcademicContext, ContextCache};
pub use identity::{Identity, LearnerIdentity, Organization, StaffIdentity};
pub use manager::SessionManager;
pub use storage::{MemoryTier, SessionStores, StorageKey, StorageTier, TierKind};
pub use transport::{
    ActiveContextReply, HttpSessionApi, LoginReply, LoginRequest, Navigator, NoopNavigator,
    SessionApi,
};

pub use campus_core::UserRole;

use std::time::Duration;

/// Session-level error type
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Core error: {0}")]
    Core(#[from] campus_core::CampusError),

    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("Login response did not carry a token")]
    MissingToken,

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type SessionResult<T> = Result<T, SessionError>;

impl SessionError {
    /// Create an authentication error
    pub fn authentication<S: Into<String>>(message: S) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Create a network error with source
    pub fn network_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Network {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a storage error
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Human-readable message suitable for inline display next to a form
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Authentication { message } => message.clone(),
            SessionError::MissingToken => "Login failed: the server reply was incomplete".to_string(),
            SessionError::Network { message, .. } => {
                format!("Could not reach the server: {}", message)
            }
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        SessionError::Network {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

/// Session manager configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Staff login endpoint
    pub staff_login_url: String,
    /// Learner login endpoint
    pub learner_login_url: String,
    /// Active academic context endpoint
    pub active_context_url: String,
    /// Route for the staff login page
    pub staff_login_path: String,
    /// Route for the learner login page
    pub learner_login_path: String,
    /// Idle time after which an authenticated session is force-closed
    pub idle_timeout: Duration,
    /// How often the background task re-checks for expiry
    pub expiry_check_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            staff_login_url: "/api/auth/staff/login".to_string(),
            learner_login_url: "/api/auth/learner/login".to_string(),
            active_context_url: "/api/academic/active-context".to_string(),
            staff_login_path: "/staff/login".to_string(),
            learner_login_path: "/learner/login".to_string(),
            idle_timeout: Duration::from_secs(30 * 60),
            expiry_check_interval: Duration::from_secs(60),
        }
    }
}

impl SessionConfig {
    /// Login endpoint for the given role
    pub fn login_url(&self, role: UserRole) -> &str {
        match role {
            UserRole::Staff => &self.staff_login_url,
            UserRole::Learner => &self.learner_login_url,
        }
    }

    /// Login page route for the given role
    pub fn login_path(&self, role: UserRole) -> &str {
        match role {
            UserRole::Staff => &self.staff_login_path,
            UserRole::Learner => &self.learner_login_path,
        }
    }
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use super::{
        AcademicContext, Identity, SessionConfig, SessionError, SessionManager, SessionResult,
        UserRole,
    };
}
