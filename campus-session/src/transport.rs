//! Backend transport and navigation ports
//!
//! The session subsystem consumes exactly three external collaborators: a
//! login endpoint per role, an active-context endpoint, and a navigation
//! callback. All three are injected traits so tests run against fakes;
//! [`HttpSessionApi`] is the production implementation.

use crate::identity::{Identity, LearnerIdentity, StaffIdentity};
use crate::{SessionConfig, SessionError, SessionResult};
use async_trait::async_trait;
use campus_core::{CampusError, ErrorContext, UserRole};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;
use url::Url;

/// Login request body
///
/// The password travels verbatim; sanitizing it would silently corrupt
/// legitimate credentials.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub organization_code: String,
    pub username: String,
    pub password: String,
}

/// Login response body, shape-tolerant
///
/// Every field is optional: malformed replies surface as a missing token,
/// not a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginReply {
    pub success: Option<bool>,
    pub token: Option<String>,
    pub id: Option<Value>,
    pub display_name: Option<String>,
    pub organization_code: Option<String>,
    pub organization_name: Option<String>,
    pub organization_id: Option<Value>,
    pub role_details: Option<Value>,
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl LoginReply {
    /// Assemble the identity for the given role
    ///
    /// Fails with [`SessionError::MissingToken`] when the reply carries no
    /// usable token, which is treated exactly like bad credentials.
    pub fn into_identity(self, role: UserRole) -> SessionResult<Identity> {
        let token = match self.token {
            Some(token) if !token.is_empty() => token,
            _ => return Err(SessionError::MissingToken),
        };

        let id = coerce_string(self.id).unwrap_or_default();
        let display_name = self.display_name.unwrap_or_default();
        let organization_code = self.organization_code.unwrap_or_default();
        let organization_name = self.organization_name.unwrap_or_default();
        let organization_id = coerce_string(self.organization_id).unwrap_or_default();

        let identity = match role {
            UserRole::Staff => Identity::Staff(StaffIdentity {
                token,
                staff_id: id,
                display_name,
                organization_code,
                organization_name,
                organization_id,
                role_details: self.role_details,
                extra: self.extra,
            }),
            UserRole::Learner => Identity::Learner(LearnerIdentity {
                token,
                learner_id: id,
                display_name,
                organization_code,
                organization_name,
                organization_id,
                extra: self.extra,
            }),
        };

        Ok(identity)
    }
}

/// Active academic context response body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActiveContextReply {
    pub active_year: Option<String>,
    pub active_term_id: Option<Value>,
    pub active_term_name: Option<String>,
    pub active_section_id: Option<Value>,
    pub active_section_name: Option<String>,
}

/// Best-effort string coercion for identifier fields the backend sends as
/// either strings or numbers
pub(crate) fn coerce_string(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Backend API port for the two endpoints the session manager consumes
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// POST the login request to the role's endpoint, returning the raw
    /// JSON body of a successful reply
    async fn login(&self, role: UserRole, request: &LoginRequest) -> SessionResult<Value>;

    /// GET the active academic context scoped by organization id
    async fn active_context(&self, organization_id: &str) -> SessionResult<Value>;
}

/// Navigation callback port
///
/// The router itself is an external collaborator; the session manager only
/// needs to send the user somewhere and to know whether the current
/// location already looks like a login page.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
    fn current_path(&self) -> String;
}

/// Navigator that goes nowhere, for embeddings without routing
#[derive(Debug, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, _path: &str) {}

    fn current_path(&self) -> String {
        "/".to_string()
    }
}

/// Production `reqwest`-backed implementation of [`SessionApi`]
pub struct HttpSessionApi {
    client: reqwest::Client,
    base_url: Url,
    config: SessionConfig,
}

impl HttpSessionApi {
    pub fn new(base_url: &str, config: SessionConfig) -> SessionResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| CampusError::Config {
            message: format!("Invalid base URL: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("transport")
                .with_operation("parse_base_url")
                .with_suggestion("Check the backend base URL in the deployment config"),
        })?;

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            config,
        })
    }

    fn endpoint(&self, path: &str) -> SessionResult<Url> {
        self.base_url.join(path).map_err(|e| {
            CampusError::Config {
                message: format!("Invalid endpoint path {:?}: {}", path, e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("transport").with_operation("join_endpoint"),
            }
            .into()
        })
    }
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn login(&self, role: UserRole, request: &LoginRequest) -> SessionResult<Value> {
        let url = self.endpoint(self.config.login_url(role))?;
        debug!(%role, url = %url, "Sending login request");

        let response = self.client.post(url).json(request).send().await?;
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if status.is_success() {
            Ok(body)
        } else {
            // Error bodies carry a human-readable message field
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Invalid credentials")
                .to_string();
            Err(SessionError::authentication(message))
        }
    }

    async fn active_context(&self, organization_id: &str) -> SessionResult<Value> {
        let url = self.endpoint(&self.config.active_context_url)?;
        debug!(url = %url, "Fetching active academic context");

        let response = self
            .client
            .get(url)
            .header("X-Organization-Id", organization_id)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SessionError::network(format!(
                "Active context request failed with status {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }
}
