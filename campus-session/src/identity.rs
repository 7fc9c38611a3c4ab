//! Identity model
//!
//! At most one identity variant is populated at any time: authenticating
//! one role implicitly clears the other role's state and storage slots.
//! Both records are closed structs with a small required field set plus an
//! extension map for backend-specific extras, so sanitization and storage
//! never special-case unknown keys.

use campus_core::UserRole;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Authenticated staff member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffIdentity {
    pub token: String,
    pub staff_id: String,
    pub display_name: String,
    pub organization_code: String,
    pub organization_name: String,
    pub organization_id: String,
    /// Backend role/permission detail blob, passed through opaquely
    #[serde(default)]
    pub role_details: Option<Value>,
    /// Backend-specific extra fields
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Authenticated enrolled learner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerIdentity {
    pub token: String,
    pub learner_id: String,
    pub display_name: String,
    pub organization_code: String,
    pub organization_name: String,
    pub organization_id: String,
    /// Backend-specific extra fields
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// The active identity, one of two disjoint variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Identity {
    Staff(StaffIdentity),
    Learner(LearnerIdentity),
}

impl Identity {
    pub fn role(&self) -> UserRole {
        match self {
            Identity::Staff(_) => UserRole::Staff,
            Identity::Learner(_) => UserRole::Learner,
        }
    }

    pub fn token(&self) -> &str {
        match self {
            Identity::Staff(staff) => &staff.token,
            Identity::Learner(learner) => &learner.token,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Identity::Staff(staff) => &staff.display_name,
            Identity::Learner(learner) => &learner.display_name,
        }
    }

    /// Organization scope shared by both roles
    pub fn organization(&self) -> Organization {
        match self {
            Identity::Staff(staff) => Organization {
                code: staff.organization_code.clone(),
                name: staff.organization_name.clone(),
                id: staff.organization_id.clone(),
            },
            Identity::Learner(learner) => Organization {
                code: learner.organization_code.clone(),
                name: learner.organization_name.clone(),
                id: learner.organization_id.clone(),
            },
        }
    }

    pub fn organization_id(&self) -> &str {
        match self {
            Identity::Staff(staff) => &staff.organization_id,
            Identity::Learner(learner) => &learner.organization_id,
        }
    }
}

/// Organizational scope derived from the active identity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub code: String,
    pub name: String,
    pub id: String,
}

impl Organization {
    pub fn is_known(&self) -> bool {
        !self.id.is_empty()
    }
}
