//! Core data type definitions

use serde::{Deserialize, Serialize};

/// The two mutually exclusive authenticated user populations
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// School staff member
    Staff,
    /// Enrolled learner
    Learner,
}

impl UserRole {
    /// The opposite role; used when one role's state must be cleared on
    /// behalf of the other
    pub fn other(&self) -> UserRole {
        match self {
            UserRole::Staff => UserRole::Learner,
            UserRole::Learner => UserRole::Staff,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Staff => write!(f, "staff"),
            UserRole::Learner => write!(f, "learner"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "staff" => Ok(UserRole::Staff),
            "learner" => Ok(UserRole::Learner),
            _ => Err(format!("Unknown user role: {}", s)),
        }
    }
}
