//! Storage key enumeration
//!
//! A fixed, namespaced key set partitions session values across the two
//! tiers. No key is shared between the staff and learner identity slots.

use campus_core::UserRole;

/// Which tier a key lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierKind {
    /// Cleared when the browser session ends, and on every login/logout
    Ephemeral,
    /// Survives browser restarts; cleared on logout
    Durable,
}

/// Every key the session subsystem may touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    StaffToken,
    StaffIdentity,
    LearnerToken,
    LearnerIdentity,
    OrgCode,
    OrgName,
    OrgId,
    AcademicYear,
    AcademicTermName,
    AcademicSectionName,
    ActivityLastSeen,
}

impl StorageKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::StaffToken => "campus.staff.token",
            StorageKey::StaffIdentity => "campus.staff.identity",
            StorageKey::LearnerToken => "campus.learner.token",
            StorageKey::LearnerIdentity => "campus.learner.identity",
            StorageKey::OrgCode => "campus.org.code",
            StorageKey::OrgName => "campus.org.name",
            StorageKey::OrgId => "campus.org.id",
            StorageKey::AcademicYear => "campus.academic.year",
            StorageKey::AcademicTermName => "campus.academic.termName",
            StorageKey::AcademicSectionName => "campus.academic.sectionName",
            StorageKey::ActivityLastSeen => "campus.activity.lastSeen",
        }
    }

    /// The tier this key is stored in
    pub fn tier(&self) -> TierKind {
        match self {
            StorageKey::StaffToken
            | StorageKey::StaffIdentity
            | StorageKey::LearnerToken
            | StorageKey::LearnerIdentity
            | StorageKey::AcademicYear
            | StorageKey::AcademicTermName
            | StorageKey::AcademicSectionName => TierKind::Ephemeral,
            StorageKey::OrgCode
            | StorageKey::OrgName
            | StorageKey::OrgId
            | StorageKey::ActivityLastSeen => TierKind::Durable,
        }
    }

    /// Token slot for the given role
    pub fn token_for(role: UserRole) -> StorageKey {
        match role {
            UserRole::Staff => StorageKey::StaffToken,
            UserRole::Learner => StorageKey::LearnerToken,
        }
    }

    /// Serialized identity slot for the given role
    pub fn identity_for(role: UserRole) -> StorageKey {
        match role {
            UserRole::Staff => StorageKey::StaffIdentity,
            UserRole::Learner => StorageKey::LearnerIdentity,
        }
    }
}
