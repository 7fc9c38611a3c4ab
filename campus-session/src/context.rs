//! Academic context cache
//!
//! The "active" organizational scope (year, term, section) splits into two
//! halves with different trust levels. Display names are cached in the
//! ephemeral tier so the UI paints instantly after a reload. Identifiers
//! are capability-bearing (they parameterize authenticated API calls), so
//! they are never written to any tier and must be re-fetched over the
//! network after every page load.

use crate::sanitize::sanitize_value;
use crate::storage::{SessionStores, StorageKey};
use crate::transport::{coerce_string, ActiveContextReply, SessionApi};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Active academic scope for the current organization
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AcademicContext {
    pub year: Option<String>,
    /// Memory-only; never persisted
    #[serde(skip)]
    pub term_id: Option<String>,
    pub term_name: Option<String>,
    /// Memory-only; never persisted
    #[serde(skip)]
    pub section_id: Option<String>,
    pub section_name: Option<String>,
}

impl AcademicContext {
    pub fn is_empty(&self) -> bool {
        *self == AcademicContext::default()
    }
}

/// Cache of the active academic context, keyed by the identity's
/// organization
pub struct ContextCache {
    state: RwLock<AcademicContext>,
    stores: SessionStores,
    api: Arc<dyn SessionApi>,
}

impl ContextCache {
    pub fn new(stores: SessionStores, api: Arc<dyn SessionApi>) -> Self {
        Self {
            state: RwLock::new(AcademicContext::default()),
            stores,
            api,
        }
    }

    /// Snapshot of the current in-memory context
    pub async fn current(&self) -> AcademicContext {
        self.state.read().await.clone()
    }

    /// Reload the cached display names from the ephemeral tier
    ///
    /// Identifiers stay unset; they only arrive through [`ContextCache::refresh`].
    pub async fn restore_names(&self) {
        let mut state = self.state.write().await;
        state.year = self.stores.read_sanitized(StorageKey::AcademicYear);
        state.term_name = self.stores.read_sanitized(StorageKey::AcademicTermName);
        state.section_name = self.stores.read_sanitized(StorageKey::AcademicSectionName);
        state.term_id = None;
        state.section_id = None;
    }

    /// Fetch the active context for the organization and update cache and
    /// tier
    ///
    /// Best-effort: a network failure leaves existing cached state exactly
    /// as it was and is not surfaced to the caller.
    pub async fn refresh(&self, organization_id: &str) -> Option<AcademicContext> {
        let body = match self.api.active_context(organization_id).await {
            Ok(body) => body,
            Err(err) => {
                warn!(
                    organization_id,
                    error = %err,
                    "Active context refresh failed; keeping cached values"
                );
                return None;
            }
        };

        let body = sanitize_value(body);
        let reply: ActiveContextReply = match serde_json::from_value(body) {
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, "Active context reply had an unexpected shape");
                return None;
            }
        };

        // Without an active year the reply carries no usable scope
        let year = match reply.active_year.filter(|y| !y.is_empty()) {
            Some(year) => year,
            None => {
                debug!(organization_id, "No active year in context reply");
                return None;
            }
        };

        let term_id = coerce_string(reply.active_term_id);
        let term_name = reply.active_term_name.filter(|n| !n.is_empty());
        let section_id = coerce_string(reply.active_section_id);
        let section_name = reply.active_section_name.filter(|n| !n.is_empty());

        let mut state = self.state.write().await;
        state.year = Some(year.clone());
        state.term_id = term_id;
        state.term_name = term_name.clone();

        self.stores.write(StorageKey::AcademicYear, &year);
        match &term_name {
            Some(name) => self.stores.write(StorageKey::AcademicTermName, name),
            None => self.stores.remove(StorageKey::AcademicTermName),
        }

        if section_id.is_some() {
            state.section_id = section_id;
            state.section_name = section_name.clone();
            match &section_name {
                Some(name) => self.stores.write(StorageKey::AcademicSectionName, name),
                None => self.stores.remove(StorageKey::AcademicSectionName),
            }
        } else {
            // A context without a section must not let a previously
            // selected section name survive
            state.section_id = None;
            state.section_name = None;
            self.stores.remove(StorageKey::AcademicSectionName);
        }

        debug!(organization_id, year = %state.year.as_deref().unwrap_or(""), "Academic context refreshed");
        Some(state.clone())
    }

    /// Drop the in-memory context
    ///
    /// The cached name keys live in the ephemeral tier and are wiped by the
    /// owning flow's tier clear.
    pub async fn reset(&self) {
        *self.state.write().await = AcademicContext::default();
    }
}
