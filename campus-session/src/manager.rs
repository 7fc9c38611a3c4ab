//! Session manager
//!
//! Owns the authenticated-role state machine and orchestrates the
//! sanitization engine, storage tiers, academic context cache, and
//! activity monitor. One manager is constructed per process/tab and passed
//! by reference to consumers; all collaborators are injected ports.
//!
//! State machine: `Unauthenticated -> Authenticating ->
//! Authenticated(role) -> Unauthenticated`. While authenticated, a
//! background task polls for inactivity expiry; it is started on the
//! transition in and torn down on the transition out, so role switches
//! never leak a poller.

use crate::activity::{ActivityTracker, Clock, SystemClock};
use crate::context::{AcademicContext, ContextCache};
use crate::identity::{Identity, Organization};
use crate::sanitize::{sanitize_scalar, sanitize_value};
use crate::storage::{SessionStores, StorageKey, TierKind};
use crate::transport::{LoginReply, LoginRequest, Navigator, SessionApi};
use crate::{SessionConfig, SessionResult};
use campus_core::UserRole;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

enum AuthState {
    Unauthenticated,
    Authenticating,
    Authenticated {
        identity: Identity,
        organization: Organization,
    },
}

/// Client session and identity manager
///
/// Cheap to clone; clones share the same underlying state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    stores: SessionStores,
    api: Arc<dyn SessionApi>,
    navigator: Arc<dyn Navigator>,
    state: RwLock<AuthState>,
    context: ContextCache,
    tracker: ActivityTracker,
    expiry_task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    /// Create a manager with the system wall clock
    pub fn new(
        config: SessionConfig,
        stores: SessionStores,
        api: Arc<dyn SessionApi>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self::with_clock(config, stores, api, navigator, Arc::new(SystemClock))
    }

    /// Create a manager with an injected clock (used by tests to drive the
    /// idle-expiry arithmetic)
    pub fn with_clock(
        config: SessionConfig,
        stores: SessionStores,
        api: Arc<dyn SessionApi>,
        navigator: Arc<dyn Navigator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let context = ContextCache::new(stores.clone(), api.clone());
        let tracker = ActivityTracker::new(stores.clone(), clock, config.idle_timeout);

        Self {
            inner: Arc::new(SessionInner {
                config,
                stores,
                api,
                navigator,
                state: RwLock::new(AuthState::Unauthenticated),
                context,
                tracker,
                expiry_task: Mutex::new(None),
            }),
        }
    }

    // ========================================
    // Login / logout flows
    // ========================================

    /// Authenticate the given role
    ///
    /// Organization code and username are sanitized; the password travels
    /// verbatim. The ephemeral tier is wiped before any new value is
    /// written, so no trace of a previous session can leak into this one.
    /// On failure every partial write is rolled back and the manager is
    /// back in the unauthenticated state; the error carries a
    /// human-readable message for inline display.
    pub async fn login(
        &self,
        role: UserRole,
        organization_code: &str,
        username: &str,
        password: &str,
    ) -> SessionResult<Identity> {
        let request = LoginRequest {
            organization_code: sanitize_scalar(organization_code),
            username: sanitize_scalar(username),
            password: password.to_string(),
        };

        {
            *self.inner.state.write().await = AuthState::Authenticating;
        }

        // Session fixation defense: the previous session's ephemeral state
        // is gone before the authentication request is even issued
        self.inner.stores.clear_tier(TierKind::Ephemeral);
        self.inner.context.reset().await;

        match self.perform_login(role, &request).await {
            Ok(identity) => Ok(identity),
            Err(err) => {
                warn!(%role, error = %err, "Login failed");
                self.clear_session_state().await;
                Err(err)
            }
        }
    }

    async fn perform_login(
        &self,
        role: UserRole,
        request: &LoginRequest,
    ) -> SessionResult<Identity> {
        let body = self.inner.api.login(role, request).await?;
        let body = sanitize_value(body);
        let reply: LoginReply = serde_json::from_value(body)?;
        let identity = reply.into_identity(role)?;
        let organization = identity.organization();

        self.inner
            .stores
            .write(StorageKey::token_for(role), identity.token());
        let payload = serde_json::to_string(&identity)?;
        self.inner
            .stores
            .write(StorageKey::identity_for(role), &payload);

        self.inner.stores.write(StorageKey::OrgCode, &organization.code);
        self.inner.stores.write(StorageKey::OrgName, &organization.name);
        self.inner.stores.write(StorageKey::OrgId, &organization.id);

        {
            *self.inner.state.write().await = AuthState::Authenticated {
                identity: identity.clone(),
                organization: organization.clone(),
            };
        }

        self.inner.tracker.touch();
        self.start_expiry_monitor();

        // The context refresh is a separate asynchronous step: identifiers
        // are eventually available, never synchronously after login
        if organization.is_known() {
            let manager = self.clone();
            let organization_id = organization.id.clone();
            tokio::spawn(async move {
                manager.inner.context.refresh(&organization_id).await;
            });
        }

        info!(%role, user = identity.display_name(), "Login succeeded");
        Ok(identity)
    }

    /// Explicit user-initiated logout
    ///
    /// Safe to call repeatedly; a second call clears already-empty tiers.
    pub async fn logout(&self, redirect: &str) {
        info!("Logout requested");
        self.clear_session_state().await;
        self.inner.navigator.navigate(redirect);
    }

    /// Logout chosen by the system (expiry or equivalent)
    ///
    /// The redirect target comes from the role that was active; navigation
    /// is skipped when the current location already looks like a login
    /// page, to avoid redirect loops.
    pub async fn auto_logout(&self, is_automatic: bool) {
        let role = self.user_role().await;
        let target = match role {
            Some(role) => self.inner.config.login_path(role).to_string(),
            None => "/".to_string(),
        };

        info!(?role, is_automatic, "Closing session");
        self.clear_session_state().await;

        let current = self.inner.navigator.current_path();
        if current.contains("login") {
            debug!(current = %current, "Already on a login page; skipping redirect");
            return;
        }
        self.inner.navigator.navigate(&target);
    }

    /// Clear both roles' identities unconditionally and return to the root
    ///
    /// Reserved for the case where persisted session data fails to parse:
    /// an unparsable credential blob is treated as tampering, not as a
    /// benign data error.
    pub async fn force_logout(&self) {
        warn!("Forced logout; clearing all persisted session state");
        self.clear_session_state().await;
        self.inner.navigator.navigate("/");
    }

    /// Restore a persisted session on application start
    ///
    /// The active role is determined by which ephemeral token survives.
    /// Cached names are re-sanitized as they re-enter state; context
    /// identifiers were never persisted, so they are re-fetched over the
    /// network before any identifier-dependent operation can run.
    pub async fn restore_session(&self) {
        let role = if self.inner.stores.read(StorageKey::StaffToken).is_some() {
            UserRole::Staff
        } else if self.inner.stores.read(StorageKey::LearnerToken).is_some() {
            UserRole::Learner
        } else {
            debug!("No persisted session to restore");
            return;
        };

        let raw = match self.inner.stores.read(StorageKey::identity_for(role)) {
            Some(raw) => raw,
            None => {
                warn!(%role, "Token present without an identity payload");
                self.force_logout().await;
                return;
            }
        };

        let parsed: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(%role, error = %err, "Persisted identity is not valid JSON");
                self.force_logout().await;
                return;
            }
        };

        let identity: Identity = match serde_json::from_value(sanitize_value(parsed)) {
            Ok(identity) => identity,
            Err(err) => {
                warn!(%role, error = %err, "Persisted identity has an unexpected shape");
                self.force_logout().await;
                return;
            }
        };

        if identity.role() != role {
            warn!(%role, "Persisted identity does not match its storage slot");
            self.force_logout().await;
            return;
        }

        let organization = identity.organization();

        {
            *self.inner.state.write().await = AuthState::Authenticated {
                identity,
                organization: organization.clone(),
            };
        }

        self.inner.context.restore_names().await;
        self.start_expiry_monitor();
        info!(%role, "Session restored");

        if organization.is_known() {
            self.inner.context.refresh(&organization.id).await;
        }
    }

    async fn clear_session_state(&self) {
        {
            *self.inner.state.write().await = AuthState::Unauthenticated;
        }
        self.inner.context.reset().await;
        self.inner.stores.clear_tier(TierKind::Ephemeral);
        self.inner.stores.clear_tier(TierKind::Durable);
        // Last, and after every await: when the expiry task itself is the
        // caller, aborting earlier could cancel the clearing mid-flight
        self.stop_expiry_monitor();
    }

    // ========================================
    // Activity and expiry
    // ========================================

    /// Record a user interaction; a no-op while unauthenticated
    pub async fn track_activity(&self) {
        if self.is_authenticated().await {
            self.inner.tracker.touch();
        }
    }

    /// Close the session if the idle limit has elapsed
    ///
    /// Returns whether an auto-logout fired. With no activity record yet
    /// this returns false and mutates nothing.
    pub async fn check_expiry(&self) -> bool {
        if !self.is_authenticated().await {
            return false;
        }
        if !self.inner.tracker.idle_expired() {
            return false;
        }
        self.auto_logout(true).await;
        true
    }

    fn start_expiry_monitor(&self) {
        let mut guard = self
            .inner
            .expiry_task
            .lock()
            .expect("expiry task lock poisoned");
        if let Some(previous) = guard.take() {
            previous.abort();
        }

        let manager = self.clone();
        let period = self.inner.config.expiry_check_interval;
        *guard = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if manager.check_expiry().await {
                    break;
                }
            }
        }));
    }

    fn stop_expiry_monitor(&self) {
        if let Some(handle) = self
            .inner
            .expiry_task
            .lock()
            .expect("expiry task lock poisoned")
            .take()
        {
            handle.abort();
        }
    }

    // ========================================
    // Accessors
    // ========================================

    pub async fn is_authenticated(&self) -> bool {
        matches!(
            *self.inner.state.read().await,
            AuthState::Authenticated { .. }
        )
    }

    /// Role of the active identity, if any
    pub async fn user_role(&self) -> Option<UserRole> {
        match &*self.inner.state.read().await {
            AuthState::Authenticated { identity, .. } => Some(identity.role()),
            _ => None,
        }
    }

    /// Snapshot of the active identity
    pub async fn current_identity(&self) -> Option<Identity> {
        match &*self.inner.state.read().await {
            AuthState::Authenticated { identity, .. } => Some(identity.clone()),
            _ => None,
        }
    }

    /// Organization scope of the active identity
    pub async fn organization(&self) -> Option<Organization> {
        match &*self.inner.state.read().await {
            AuthState::Authenticated { organization, .. } => Some(organization.clone()),
            _ => None,
        }
    }

    /// Bearer token of the active identity
    pub async fn auth_token(&self) -> Option<String> {
        self.current_identity()
            .await
            .map(|identity| identity.token().to_string())
    }

    /// Header map for authenticated backend calls
    pub async fn auth_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        if let Some(token) = self.auth_token().await {
            headers.insert("Authorization".to_string(), format!("Bearer {}", token));
        }
        headers
    }

    /// Snapshot of the academic context cache
    pub async fn current_academic_context(&self) -> AcademicContext {
        self.inner.context.current().await
    }

    /// Re-fetch the active academic context for the current organization
    ///
    /// Best-effort: network failures keep the cached values and return
    /// `None`.
    pub async fn refresh_active_academic_info(&self) -> Option<AcademicContext> {
        let organization = self.organization().await?;
        if !organization.is_known() {
            return None;
        }
        self.inner.context.refresh(&organization.id).await
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        if let Some(handle) = self
            .expiry_task
            .lock()
            .expect("expiry task lock poisoned")
            .take()
        {
            handle.abort();
        }
    }
}
