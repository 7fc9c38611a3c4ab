//! Session lifecycle integration tests
//!
//! Exercise the manager end to end against in-memory tiers, a scripted
//! backend API, a recording navigator, and a manually driven clock.

use async_trait::async_trait;
use campus_session::prelude::*;
use campus_session::{
    LoginRequest, ManualClock, Navigator, SessionApi, SessionStores, StorageKey,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted backend: queued login and context replies, recorded requests
#[derive(Default)]
struct ScriptedApi {
    login_replies: Mutex<VecDeque<SessionResult<Value>>>,
    context_replies: Mutex<VecDeque<SessionResult<Value>>>,
    login_requests: Mutex<Vec<(UserRole, LoginRequest)>>,
}

impl ScriptedApi {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn queue_login(&self, reply: SessionResult<Value>) {
        self.login_replies.lock().unwrap().push_back(reply);
    }

    fn queue_context(&self, reply: SessionResult<Value>) {
        self.context_replies.lock().unwrap().push_back(reply);
    }

    fn recorded_logins(&self) -> Vec<(UserRole, LoginRequest)> {
        self.login_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionApi for ScriptedApi {
    async fn login(&self, role: UserRole, request: &LoginRequest) -> SessionResult<Value> {
        self.login_requests
            .lock()
            .unwrap()
            .push((role, request.clone()));
        self.login_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SessionError::network("no login reply queued")))
    }

    async fn active_context(&self, _organization_id: &str) -> SessionResult<Value> {
        self.context_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SessionError::network("no context reply queued")))
    }
}

/// Navigator that records every navigation
#[derive(Default)]
struct RecordingNavigator {
    current: Mutex<String>,
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            current: Mutex::new("/dashboard".to_string()),
            visits: Mutex::new(Vec::new()),
        })
    }

    fn set_current(&self, path: &str) {
        *self.current.lock().unwrap() = path.to_string();
    }

    fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        *self.current.lock().unwrap() = path.to_string();
        self.visits.lock().unwrap().push(path.to_string());
    }

    fn current_path(&self) -> String {
        self.current.lock().unwrap().clone()
    }
}

struct Harness {
    manager: SessionManager,
    stores: SessionStores,
    api: Arc<ScriptedApi>,
    navigator: Arc<RecordingNavigator>,
    clock: Arc<ManualClock>,
}

fn harness() -> Harness {
    let stores = SessionStores::in_memory();
    let api = ScriptedApi::new();
    let navigator = RecordingNavigator::new();
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let manager = SessionManager::with_clock(
        SessionConfig::default(),
        stores.clone(),
        api.clone(),
        navigator.clone(),
        clock.clone(),
    );

    Harness {
        manager,
        stores,
        api,
        navigator,
        clock,
    }
}

fn staff_login_body(token: &str) -> Value {
    json!({
        "success": true,
        "token": token,
        "id": "st-1",
        "displayName": "A. Teacher",
        "organizationCode": "SPR",
        "organizationName": "Springfield High",
        "organizationId": "17",
        "roleDetails": {"role": "registrar"}
    })
}

fn learner_login_body(token: &str) -> Value {
    json!({
        "success": true,
        "token": token,
        "id": "ln-1",
        "displayName": "B. Learner",
        "organizationCode": "SPR",
        "organizationName": "Springfield High",
        "organizationId": "17"
    })
}

fn context_body() -> Value {
    json!({
        "activeYear": "2025-2026",
        "activeTermId": "t-3",
        "activeTermName": "Autumn Term",
        "activeSectionId": "s-9",
        "activeSectionName": "Section B"
    })
}

// Let spawned refresh tasks run
async fn settle() {
    tokio::time::sleep(Duration::from_millis(25)).await;
}

#[tokio::test]
async fn staff_login_populates_state_and_context() {
    let h = harness();
    h.api.queue_login(Ok(staff_login_body("tok-staff")));
    h.api.queue_context(Ok(context_body()));

    let identity = h
        .manager
        .login(UserRole::Staff, " SPR ", "ateacher", "hunter2!")
        .await
        .unwrap();

    assert!(h.manager.is_authenticated().await);
    assert_eq!(h.manager.user_role().await, Some(UserRole::Staff));
    assert_eq!(identity.organization_id(), "17");
    assert_eq!(
        h.manager.auth_headers().await.get("Authorization").map(String::as_str),
        Some("Bearer tok-staff")
    );

    // Context identifiers arrive one asynchronous tick later
    settle().await;
    let ctx = h.manager.current_academic_context().await;
    assert_eq!(ctx.term_name.as_deref(), Some("Autumn Term"));
    assert_eq!(ctx.term_id.as_deref(), Some("t-3"));
}

#[tokio::test]
async fn credentials_are_sanitized_but_password_is_verbatim() {
    let h = harness();
    h.api.queue_login(Ok(staff_login_body("tok")));
    h.api.queue_context(Ok(context_body()));

    h.manager
        .login(UserRole::Staff, " SPR<b></b> ", "  ateacher ", "  p@ss<b>word ")
        .await
        .unwrap();

    let recorded = h.api.recorded_logins();
    let (_, request) = &recorded[0];
    assert_eq!(request.organization_code, "SPR");
    assert_eq!(request.username, "ateacher");
    assert_eq!(request.password, "  p@ss<b>word ");
}

#[tokio::test]
async fn second_login_leaves_no_trace_of_the_first() {
    let h = harness();
    h.api.queue_login(Ok(staff_login_body("tok-staff")));
    h.api.queue_context(Ok(context_body()));
    h.manager
        .login(UserRole::Staff, "SPR", "ateacher", "pw")
        .await
        .unwrap();
    settle().await;

    h.api.queue_login(Ok(learner_login_body("tok-learner")));
    h.api.queue_context(Ok(context_body()));
    h.manager
        .login(UserRole::Learner, "SPR", "blearner", "pw")
        .await
        .unwrap();
    settle().await;

    // Session fixation property: nothing of the staff session survives
    assert_eq!(h.stores.read(StorageKey::StaffToken), None);
    assert_eq!(h.stores.read(StorageKey::StaffIdentity), None);
    assert_eq!(
        h.stores.read(StorageKey::LearnerToken).as_deref(),
        Some("tok-learner")
    );
    assert_eq!(h.manager.user_role().await, Some(UserRole::Learner));
}

#[tokio::test]
async fn failed_login_restores_the_unauthenticated_state() {
    let h = harness();
    h.api
        .queue_login(Err(SessionError::authentication("Invalid credentials")));

    let err = h
        .manager
        .login(UserRole::Staff, "SPR", "ateacher", "wrong")
        .await
        .unwrap_err();

    assert!(err.user_message().contains("Invalid credentials"));
    assert!(!h.manager.is_authenticated().await);
    assert_eq!(h.stores.read(StorageKey::StaffToken), None);
    assert_eq!(h.stores.read(StorageKey::OrgId), None);
}

#[tokio::test]
async fn login_reply_without_token_fails_like_bad_credentials() {
    let h = harness();
    h.api.queue_login(Ok(json!({"success": true, "message": "ok"})));

    let err = h
        .manager
        .login(UserRole::Learner, "SPR", "blearner", "pw")
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::MissingToken));
    assert!(!h.manager.is_authenticated().await);
}

#[tokio::test]
async fn logout_is_idempotent() {
    let h = harness();
    h.api.queue_login(Ok(staff_login_body("tok")));
    h.api.queue_context(Ok(context_body()));
    h.manager
        .login(UserRole::Staff, "SPR", "ateacher", "pw")
        .await
        .unwrap();
    settle().await;

    h.manager.logout("/staff/login").await;
    h.manager.logout("/staff/login").await;

    assert!(!h.manager.is_authenticated().await);
    assert_eq!(h.stores.read(StorageKey::StaffToken), None);
    assert_eq!(h.stores.read(StorageKey::OrgCode), None);
    assert_eq!(h.stores.read(StorageKey::ActivityLastSeen), None);
    assert!(h.manager.current_academic_context().await.is_empty());
}

#[tokio::test]
async fn learner_idles_out_after_thirty_one_minutes() {
    let h = harness();
    h.api.queue_login(Ok(learner_login_body("tok-learner")));
    h.api.queue_context(Ok(context_body()));
    h.manager
        .login(UserRole::Learner, "SPR", "blearner", "pw")
        .await
        .unwrap();
    settle().await;

    h.clock.advance(Duration::from_secs(31 * 60));

    assert!(h.manager.check_expiry().await);
    assert!(!h.manager.is_authenticated().await);
    assert_eq!(h.navigator.visits(), vec!["/learner/login".to_string()]);

    // Fires exactly once: a second check has nothing left to close
    assert!(!h.manager.check_expiry().await);
    assert_eq!(h.navigator.visits().len(), 1);
}

#[tokio::test]
async fn expiry_without_an_activity_record_is_inert() {
    let h = harness();
    assert!(!h.manager.check_expiry().await);
    assert!(h.navigator.visits().is_empty());
}

#[tokio::test]
async fn activity_keeps_the_session_alive() {
    let h = harness();
    h.api.queue_login(Ok(learner_login_body("tok")));
    h.api.queue_context(Ok(context_body()));
    h.manager
        .login(UserRole::Learner, "SPR", "blearner", "pw")
        .await
        .unwrap();
    settle().await;

    h.clock.advance(Duration::from_secs(20 * 60));
    h.manager.track_activity().await;
    h.clock.advance(Duration::from_secs(20 * 60));

    // 40 minutes total, but only 20 since the last interaction
    assert!(!h.manager.check_expiry().await);
    assert!(h.manager.is_authenticated().await);
}

#[tokio::test]
async fn auto_logout_skips_navigation_on_a_login_page() {
    let h = harness();
    h.api.queue_login(Ok(staff_login_body("tok")));
    h.api.queue_context(Ok(context_body()));
    h.manager
        .login(UserRole::Staff, "SPR", "ateacher", "pw")
        .await
        .unwrap();
    settle().await;

    h.navigator.set_current("/staff/login");
    h.manager.auto_logout(true).await;

    assert!(!h.manager.is_authenticated().await);
    assert!(h.navigator.visits().is_empty());
}

#[tokio::test]
async fn restore_rebuilds_the_session_and_refetches_identifiers() {
    let h = harness();
    h.api.queue_login(Ok(staff_login_body("tok-staff")));
    h.api.queue_context(Ok(context_body()));
    h.manager
        .login(UserRole::Staff, "SPR", "ateacher", "pw")
        .await
        .unwrap();
    settle().await;

    // Fresh manager over the same tiers simulates a page reload; the
    // identifiers were memory-only and must come back over the network
    let reloaded = SessionManager::with_clock(
        SessionConfig::default(),
        h.stores.clone(),
        h.api.clone(),
        h.navigator.clone(),
        h.clock.clone(),
    );
    h.api.queue_context(Ok(context_body()));

    reloaded.restore_session().await;

    assert!(reloaded.is_authenticated().await);
    assert_eq!(reloaded.user_role().await, Some(UserRole::Staff));
    assert_eq!(reloaded.auth_token().await.as_deref(), Some("tok-staff"));

    let ctx = reloaded.current_academic_context().await;
    assert_eq!(ctx.term_id.as_deref(), Some("t-3"));
    assert_eq!(ctx.section_id.as_deref(), Some("s-9"));
}

#[tokio::test]
async fn corrupt_persisted_identity_forces_a_full_logout() {
    let h = harness();
    h.stores.write(StorageKey::StaffToken, "tok-staff");
    h.stores.write(StorageKey::StaffIdentity, "{not valid json");
    h.stores.write(StorageKey::LearnerToken, "tok-learner");

    h.manager.restore_session().await;

    assert!(!h.manager.is_authenticated().await);
    assert_eq!(h.stores.read(StorageKey::StaffToken), None);
    assert_eq!(h.stores.read(StorageKey::StaffIdentity), None);
    assert_eq!(h.stores.read(StorageKey::LearnerToken), None);
    assert_eq!(h.stores.read(StorageKey::LearnerIdentity), None);
    assert_eq!(h.navigator.visits(), vec!["/".to_string()]);
}

#[tokio::test]
async fn restore_with_no_persisted_session_is_a_no_op() {
    let h = harness();
    h.manager.restore_session().await;

    assert!(!h.manager.is_authenticated().await);
    assert!(h.navigator.visits().is_empty());
}

#[tokio::test]
async fn context_refresh_failure_keeps_previous_values() {
    let h = harness();
    h.api.queue_login(Ok(staff_login_body("tok")));
    h.api.queue_context(Ok(context_body()));
    h.manager
        .login(UserRole::Staff, "SPR", "ateacher", "pw")
        .await
        .unwrap();
    settle().await;

    let before = h.manager.current_academic_context().await;
    h.api
        .queue_context(Err(SessionError::network("connection reset")));

    assert!(h.manager.refresh_active_academic_info().await.is_none());
    assert_eq!(h.manager.current_academic_context().await, before);
}

#[tokio::test]
async fn context_without_section_clears_the_cached_name() {
    let h = harness();
    h.api.queue_login(Ok(staff_login_body("tok")));
    h.api.queue_context(Ok(context_body()));
    h.manager
        .login(UserRole::Staff, "SPR", "ateacher", "pw")
        .await
        .unwrap();
    settle().await;
    assert_eq!(
        h.stores.read(StorageKey::AcademicSectionName).as_deref(),
        Some("Section B")
    );

    h.api.queue_context(Ok(json!({
        "activeYear": "2025-2026",
        "activeTermId": "t-3",
        "activeTermName": "Autumn Term"
    })));
    let ctx = h.manager.refresh_active_academic_info().await.unwrap();

    assert_eq!(ctx.section_name, None);
    assert_eq!(h.stores.read(StorageKey::AcademicSectionName), None);
}
