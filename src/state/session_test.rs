use super::*;
use crate::net::types::ApiError;
use crate::notify::NotificationLog;
use crate::state::domain::SESSION_EXPIRED_MESSAGE;
use crate::state::test_helpers::{
    self, MockApi, application, company_profile, full_user_profile, job, resource, admin_profile,
};
use crate::storage::MemoryStore;

// =============================================================================
// startup
// =============================================================================

#[tokio::test]
async fn startup_without_credentials_only_fetches_jobs() {
    let h = test_helpers::harness(MockApi::new(), MemoryStore::new());
    h.api.push_jobs(Ok(vec![job("j1", "Backend Engineer"), job("j2", "Designer")]));

    h.ctx.startup().await;

    assert_eq!(h.api.calls(), vec!["jobs".to_owned()]);
    assert_eq!(h.ctx.jobs().await.len(), 2);
    for domain in Domain::ALL {
        assert_eq!(h.ctx.phase(domain).await, SessionPhase::Anonymous);
    }
    assert!(h.log.is_empty());
}

#[tokio::test]
async fn startup_with_user_token_loads_profile_applications_and_resources() {
    let h = test_helpers::harness(MockApi::new(), MemoryStore::with_entries([("userToken", "u-tok")]));
    h.api.push_profile(Domain::User, Ok(full_user_profile("u1", "Ann")));
    h.api.push_applications(Ok(vec![application("a1")]));
    h.api.push_resources(Ok(vec![resource("r1", "Interview tips")]));

    h.ctx.startup().await;

    let calls = h.api.calls();
    for expected in ["jobs", "profile:user:u-tok", "applications:u-tok", "resources"] {
        assert!(calls.iter().any(|c| c == expected), "missing call {expected}: {calls:?}");
    }
    assert_eq!(h.ctx.phase(Domain::User).await, SessionPhase::Authenticated);
    assert_eq!(h.ctx.applications().await.len(), 1);
    assert_eq!(h.ctx.resources().await[0].title, "Interview tips");
}

#[tokio::test]
async fn startup_restores_company_and_admin_without_user_data() {
    let store = MemoryStore::with_entries([("companyToken", "c-tok"), ("adminToken", "a-tok")]);
    let h = test_helpers::harness(MockApi::new(), store);
    h.api.push_profile(Domain::Company, Ok(company_profile("c1", "Acme")));
    h.api.push_profile(Domain::Admin, Ok(admin_profile("a1")));

    h.ctx.startup().await;

    assert_eq!(h.api.count("profile:company:c-tok"), 1);
    assert_eq!(h.api.count("profile:admin:a-tok"), 1);
    assert_eq!(h.api.count("applications"), 0);
    assert_eq!(h.api.count("resources"), 0);
    assert_eq!(h.ctx.company().profile().await.unwrap().name, "Acme");
    assert_eq!(h.ctx.phase(Domain::Admin).await, SessionPhase::Authenticated);
    assert_eq!(h.ctx.phase(Domain::User).await, SessionPhase::Anonymous);
}

#[tokio::test]
async fn token_from_login_is_restored_after_restart() {
    let api = Arc::new(MockApi::new());
    let store = Arc::new(MemoryStore::new());
    let log = Arc::new(NotificationLog::new());

    let first = SessionContext::new(api.clone(), store.clone(), log.clone());
    api.push_profile(Domain::Company, Ok(company_profile("c1", "Acme")));
    assert!(first.login(Domain::Company, "c-tok", None).await);
    first.settled().await;
    drop(first);

    api.push_profile(Domain::Company, Ok(company_profile("c1", "Acme Restored")));
    let restarted = SessionContext::start(api.clone(), store.clone(), log.clone()).await;

    assert_eq!(api.count("profile:company:c-tok"), 2);
    assert_eq!(restarted.company().profile().await.unwrap().name, "Acme Restored");
    assert_eq!(restarted.bearer(Domain::Company).await.as_deref(), Some("c-tok"));
}

#[tokio::test]
async fn startup_with_rejected_user_token_signs_out_once() {
    let h = test_helpers::harness(MockApi::new(), MemoryStore::with_entries([("userToken", "stale")]));
    h.api.push_profile(Domain::User, Err(ApiError::Rejected { status: 401 }));
    h.api.push_applications(Err(ApiError::Rejected { status: 401 }));

    h.ctx.startup().await;

    assert_eq!(h.ctx.phase(Domain::User).await, SessionPhase::Anonymous);
    assert!(h.store.get("userToken").is_none());
    assert!(h.ctx.applications().await.is_empty());
    assert_eq!(h.log.messages(), vec![SESSION_EXPIRED_MESSAGE.to_owned()]);
}

#[tokio::test]
async fn startup_job_failure_notifies_but_restores_sessions() {
    let h = test_helpers::harness(MockApi::new(), MemoryStore::with_entries([("adminToken", "a-tok")]));
    h.api.push_jobs(Err(ApiError::Status { status: 500, message: Some("db down".into()) }));
    h.api.push_profile(Domain::Admin, Ok(admin_profile("a1")));

    h.ctx.startup().await;

    assert!(h.ctx.jobs().await.is_empty());
    assert_eq!(h.ctx.phase(Domain::Admin).await, SessionPhase::Authenticated);
    assert_eq!(h.log.messages(), vec!["db down".to_owned()]);
}

// =============================================================================
// shared collections
// =============================================================================

#[tokio::test]
async fn fetch_jobs_twice_yields_same_content() {
    let h = test_helpers::harness(MockApi::new(), MemoryStore::new());
    let listing = vec![job("j1", "Backend Engineer"), job("j2", "Designer")];
    h.api.push_jobs(Ok(listing.clone()));
    h.api.push_jobs(Ok(listing.clone()));

    assert!(h.ctx.fetch_jobs().await);
    let first = h.ctx.jobs().await;
    assert!(h.ctx.fetch_jobs().await);
    let second = h.ctx.jobs().await;

    assert_eq!(first, listing);
    assert_eq!(first, second);
}

#[tokio::test]
async fn fetch_jobs_failure_keeps_previous_list() {
    let h = test_helpers::harness(MockApi::new(), MemoryStore::new());
    h.api.push_jobs(Ok(vec![job("j1", "Backend Engineer")]));
    h.api.push_jobs(Err(ApiError::Request("timeout".into())));

    assert!(h.ctx.fetch_jobs().await);
    assert!(!h.ctx.fetch_jobs().await);

    assert_eq!(h.ctx.jobs().await, vec![job("j1", "Backend Engineer")]);
    assert_eq!(h.log.messages(), vec!["Failed to load jobs".to_owned()]);
}

#[tokio::test]
async fn fetch_resources_failure_is_silent_and_keeps_previous() {
    let h = test_helpers::harness(MockApi::new(), MemoryStore::new());
    h.api.push_resources(Ok(vec![resource("r1", "CV guide")]));
    h.api.push_resources(Err(ApiError::Logical { message: Some("nope".into()) }));

    assert!(h.ctx.fetch_resources().await);
    assert!(!h.ctx.fetch_resources().await);

    assert_eq!(h.ctx.resources().await, vec![resource("r1", "CV guide")]);
    assert!(h.log.is_empty());
}

// =============================================================================
// applications
// =============================================================================

#[tokio::test]
async fn fetch_applications_without_user_makes_no_request() {
    let h = test_helpers::harness(MockApi::new(), MemoryStore::new());

    assert!(!h.ctx.fetch_applications().await);

    assert_eq!(h.api.count("applications"), 0);
    assert!(h.ctx.applications().await.is_empty());
}

#[tokio::test]
async fn fetch_applications_failure_keeps_previous_list() {
    let h = test_helpers::harness(MockApi::new(), MemoryStore::new());
    h.api.push_profile(Domain::User, Ok(full_user_profile("u1", "Ann")));
    h.api.push_applications(Ok(vec![application("a1")]));
    h.api.push_applications(Err(ApiError::Request("reset".into())));
    h.ctx.login(Domain::User, "u-tok", None).await;
    h.ctx.settled().await;

    assert!(h.ctx.fetch_applications().await);
    assert!(!h.ctx.fetch_applications().await);

    assert_eq!(h.ctx.applications().await, vec![application("a1")]);
    assert_eq!(h.log.messages(), vec!["Failed to load applications".to_owned()]);
}

#[tokio::test]
async fn user_logout_drops_applications() {
    let h = test_helpers::harness(MockApi::new(), MemoryStore::new());
    h.api.push_profile(Domain::User, Ok(full_user_profile("u1", "Ann")));
    h.api.push_applications(Ok(vec![application("a1"), application("a2")]));
    h.ctx.login(Domain::User, "u-tok", None).await;
    h.ctx.settled().await;
    h.ctx.fetch_applications().await;

    h.ctx.logout(Domain::User).await;

    assert!(h.ctx.applications().await.is_empty());
    assert!(h.ctx.bearer(Domain::User).await.is_none());
}

#[tokio::test]
async fn applications_hidden_after_profile_rejection() {
    let h = test_helpers::harness(MockApi::new(), MemoryStore::new());
    h.api.push_profile(Domain::User, Ok(full_user_profile("u1", "Ann")));
    h.api.push_applications(Ok(vec![application("a1")]));
    h.api.push_profile(Domain::User, Err(ApiError::Rejected { status: 401 }));
    h.ctx.login(Domain::User, "u-tok", None).await;
    h.ctx.settled().await;
    h.ctx.fetch_applications().await;

    assert!(h.ctx.user().fetch_profile().await.is_none());

    assert!(h.ctx.applications().await.is_empty());
}

#[tokio::test]
async fn applications_read_does_not_mutate() {
    let h = test_helpers::harness(MockApi::new(), MemoryStore::new());
    h.api.push_profile(Domain::User, Ok(full_user_profile("u1", "Ann")));
    h.api.push_applications(Ok(vec![application("a1")]));
    h.ctx.login(Domain::User, "u-tok", None).await;
    h.ctx.settled().await;
    h.ctx.fetch_applications().await;

    assert_eq!(h.ctx.applications().await.len(), 1);
    assert_eq!(h.ctx.applications().await.len(), 1);
    assert_eq!(h.api.count("applications"), 1);
}

#[tokio::test]
async fn applications_of_expired_user_hidden_from_next_login() {
    let h = test_helpers::harness(MockApi::new(), MemoryStore::new());
    h.api.push_profile(Domain::User, Ok(full_user_profile("u1", "Ann")));
    h.api.push_applications(Ok(vec![application("a1")]));
    h.api.push_profile(Domain::User, Err(ApiError::Rejected { status: 401 }));
    h.api.push_profile(Domain::User, Ok(full_user_profile("u2", "Bo")));
    h.ctx.login(Domain::User, "ann-tok", None).await;
    h.ctx.settled().await;
    h.ctx.fetch_applications().await;
    h.ctx.user().fetch_profile().await;

    h.ctx.login(Domain::User, "bo-tok", None).await;
    h.ctx.settled().await;

    assert!(h.ctx.applications().await.is_empty());
}

// =============================================================================
// domain dispatch
// =============================================================================

#[tokio::test]
async fn bearer_and_phase_dispatch_per_domain() {
    let h = test_helpers::harness(MockApi::new(), MemoryStore::new());
    h.api.push_profile(Domain::Admin, Ok(admin_profile("a1")));

    assert!(h.ctx.login(Domain::Admin, "a-tok", None).await);
    h.ctx.settled().await;

    assert_eq!(h.ctx.bearer(Domain::Admin).await.as_deref(), Some("a-tok"));
    assert!(h.ctx.bearer(Domain::User).await.is_none());
    assert!(h.ctx.bearer(Domain::Company).await.is_none());
    assert_eq!(h.ctx.phase(Domain::Admin).await, SessionPhase::Authenticated);

    assert!(h.ctx.logout(Domain::Admin).await);
    assert_eq!(h.ctx.phase(Domain::Admin).await, SessionPhase::Anonymous);
}
