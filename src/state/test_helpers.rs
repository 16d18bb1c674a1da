//! Scripted backend and fixtures shared by the state tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use serde_json::Map;
use tokio::sync::Notify;

use crate::net::api::JobBoardApi;
use crate::net::types::{
    AdminProfile, ApiError, Application, BasicProfile, CompanyProfile, Domain, Job, ProfileRecord, Resource,
    UserProfile, UserRef,
};
use crate::notify::NotificationLog;
use crate::storage::MemoryStore;

use super::session::SessionContext;

struct Scripted<T> {
    result: Result<T, ApiError>,
    gate: Option<Arc<Notify>>,
}

/// `JobBoardApi` that replays queued responses and records every call.
///
/// Empty queues fall back to empty collections, an acknowledged logout, and
/// a transport error for profiles.
#[derive(Default)]
pub struct MockApi {
    jobs: Mutex<VecDeque<Result<Vec<Job>, ApiError>>>,
    resources: Mutex<VecDeque<Result<Vec<Resource>, ApiError>>>,
    applications: Mutex<VecDeque<Result<Vec<Application>, ApiError>>>,
    profiles: Mutex<HashMap<Domain, VecDeque<Scripted<ProfileRecord>>>>,
    logouts: Mutex<HashMap<Domain, VecDeque<Result<(), ApiError>>>>,
    calls: Mutex<Vec<String>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_jobs(&self, result: Result<Vec<Job>, ApiError>) {
        self.jobs.lock().unwrap().push_back(result);
    }

    pub fn push_resources(&self, result: Result<Vec<Resource>, ApiError>) {
        self.resources.lock().unwrap().push_back(result);
    }

    pub fn push_applications(&self, result: Result<Vec<Application>, ApiError>) {
        self.applications.lock().unwrap().push_back(result);
    }

    pub fn push_profile(&self, domain: Domain, result: Result<ProfileRecord, ApiError>) {
        self.profiles
            .lock()
            .unwrap()
            .entry(domain)
            .or_default()
            .push_back(Scripted { result, gate: None });
    }

    /// Queue a profile response that is held until the returned gate is notified.
    pub fn push_gated_profile(&self, domain: Domain, result: Result<ProfileRecord, ApiError>) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.profiles
            .lock()
            .unwrap()
            .entry(domain)
            .or_default()
            .push_back(Scripted { result, gate: Some(Arc::clone(&gate)) });
        gate
    }

    pub fn push_logout(&self, domain: Domain, result: Result<(), ApiError>) {
        self.logouts
            .lock()
            .unwrap()
            .entry(domain)
            .or_default()
            .push_back(result);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl JobBoardApi for MockApi {
    async fn list_jobs(&self) -> Result<Vec<Job>, ApiError> {
        self.record("jobs".into());
        self.jobs.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()))
    }

    async fn list_resources(&self) -> Result<Vec<Resource>, ApiError> {
        self.record("resources".into());
        self.resources.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()))
    }

    async fn user_applications(&self, token: &str) -> Result<Vec<Application>, ApiError> {
        self.record(format!("applications:{token}"));
        self.applications.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()))
    }

    async fn profile(&self, domain: Domain, token: &str) -> Result<ProfileRecord, ApiError> {
        self.record(format!("profile:{domain}:{token}"));
        let scripted = self
            .profiles
            .lock()
            .unwrap()
            .get_mut(&domain)
            .and_then(VecDeque::pop_front);
        let Some(scripted) = scripted else {
            return Err(ApiError::Request("no scripted profile".into()));
        };
        if let Some(gate) = scripted.gate {
            gate.notified().await;
        }
        scripted.result
    }

    async fn logout(&self, domain: Domain, token: &str) -> Result<(), ApiError> {
        self.record(format!("logout:{domain}:{token}"));
        self.logouts
            .lock()
            .unwrap()
            .get_mut(&domain)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(()))
    }
}

// =============================================================================
// FIXTURES
// =============================================================================

pub fn basic(id: &str, name: &str, email: &str) -> BasicProfile {
    BasicProfile { id: id.into(), name: name.into(), email: email.into(), extra: Map::new() }
}

pub fn job(id: &str, title: &str) -> Job {
    Job { id: id.into(), title: title.into(), company: None, location: None, job_type: None, extra: Map::new() }
}

pub fn resource(id: &str, title: &str) -> Resource {
    Resource { id: id.into(), title: title.into(), extra: Map::new() }
}

pub fn application(id: &str) -> Application {
    Application { id: id.into(), job: None, status: Some("pending".into()), extra: Map::new() }
}

pub fn full_user_profile(id: &str, name: &str) -> ProfileRecord {
    let mut extra = Map::new();
    extra.insert("headline".into(), serde_json::json!("Rust developer"));
    ProfileRecord::User(UserProfile { user_id: Some(UserRef::Populated(basic(id, name, "full@x.com"))), extra })
}

pub fn company_profile(id: &str, name: &str) -> ProfileRecord {
    ProfileRecord::Company(CompanyProfile { id: id.into(), name: name.into(), email: String::new(), extra: Map::new() })
}

pub fn admin_profile(id: &str) -> ProfileRecord {
    ProfileRecord::Admin(AdminProfile { id: id.into(), name: "Root".into(), email: String::new(), extra: Map::new() })
}

pub struct Harness {
    pub api: Arc<MockApi>,
    pub store: Arc<MemoryStore>,
    pub log: Arc<NotificationLog>,
    pub ctx: Arc<SessionContext>,
}

/// Build a context over `api` and `store` without running startup.
pub fn harness(api: MockApi, store: MemoryStore) -> Harness {
    let api = Arc::new(api);
    let store = Arc::new(store);
    let log = Arc::new(NotificationLog::new());
    let ctx = SessionContext::new(api.clone(), store.clone(), log.clone());
    Harness { api, store, log, ctx }
}
