//! Process-wide session and shared-data context.
//!
//! SYSTEM CONTEXT
//! ==============
//! Page-level code reads identity state and shared collections from here
//! and performs its own page-specific calls with the bearer credential it
//! gets from [`SessionContext::bearer`]. The context owns:
//! - three [`AuthDomain`]s (user, company, admin)
//! - the public job list and informational resources
//! - the signed-in user's applications
//!
//! ERROR HANDLING
//! ==============
//! Nothing here returns `Err`. Fetches resolve to `bool` and report
//! failures through the notifier; resources are non-critical and only log.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::Arc;

use tokio::sync::RwLock;

use super::domain::{AuthDomain, SessionPhase};
use crate::net::api::JobBoardApi;
use crate::net::types::{AdminProfile, Application, BasicProfile, CompanyProfile, Domain, Job, Resource, UserProfile};
use crate::notify::{Notification, Notifier};
use crate::storage::CredentialStore;

pub struct SessionContext {
    api: Arc<dyn JobBoardApi>,
    notifier: Arc<dyn Notifier>,
    user: Arc<AuthDomain<UserProfile>>,
    company: Arc<AuthDomain<CompanyProfile>>,
    admin: Arc<AuthDomain<AdminProfile>>,
    jobs: RwLock<Vec<Job>>,
    resources: RwLock<Vec<Resource>>,
    /// Applications together with the user credential they were fetched for.
    applications: RwLock<Option<(String, Vec<Application>)>>,
}

impl SessionContext {
    /// Build an idle context. Nothing is read or fetched until [`SessionContext::startup`].
    #[must_use]
    pub fn new(
        api: Arc<dyn JobBoardApi>,
        store: Arc<dyn CredentialStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        Arc::new(Self {
            user: Arc::new(AuthDomain::new(api.clone(), store.clone(), notifier.clone())),
            company: Arc::new(AuthDomain::new(api.clone(), store.clone(), notifier.clone())),
            admin: Arc::new(AuthDomain::new(api.clone(), store, notifier.clone())),
            api,
            notifier,
            jobs: RwLock::new(Vec::new()),
            resources: RwLock::new(Vec::new()),
            applications: RwLock::new(None),
        })
    }

    /// Build a context and run the startup sequence.
    pub async fn start(
        api: Arc<dyn JobBoardApi>,
        store: Arc<dyn CredentialStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        let ctx = Self::new(api, store, notifier);
        ctx.startup().await;
        ctx
    }

    /// Restore persisted credentials and load what they gate.
    ///
    /// The job list is always fetched. Each domain with a saved credential
    /// refreshes its profile; the user domain also loads applications and
    /// resources. Everything runs concurrently.
    pub async fn startup(&self) {
        let user = self.user.restore().await;
        let company = self.company.restore().await;
        let admin = self.admin.restore().await;
        tracing::debug!(
            user = user.is_some(),
            company = company.is_some(),
            admin = admin.is_some(),
            "restored credentials"
        );

        let user_side = async move {
            if let Some(ticket) = user {
                tokio::join!(self.user.complete_fetch(ticket), self.fetch_applications(), self.fetch_resources());
            }
        };
        let company_side = async move {
            if let Some(ticket) = company {
                self.company.complete_fetch(ticket).await;
            }
        };
        let admin_side = async move {
            if let Some(ticket) = admin {
                self.admin.complete_fetch(ticket).await;
            }
        };
        tokio::join!(self.fetch_jobs(), user_side, company_side, admin_side);
        tracing::info!("session startup complete");
    }

    // =========================================================================
    // DOMAINS
    // =========================================================================

    #[must_use]
    pub fn user(&self) -> &Arc<AuthDomain<UserProfile>> {
        &self.user
    }

    #[must_use]
    pub fn company(&self) -> &Arc<AuthDomain<CompanyProfile>> {
        &self.company
    }

    #[must_use]
    pub fn admin(&self) -> &Arc<AuthDomain<AdminProfile>> {
        &self.admin
    }

    /// Bearer credential for page-level calls made on behalf of `domain`.
    pub async fn bearer(&self, domain: Domain) -> Option<String> {
        match domain {
            Domain::User => self.user.credential().await,
            Domain::Company => self.company.credential().await,
            Domain::Admin => self.admin.credential().await,
        }
    }

    pub async fn phase(&self, domain: Domain) -> SessionPhase {
        match domain {
            Domain::User => self.user.phase().await,
            Domain::Company => self.company.phase().await,
            Domain::Admin => self.admin.phase().await,
        }
    }

    pub async fn login(&self, domain: Domain, token: &str, basic: Option<BasicProfile>) -> bool {
        match domain {
            Domain::User => self.user.login(token, basic).await,
            Domain::Company => self.company.login(token, basic).await,
            Domain::Admin => self.admin.login(token, basic).await,
        }
    }

    /// Log `domain` out. Logging the user out also drops their applications.
    pub async fn logout(&self, domain: Domain) -> bool {
        match domain {
            Domain::User => {
                let acknowledged = self.user.logout().await;
                *self.applications.write().await = None;
                acknowledged
            }
            Domain::Company => self.company.logout().await,
            Domain::Admin => self.admin.logout().await,
        }
    }

    /// Wait for background profile refreshes in every domain.
    pub async fn settled(&self) {
        tokio::join!(self.user.settled(), self.company.settled(), self.admin.settled());
    }

    // =========================================================================
    // SHARED COLLECTIONS
    // =========================================================================

    pub async fn jobs(&self) -> Vec<Job> {
        self.jobs.read().await.clone()
    }

    pub async fn resources(&self) -> Vec<Resource> {
        self.resources.read().await.clone()
    }

    /// The user's applications. Empty unless they were fetched for the
    /// credential that is current now.
    pub async fn applications(&self) -> Vec<Application> {
        let Some(current) = self.user.credential().await else {
            return Vec::new();
        };
        match &*self.applications.read().await {
            Some((owner, applications)) if *owner == current => applications.clone(),
            _ => Vec::new(),
        }
    }

    /// Replace the job list. On failure the previous list is kept.
    pub async fn fetch_jobs(&self) -> bool {
        match self.api.list_jobs().await {
            Ok(jobs) => {
                tracing::debug!(count = jobs.len(), "jobs loaded");
                *self.jobs.write().await = jobs;
                true
            }
            Err(error) => {
                tracing::warn!(%error, code = error.error_code(), "job fetch failed");
                self.notifier.notify(Notification::error(error.user_message("Failed to load jobs")));
                false
            }
        }
    }

    /// Replace the resource list. Failures are logged only.
    pub async fn fetch_resources(&self) -> bool {
        match self.api.list_resources().await {
            Ok(resources) => {
                tracing::debug!(count = resources.len(), "resources loaded");
                *self.resources.write().await = resources;
                true
            }
            Err(error) => {
                tracing::warn!(%error, code = error.error_code(), "resource fetch failed");
                false
            }
        }
    }

    /// Replace the signed-in user's applications.
    ///
    /// Without a user credential the list is cleared and no request is made.
    /// A rejected credential signs the user out.
    pub async fn fetch_applications(&self) -> bool {
        let Some(token) = self.user.credential().await else {
            *self.applications.write().await = None;
            return false;
        };
        match self.api.user_applications(&token).await {
            Ok(applications) => {
                if self.user.credential().await.as_deref() != Some(token.as_str()) {
                    tracing::debug!("discarding applications for superseded credential");
                    return false;
                }
                tracing::debug!(count = applications.len(), "applications loaded");
                *self.applications.write().await = Some((token, applications));
                true
            }
            Err(error) if error.is_auth_rejection() => {
                self.user.expire(&token).await;
                *self.applications.write().await = None;
                false
            }
            Err(error) => {
                tracing::warn!(%error, code = error.error_code(), "application fetch failed");
                self.notifier.notify(Notification::error(error.user_message("Failed to load applications")));
                false
            }
        }
    }
}
