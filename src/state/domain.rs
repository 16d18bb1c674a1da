//! One identity domain's session: credential, profile, and loading state.
//!
//! ARCHITECTURE
//! ============
//! `AuthDomain<P>` is written once and instantiated three times (user,
//! company, admin). The domain name, storage key, and endpoints all come
//! from [`Domain`]; the profile type comes from [`DomainProfile`].
//!
//! STATE MACHINE
//! =============
//! `Anonymous` -> `Authenticating` happens when a credential is set (login
//! or restore at startup) and a profile fetch is opened in the same write.
//! A successful fetch moves to `Authenticated`; logout or a rejected
//! credential moves back to `Anonymous`.
//!
//! CONCURRENCY
//! ===========
//! Overlapping profile fetches are allowed. An in-flight counter drives
//! `loading()`; a fetch opened while another is in flight does not report
//! its own failure. A rejected credential is announced once, by whichever
//! response clears it. The last response to resolve wins, except that a
//! response for a credential that is no longer current is discarded.

#[cfg(test)]
#[path = "domain_test.rs"]
mod domain_test;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Map;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::net::api::JobBoardApi;
use crate::net::types::{
    AdminProfile, ApiError, BasicProfile, CompanyProfile, Domain, ProfileRecord, UserProfile, UserRef,
};
use crate::notify::{Notification, Notifier};
use crate::storage::CredentialStore;

pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";
pub const LOGIN_FAILED_MESSAGE: &str = "Login failed. Please try again.";

// =============================================================================
// PROFILE TYPES
// =============================================================================

/// Binds a profile type to the identity domain it belongs to.
pub trait DomainProfile: Clone + Send + Sync + 'static {
    const DOMAIN: Domain;

    /// Optimistic profile built from login-response fields.
    fn from_basic(basic: BasicProfile) -> Self;

    /// Extract this domain's profile from a decoded record.
    fn from_record(record: ProfileRecord) -> Option<Self>;
}

impl DomainProfile for UserProfile {
    const DOMAIN: Domain = Domain::User;

    fn from_basic(basic: BasicProfile) -> Self {
        Self { user_id: Some(UserRef::Populated(basic)), extra: Map::new() }
    }

    fn from_record(record: ProfileRecord) -> Option<Self> {
        match record {
            ProfileRecord::User(p) => Some(p),
            _ => None,
        }
    }
}

impl DomainProfile for CompanyProfile {
    const DOMAIN: Domain = Domain::Company;

    fn from_basic(basic: BasicProfile) -> Self {
        Self { id: basic.id, name: basic.name, email: basic.email, extra: basic.extra }
    }

    fn from_record(record: ProfileRecord) -> Option<Self> {
        match record {
            ProfileRecord::Company(p) => Some(p),
            _ => None,
        }
    }
}

impl DomainProfile for AdminProfile {
    const DOMAIN: Domain = Domain::Admin;

    fn from_basic(basic: BasicProfile) -> Self {
        Self { id: basic.id, name: basic.name, email: basic.email, extra: basic.extra }
    }

    fn from_record(record: ProfileRecord) -> Option<Self> {
        match record {
            ProfileRecord::Admin(p) => Some(p),
            _ => None,
        }
    }
}

// =============================================================================
// SLOT
// =============================================================================

/// Observable lifecycle phase of a domain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionPhase {
    /// No credential.
    #[default]
    Anonymous,
    /// Credential present, authoritative profile not (yet) loaded.
    Authenticating,
    /// Credential and profile both present, no fetch in flight.
    Authenticated,
}

#[derive(Debug)]
struct Slot<P> {
    credential: Option<String>,
    profile: Option<P>,
}

impl<P> Default for Slot<P> {
    fn default() -> Self {
        Self { credential: None, profile: None }
    }
}

impl<P> Slot<P> {
    fn phase(&self, in_flight: usize) -> SessionPhase {
        match (&self.credential, &self.profile) {
            (None, _) => SessionPhase::Anonymous,
            (Some(_), Some(_)) if in_flight == 0 => SessionPhase::Authenticated,
            (Some(_), _) => SessionPhase::Authenticating,
        }
    }

    fn clear(&mut self) {
        self.credential = None;
        self.profile = None;
    }
}

/// A profile fetch counted in the domain's in-flight total.
///
/// The count is released when the ticket drops, so a caller abandoning
/// `fetch_profile` mid-request still clears `loading()`.
#[derive(Debug)]
pub(crate) struct FetchTicket {
    token: String,
    quiet: bool,
    in_flight: Arc<AtomicUsize>,
}

impl FetchTicket {
    /// Count a fetch against `slot`'s credential. Call with the slot locked.
    fn open<P>(slot: &Slot<P>, in_flight: &Arc<AtomicUsize>) -> Option<Self> {
        let token = slot.credential.clone()?;
        let quiet = in_flight.fetch_add(1, Ordering::SeqCst) > 0;
        Some(Self { token, quiet, in_flight: Arc::clone(in_flight) })
    }
}

impl Drop for FetchTicket {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

// =============================================================================
// AUTH DOMAIN
// =============================================================================

pub struct AuthDomain<P> {
    domain: Domain,
    api: Arc<dyn JobBoardApi>,
    store: Arc<dyn CredentialStore>,
    notifier: Arc<dyn Notifier>,
    slot: RwLock<Slot<P>>,
    in_flight: Arc<AtomicUsize>,
    refreshes: Mutex<Vec<JoinHandle<()>>>,
}

impl<P: DomainProfile> AuthDomain<P> {
    #[must_use]
    pub fn new(api: Arc<dyn JobBoardApi>, store: Arc<dyn CredentialStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            domain: P::DOMAIN,
            api,
            store,
            notifier,
            slot: RwLock::new(Slot::default()),
            in_flight: Arc::new(AtomicUsize::new(0)),
            refreshes: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Current bearer credential.
    pub async fn credential(&self) -> Option<String> {
        self.slot.read().await.credential.clone()
    }

    /// Current profile. Always `None` while the credential is absent.
    pub async fn profile(&self) -> Option<P> {
        let slot = self.slot.read().await;
        slot.credential.as_ref()?;
        slot.profile.clone()
    }

    /// True while at least one profile fetch is in flight.
    #[must_use]
    pub fn loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub async fn phase(&self) -> SessionPhase {
        let slot = self.slot.read().await;
        slot.phase(self.in_flight.load(Ordering::SeqCst))
    }

    /// Persist `token`, set it as the credential, show `basic` immediately,
    /// and refresh the profile in the background.
    ///
    /// Returns `false` (with both credential and profile cleared) if the
    /// token cannot be persisted.
    pub async fn login(self: &Arc<Self>, token: &str, basic: Option<BasicProfile>) -> bool {
        let token = token.trim();
        if let Err(error) = self.store.save(self.domain.storage_key(), token) {
            tracing::warn!(domain = %self.domain, %error, "login failed to persist credential");
            self.clear().await;
            self.notifier.notify(Notification::error(LOGIN_FAILED_MESSAGE));
            return false;
        }

        let ticket = {
            let mut slot = self.slot.write().await;
            slot.credential = Some(token.to_owned());
            slot.profile = basic.map(P::from_basic);
            FetchTicket::open(&slot, &self.in_flight)
        };
        tracing::info!(domain = %self.domain, "logged in");

        if let Some(ticket) = ticket {
            self.spawn_refresh(ticket);
        }
        true
    }

    /// Fetch the authoritative profile for the current credential.
    ///
    /// Without a credential this returns `None` and issues no request.
    pub async fn fetch_profile(&self) -> Option<P> {
        let ticket = {
            let slot = self.slot.write().await;
            FetchTicket::open(&slot, &self.in_flight)?
        };
        self.complete_fetch(ticket).await
    }

    /// Best-effort server logout, then an unconditional local clear.
    ///
    /// Returns whether the backend acknowledged the logout; the local
    /// session is gone either way.
    pub async fn logout(&self) -> bool {
        let acknowledged = match self.credential().await {
            Some(token) => match self.api.logout(self.domain, &token).await {
                Ok(()) => true,
                Err(error) => {
                    tracing::debug!(domain = %self.domain, %error, "server logout failed; clearing locally");
                    false
                }
            },
            None => false,
        };
        self.clear().await;
        tracing::info!(domain = %self.domain, "logged out");
        self.notifier.notify(Notification::success("Logged out successfully"));
        acknowledged
    }

    /// Wait for every background refresh started by `login`.
    pub async fn settled(&self) {
        let handles = std::mem::take(&mut *self.refreshes.lock().unwrap_or_else(PoisonError::into_inner));
        for handle in handles {
            if let Err(error) = handle.await {
                tracing::warn!(domain = %self.domain, %error, "profile refresh task failed");
            }
        }
    }

    /// Load the persisted credential, opening a profile fetch if present.
    pub(crate) async fn restore(&self) -> Option<FetchTicket> {
        let token = match self.store.load(self.domain.storage_key()) {
            Ok(token) => token.filter(|t| !t.trim().is_empty())?,
            Err(error) => {
                tracing::warn!(domain = %self.domain, %error, "could not read persisted credential");
                return None;
            }
        };
        tracing::debug!(domain = %self.domain, "restored persisted credential");
        let mut slot = self.slot.write().await;
        slot.credential = Some(token);
        slot.profile = None;
        FetchTicket::open(&slot, &self.in_flight)
    }

    /// Resolve an opened fetch against the backend.
    pub(crate) async fn complete_fetch(&self, ticket: FetchTicket) -> Option<P> {
        tracing::debug!(domain = %self.domain, "fetching profile");
        let result = self.api.profile(self.domain, &ticket.token).await.and_then(|record| {
            let got = record.domain();
            P::from_record(record)
                .ok_or_else(|| ApiError::Decode(format!("expected {} profile, got {got}", self.domain)))
        });

        let mut slot = self.slot.write().await;
        let current = slot.credential.as_deref() == Some(ticket.token.as_str());
        let token = ticket.token.clone();
        let quiet = ticket.quiet;
        drop(ticket);

        match result {
            Ok(profile) if current => {
                slot.profile = Some(profile.clone());
                tracing::debug!(domain = %self.domain, "profile loaded");
                Some(profile)
            }
            Ok(_) => {
                tracing::debug!(domain = %self.domain, "discarding profile for superseded credential");
                None
            }
            Err(error) if error.is_auth_rejection() => {
                drop(slot);
                self.expire(&token).await;
                None
            }
            Err(error) => {
                tracing::warn!(domain = %self.domain, %error, code = error.error_code(), "profile fetch failed");
                if current {
                    slot.profile = None;
                }
                drop(slot);
                if !quiet {
                    self.notifier.notify(Notification::error(error.user_message("Failed to load profile")));
                }
                None
            }
        }
    }

    /// Force the domain anonymous because `token` was rejected.
    ///
    /// Only the call that actually clears the credential announces the
    /// expiry, so overlapping rejections produce a single notification.
    /// No-op if a different credential is current by now.
    pub(crate) async fn expire(&self, token: &str) {
        tracing::warn!(domain = %self.domain, "credential rejected");
        {
            let mut slot = self.slot.write().await;
            if slot.credential.as_deref() != Some(token) {
                return;
            }
            slot.clear();
        }
        self.forget_persisted();
        self.notifier.notify(Notification::error(SESSION_EXPIRED_MESSAGE));
    }

    async fn clear(&self) {
        self.slot.write().await.clear();
        self.forget_persisted();
    }

    fn forget_persisted(&self) {
        if let Err(error) = self.store.remove(self.domain.storage_key()) {
            tracing::warn!(domain = %self.domain, %error, "could not remove persisted credential");
        }
    }

    fn spawn_refresh(self: &Arc<Self>, ticket: FetchTicket) {
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let _ = this.complete_fetch(ticket).await;
        });
        let mut refreshes = self.refreshes.lock().unwrap_or_else(PoisonError::into_inner);
        refreshes.retain(|h| !h.is_finished());
        refreshes.push(handle);
    }
}
