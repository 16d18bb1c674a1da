//! REST calls against the job-board backend.
//!
//! ARCHITECTURE
//! ============
//! `JobBoardApi` is the seam the session context talks through. `HttpApi`
//! is the reqwest implementation; tests substitute a scripted mock. Every
//! method decodes into typed payloads so the context never sees raw JSON.
//!
//! ERROR HANDLING
//! ==============
//! 401/403 on an authenticated request become `ApiError::Rejected`; other
//! non-2xx become `ApiError::Status`; a 2xx envelope without
//! `success: true` becomes `ApiError::Logical`. One attempt per call.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;

use super::types::{
    AdminProfile, ApiError, Application, CompanyProfile, Domain, Envelope, Job, ProfileRecord, Resource, UserProfile,
};
use crate::config::SessionConfig;

pub const JOBS_PATH: &str = "/api/jobs";
pub const RESOURCES_PATH: &str = "/api/resources";
pub const USER_APPLICATIONS_PATH: &str = "/api/users/applications";

/// Profile endpoint for an identity domain.
#[must_use]
pub fn profile_path(domain: Domain) -> &'static str {
    match domain {
        Domain::User => "/api/users/profile",
        Domain::Company => "/api/companies/company",
        Domain::Admin => "/api/admin/profile",
    }
}

/// Logout endpoint for an identity domain.
#[must_use]
pub fn logout_path(domain: Domain) -> &'static str {
    match domain {
        Domain::User => "/api/auth/users/logout",
        Domain::Company => "/api/auth/companies/logout",
        Domain::Admin => "/api/auth/admin/logout",
    }
}

/// Envelope key carrying the profile payload for a domain.
#[must_use]
pub fn profile_key(domain: Domain) -> &'static str {
    match domain {
        Domain::User => "profile",
        Domain::Company => "company",
        Domain::Admin => "admin",
    }
}

fn bearer_value(token: &str) -> String {
    format!("Bearer {token}")
}

// =============================================================================
// SEAM
// =============================================================================

/// Backend operations used by the session context.
#[async_trait::async_trait]
pub trait JobBoardApi: Send + Sync {
    /// Public job listing.
    async fn list_jobs(&self) -> Result<Vec<Job>, ApiError>;

    /// Public informational resources.
    async fn list_resources(&self) -> Result<Vec<Resource>, ApiError>;

    /// Applications submitted by the authenticated user.
    async fn user_applications(&self, token: &str) -> Result<Vec<Application>, ApiError>;

    /// Authoritative profile for `domain`.
    async fn profile(&self, domain: Domain, token: &str) -> Result<ProfileRecord, ApiError>;

    /// Server-side session invalidation for `domain`.
    async fn logout(&self, domain: Domain, token: &str) -> Result<(), ApiError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

/// reqwest-backed [`JobBoardApi`].
#[derive(Clone)]
pub struct HttpApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    /// Build a client from session config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &SessionConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.api_base_url.clone() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(&self, request: reqwest::RequestBuilder, path: &str) -> Result<Envelope, ApiError> {
        let response = request.send().await.map_err(|e| ApiError::Request(e.to_string()))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| ApiError::Request(e.to_string()))?;
        tracing::debug!(%path, status = status.as_u16(), "backend response");
        envelope_from_response(status, &body)
    }

    async fn get(&self, path: &str, token: Option<&str>) -> Result<Envelope, ApiError> {
        let mut request = self.http.get(self.url(path));
        if let Some(token) = token {
            request = request.header(reqwest::header::AUTHORIZATION, bearer_value(token));
        }
        self.send(request, path).await
    }

    async fn post(&self, path: &str, token: &str) -> Result<Envelope, ApiError> {
        let request = self
            .http
            .post(self.url(path))
            .header(reqwest::header::AUTHORIZATION, bearer_value(token));
        self.send(request, path).await
    }

    /// Unauthenticated page-level read returning the whole envelope payload.
    ///
    /// # Errors
    ///
    /// Same taxonomy as the typed calls.
    pub async fn get_public(&self, path: &str) -> Result<Value, ApiError> {
        let envelope = self.get(path, None).await?;
        Ok(Value::Object(envelope.payload))
    }

    /// Bearer-authenticated page-level read returning the whole envelope payload.
    ///
    /// # Errors
    ///
    /// Same taxonomy as the typed calls.
    pub async fn get_authorized(&self, path: &str, token: &str) -> Result<Value, ApiError> {
        let envelope = self.get(path, Some(token)).await?;
        Ok(Value::Object(envelope.payload))
    }
}

/// Map a raw HTTP response onto the envelope/error taxonomy.
fn envelope_from_response(status: StatusCode, body: &str) -> Result<Envelope, ApiError> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ApiError::Rejected { status: status.as_u16() });
    }
    if !status.is_success() {
        let message = Envelope::parse(body).ok().and_then(|e| e.message);
        return Err(ApiError::Status { status: status.as_u16(), message });
    }
    Envelope::parse(body)?.ensure_success()
}

fn decode_profile(domain: Domain, mut envelope: Envelope) -> Result<ProfileRecord, ApiError> {
    let key = profile_key(domain);
    Ok(match domain {
        Domain::User => ProfileRecord::User(envelope.take::<UserProfile>(key)?),
        Domain::Company => ProfileRecord::Company(envelope.take::<CompanyProfile>(key)?),
        Domain::Admin => ProfileRecord::Admin(envelope.take::<AdminProfile>(key)?),
    })
}

#[async_trait::async_trait]
impl JobBoardApi for HttpApi {
    async fn list_jobs(&self) -> Result<Vec<Job>, ApiError> {
        self.get(JOBS_PATH, None).await?.take("jobs")
    }

    async fn list_resources(&self) -> Result<Vec<Resource>, ApiError> {
        self.get(RESOURCES_PATH, None).await?.take("resources")
    }

    async fn user_applications(&self, token: &str) -> Result<Vec<Application>, ApiError> {
        self.get(USER_APPLICATIONS_PATH, Some(token))
            .await?
            .take("applications")
    }

    async fn profile(&self, domain: Domain, token: &str) -> Result<ProfileRecord, ApiError> {
        let envelope = self.get(profile_path(domain), Some(token)).await?;
        decode_profile(domain, envelope)
    }

    async fn logout(&self, domain: Domain, token: &str) -> Result<(), ApiError> {
        self.post(logout_path(domain), token).await.map(|_| ())
    }
}
