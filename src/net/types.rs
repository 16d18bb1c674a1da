//! Wire DTOs, the response envelope, and network-boundary errors.
//!
//! DESIGN
//! ======
//! Every backend response is wrapped as `{ success, message?, <key>: ... }`.
//! Payloads are decoded into explicit types here so a schema mismatch
//! surfaces as `ApiError::Decode` instead of leaking untyped JSON into the
//! session context. Unknown fields ride along in flattened `extra` maps so
//! entities pass through to page code unmodified.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced at the backend boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (connect, timeout, body read).
    #[error("request failed: {0}")]
    Request(String),

    /// The backend rejected the presented credential (401 or 403).
    #[error("credential rejected: status {status}")]
    Rejected { status: u16 },

    /// The backend returned a non-success status other than a rejection.
    #[error("request failed with status {status}")]
    Status { status: u16, message: Option<String> },

    /// Well-formed envelope with `success` not equal to `true`.
    #[error("request unsuccessful: {}", message.as_deref().unwrap_or("no message"))]
    Logical { message: Option<String> },

    /// The payload did not match the expected schema.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ApiError {
    /// Whether this error means the credential is invalid or expired.
    #[must_use]
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// Server-supplied message when present, else `fallback`.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Status { message: Some(m), .. } | Self::Logical { message: Some(m) } if !m.trim().is_empty() => {
                m.clone()
            }
            _ => fallback.to_owned(),
        }
    }

    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Request(_) => "E_REQUEST",
            Self::Rejected { .. } => "E_REJECTED",
            Self::Status { .. } => "E_STATUS",
            Self::Logical { .. } => "E_LOGICAL",
            Self::Decode(_) => "E_DECODE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    /// Whether the caller may reasonably try the same request again.
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Status { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// IDENTITY DOMAIN
// =============================================================================

/// One of the three independent actor types with their own session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Domain {
    User,
    Company,
    Admin,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::User, Domain::Company, Domain::Admin];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Company => "company",
            Self::Admin => "admin",
        }
    }

    /// Key under which this domain's credential is persisted.
    #[must_use]
    pub fn storage_key(self) -> &'static str {
        match self {
            Self::User => "userToken",
            Self::Company => "companyToken",
            Self::Admin => "adminToken",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "company" => Ok(Self::Company),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown domain '{other}' (expected user, company or admin)")),
        }
    }
}

// =============================================================================
// ENVELOPE
// =============================================================================

/// Generic `{ success, message?, ... }` response wrapper.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Envelope {
    /// Parse a response body. Non-object bodies are a decode error.
    pub fn parse(body: &str) -> Result<Self, ApiError> {
        serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Fail with `Logical` unless `success` is exactly `true`.
    pub fn ensure_success(self) -> Result<Self, ApiError> {
        if self.success {
            Ok(self)
        } else {
            Err(ApiError::Logical { message: self.message })
        }
    }

    /// Take and decode the payload stored under `key`.
    pub fn take<T: DeserializeOwned>(&mut self, key: &str) -> Result<T, ApiError> {
        let raw = self
            .payload
            .remove(key)
            .ok_or_else(|| ApiError::Decode(format!("missing `{key}` in response")))?;
        serde_json::from_value(raw).map_err(|e| ApiError::Decode(format!("`{key}`: {e}")))
    }
}

// =============================================================================
// SHARED COLLECTIONS
// =============================================================================

/// Company fields embedded in a job when the backend populates the reference.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanySummary {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reference to a company: either populated or a bare id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompanyRef {
    Populated(CompanySummary),
    Id(String),
}

/// A job posting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<CompanyRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Employment type, e.g. `"Full-time"`.
    #[serde(default, rename = "jobType", skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Job {
    /// Display name of the posting company, if populated.
    #[must_use]
    pub fn company_name(&self) -> Option<&str> {
        match &self.company {
            Some(CompanyRef::Populated(company)) => company.name.as_deref(),
            _ => None,
        }
    }
}

/// An informational resource (articles, guides).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reference to a job from an application: populated or a bare id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobRef {
    Populated(Box<Job>),
    Id(String),
}

/// A candidate's application to a job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Application {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<JobRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// PROFILES
// =============================================================================

/// Identity fields a login response may carry. Anything else the backend
/// sends for the account is kept in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicProfile {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Owning account of a candidate profile: populated or a bare id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Populated(BasicProfile),
    Id(String),
}

/// Candidate profile. The owning account is nested under `userId`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    /// Populated account fields, if the backend expanded `userId`.
    #[must_use]
    pub fn account(&self) -> Option<&BasicProfile> {
        match &self.user_id {
            Some(UserRef::Populated(account)) => Some(account),
            _ => None,
        }
    }
}

/// Company account profile.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Administrator profile.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminProfile {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A decoded profile tagged with the domain it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub enum ProfileRecord {
    User(UserProfile),
    Company(CompanyProfile),
    Admin(AdminProfile),
}

impl ProfileRecord {
    #[must_use]
    pub fn domain(&self) -> Domain {
        match self {
            Self::User(_) => Domain::User,
            Self::Company(_) => Domain::Company,
            Self::Admin(_) => Domain::Admin,
        }
    }
}
