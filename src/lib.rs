//! Client-side session and shared-data layer for a job board with three
//! independent identity domains (job seekers, companies, administrators).
//!
//! ARCHITECTURE
//! ============
//! - `net`: wire types and the backend API seam
//! - `storage`: persisted bearer tokens
//! - `notify`: user-visible toasts
//! - `state`: per-domain auth lifecycle and the process-wide context
//! - `listing`: search and pagination over the held job list
//! - `config`: environment-driven settings

pub mod config;
pub mod listing;
pub mod net;
pub mod notify;
pub mod state;
pub mod storage;

pub use config::{ConfigError, SessionConfig};
pub use net::api::{HttpApi, JobBoardApi};
pub use net::types::{ApiError, Domain};
pub use state::{AuthDomain, SessionContext, SessionPhase};
