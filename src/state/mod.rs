//! Session state shared by every page.
//!
//! SYSTEM CONTEXT
//! ==============
//! `domain` implements one identity domain's lifecycle; `session` composes
//! three of them with the shared collections and the startup sequence.

pub mod domain;
pub mod session;

#[cfg(test)]
#[path = "test_helpers.rs"]
pub(crate) mod test_helpers;

pub use domain::{AuthDomain, DomainProfile, SessionPhase};
pub use session::SessionContext;
