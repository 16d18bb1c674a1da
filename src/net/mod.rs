//! Networking: the backend seam and its wire schema.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` holds the `JobBoardApi` trait and its reqwest implementation;
//! `types` defines the envelope, entities, and `ApiError`.

pub mod api;
pub mod types;
