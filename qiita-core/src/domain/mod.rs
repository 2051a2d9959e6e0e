//! Core domain types
//!
//! These types describe what a job is and what it produces. They are created
//! by the client (job info) or by command functions (artifacts) and never
//! persisted locally.

pub mod artifact;
pub mod job;
