//! Data Transfer Objects for communication with the Qiita server
//!
//! Bodies are kept close to the wire format the server expects; conversion
//! from domain types happens here so the client only deals with ready payloads.

pub mod auth;
pub mod job;
pub mod patch;
