//! Qiita Core
//!
//! Core types shared by the Qiita job client and plugin runtime.
//!
//! This crate contains:
//! - Domain types: jobs and the artifacts they produce
//! - DTOs: request and response bodies exchanged with the Qiita server

pub mod domain;
pub mod dto;
