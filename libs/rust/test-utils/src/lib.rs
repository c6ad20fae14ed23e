//! Shared test utilities for cms-gateway Rust libraries.
//!
//! This crate provides:
//! - Proptest generators for request ids, statuses and metadata trees
//! - A scripted HTTP transport and a capturing logger
//! - Test fixtures with sample CMS payloads

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mocks;

pub use generators::*;
pub use mocks::{RecordedRequest, ScriptedTransport, capture_logger};
