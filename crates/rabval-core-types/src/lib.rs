//! Core types shared across rabval facilities
//!
//! This crate provides foundational types used by both error handling
//! and logging facilities:
//!
//! - **Correlation types**: RunId tagging every event of one deploy run
//! - **Sensitive data**: Sensitive<T> marker for credential redaction
//! - **Schema constants**: Canonical event names

pub mod correlation;
pub mod schema;
pub mod sensitive;

pub use correlation::RunId;
pub use sensitive::Sensitive;
