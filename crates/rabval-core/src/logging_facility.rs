//! Structured logging for rabval
//!
//! - One initialization point, `init(profile)`
//! - Operation boundary macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - An in-memory capture layer for asserting on events in tests
//!
//! Validation warnings (orphaned or lightly unused resources) are plain
//! `tracing::warn!` events and need no macro.
//!
//! ```rust
//! use rabval_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
