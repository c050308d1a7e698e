//! Canonical event names for structured logging
//!
//! The op boundary macros emit these as the `event` field, so log consumers
//! and the test capture layer agree on them.

pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
