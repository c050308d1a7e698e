//! rabval core: the pure pipeline over broker definitions documents
//!
//! - [`model`]: typed definitions documents
//! - [`key`]: canonical identity keys
//! - [`failure`]: collect-all / fail-fast failure collection
//! - [`index`]: referential-integrity index
//! - [`relations`]: orphan detection and usage-aware escalation
//! - [`names`]: identifier charset check
//! - [`validate`]: the whole validation pipeline
//! - [`diff`]: identity-keyed diff and its presentation
//! - [`apply`]: replaying a diff onto a document
//!
//! Nothing here performs I/O; fetching and deploying live in `rabval-engine`.

pub mod apply;
pub mod config;
pub mod diff;
pub mod errors;
pub mod failure;
pub mod ignore;
pub mod index;
pub mod key;
pub mod logging_facility;
pub mod model;
pub mod names;
pub mod relations;
pub mod validate;

pub use apply::{apply_diff, ApplyOptions};
pub use config::{RabvalConfig, UnusedThresholds};
pub use diff::{compute_diff, DefinitionsDiff};
pub use errors::{ExError, ExErrorKind, RabvalError, Result};
pub use failure::{CheckMode, Failure, FailureKind, FailureList};
pub use ignore::{IgnoreList, IgnoreRule};
pub use index::Index;
pub use key::Resource;
pub use model::{AnyResource, Category, Definitions};
pub use relations::UsageRecord;
pub use validate::{validate, ValidationReport};
