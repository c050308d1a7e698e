//! Definitions diff
//!
//! ```ignore
//! use rabval_core::diff::{compute_diff, DiffSummary};
//!
//! let diff = compute_diff(&live, &desired, &IgnoreList::default())?;
//! println!("{}", DiffSummary::default().render(&diff));
//! ```
//!
//! - Identity decides added/deleted vs changed; content decides changed vs
//!   unchanged. JSON objects compare without regard to key order, arrays in
//!   order.
//! - A side with duplicate identities is refused outright.
//! - Lists keep document order: deleted and changed follow `before`, added
//!   follows `after`.

pub mod engine;
pub mod model;
pub mod summary;

pub use engine::{compute_diff, compute_diff_values};
pub use model::{Change, ChangeSet, DefinitionsDiff, ResourceSet};
pub use summary::{render_totals, DiffSummary};
