//! Failure collection shared by every validation stage
//!
//! A check either passes silently or produces a [`Failure`]. In
//! [`CheckMode::CollectAll`] failures are recorded and the pass continues so
//! one run reports every defect; in [`CheckMode::FailFast`] the first failure
//! is recorded and [`Halt`] is returned so the caller unwinds with `?`.

use crate::errors::ExErrorKind;
use serde::Serialize;

/// How a validation pass reacts to a failing check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckMode {
    FailFast,
    #[default]
    CollectAll,
}

/// Classification of a single finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    Structural,
    InvalidResource,
    DuplicateResource,
    MissingReference,
    MissingSourceExchange,
    MissingDestination,
    InvalidBindingArguments,
    OrphanedResource,
    UnusedResource,
    DeployOperation,
}

impl FailureKind {
    /// Error-facility kind this finding reports under
    pub fn error_kind(&self) -> ExErrorKind {
        match self {
            FailureKind::Structural => ExErrorKind::StructuralError,
            FailureKind::InvalidResource => ExErrorKind::InvalidResource,
            FailureKind::DuplicateResource => ExErrorKind::DuplicateResource,
            FailureKind::MissingReference
            | FailureKind::MissingSourceExchange
            | FailureKind::MissingDestination
            | FailureKind::OrphanedResource => ExErrorKind::MissingReference,
            FailureKind::InvalidBindingArguments => ExErrorKind::InvalidBindingArguments,
            FailureKind::UnusedResource => ExErrorKind::UnusedResource,
            FailureKind::DeployOperation => ExErrorKind::DeployOperation,
        }
    }
}

/// One failed check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<String>>,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            path: None,
        }
    }

    pub fn at(mut self, path: Vec<String>) -> Self {
        self.path = Some(path);
        self
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) if !path.is_empty() => write!(f, "At {}: {}", path.join("."), self.message),
            _ => f.write_str(&self.message),
        }
    }
}

/// Marker returned by a failing check in fail-fast mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Halt;

/// Accumulates failures and warnings for one pass
#[derive(Debug, Default)]
pub struct FailureCollector {
    mode: CheckMode,
    failures: Vec<Failure>,
    warnings: Vec<Failure>,
}

impl FailureCollector {
    pub fn new(mode: CheckMode) -> Self {
        Self {
            mode,
            failures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Record `failure` unless `ok` holds
    ///
    /// The failure is only built when the check fails.
    pub fn ensure(&mut self, ok: bool, failure: impl FnOnce() -> Failure) -> Result<(), Halt> {
        if ok {
            return Ok(());
        }
        self.fail(failure())
    }

    /// Record a failure unconditionally
    pub fn fail(&mut self, failure: Failure) -> Result<(), Halt> {
        self.failures.push(failure);
        match self.mode {
            CheckMode::FailFast => Err(Halt),
            CheckMode::CollectAll => Ok(()),
        }
    }

    /// Record a warning; warnings never halt a pass
    pub fn warn(&mut self, warning: Failure) {
        tracing::warn!(kind = ?warning.kind, "{}", warning);
        self.warnings.push(warning);
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn warnings(&self) -> &[Failure] {
        &self.warnings
    }

    pub fn into_failures(self) -> Vec<Failure> {
        self.failures
    }

    pub fn into_parts(self) -> (Vec<Failure>, Vec<Failure>) {
        (self.failures, self.warnings)
    }
}

/// Ordered failures, rendered as a numbered list
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct FailureList(pub Vec<Failure>);

impl FailureList {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Failure> {
        self.0.iter()
    }
}

impl From<Vec<Failure>> for FailureList {
    fn from(failures: Vec<Failure>) -> Self {
        Self(failures)
    }
}

impl std::fmt::Display for FailureList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (idx, failure) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{}. {}", idx + 1, failure)?;
        }
        Ok(())
    }
}
