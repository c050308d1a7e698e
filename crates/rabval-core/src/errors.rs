use crate::model::Category;
use thiserror::Error;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling, testing, and machine-readable CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Document shape
    /// The document does not have the shape of a definitions export
    StructuralError,
    /// A diff entry cannot be read as a resource of its category
    InvalidResource,

    // Referential integrity
    DuplicateResource,
    MissingReference,
    InvalidBindingArguments,
    UnusedResource,

    // Reconciliation
    /// A diff does not fit the document it is applied to
    DiffConflict,
    /// A single management API call failed during deploy
    DeployOperation,

    // Configuration
    InvalidConfig,

    // Integration/IO
    Io,
    Serialization,
    ExternalService,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::StructuralError => "ERR_STRUCTURAL",
            ExErrorKind::InvalidResource => "ERR_INVALID_RESOURCE",
            ExErrorKind::DuplicateResource => "ERR_DUPLICATE_RESOURCE",
            ExErrorKind::MissingReference => "ERR_MISSING_REFERENCE",
            ExErrorKind::InvalidBindingArguments => "ERR_INVALID_BINDING_ARGUMENTS",
            ExErrorKind::UnusedResource => "ERR_UNUSED_RESOURCE",
            ExErrorKind::DiffConflict => "ERR_DIFF_CONFLICT",
            ExErrorKind::DeployOperation => "ERR_DEPLOY_OPERATION",
            ExErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::ExternalService => "ERR_EXTERNAL_SERVICE",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries the classification used for programmatic handling plus the
/// resource context (category + identity) an operator needs to reconcile a
/// broker by hand.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    category: Option<Category>,
    identity: Option<String>,
    path: Option<Vec<String>>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            category: None,
            identity: None,
            path: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add the resource category
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Add the resource identity key
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Add a structural path into the document
    pub fn with_path(mut self, path: Vec<String>) -> Self {
        self.path = Some(path);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn path(&self) -> Option<&[String]> {
        self.path.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(path) = &self.path {
            write!(f, " (at: {})", path.join("."))?;
        }
        if let Some(category) = self.category {
            write!(f, " (category: {})", category)?;
        }
        if let Some(identity) = &self.identity {
            write!(f, " (identity: {})", identity)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Domain errors raised outside the collect-all validation passes
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RabvalError {
    /// The document could not be read as a definitions export
    #[error("Invalid definitions document: {reason}")]
    InvalidDocument { reason: String },

    /// A diff entry could not be read as a resource of its category
    #[error("Invalid {category} entry in diff: {object}")]
    InvalidDiffEntry { category: Category, object: String },

    /// Two entries of one category share an identity, so diffing is refused
    #[error("Duplicate {category} identity {identity}: diff refused")]
    DuplicateIdentity { category: Category, identity: String },

    /// Apply tried to add an identity the base already contains
    #[error("Cannot add {category} {identity}: already present")]
    AlreadyPresent { category: Category, identity: String },

    /// Apply tried to remove or replace an identity the base lacks
    #[error("Cannot modify {category} {identity}: not present")]
    NotPresent { category: Category, identity: String },

    /// A configuration value could not be parsed or is out of range
    #[error("Invalid configuration {key}={value}: {reason}")]
    InvalidConfig {
        key: String,
        value: String,
        reason: String,
    },

    /// An ignore rule is malformed
    #[error("Invalid ignore rule #{position}: {reason}")]
    InvalidIgnoreRule { position: usize, reason: String },
}

impl From<RabvalError> for ExError {
    fn from(err: RabvalError) -> Self {
        let message = err.to_string();
        match err {
            RabvalError::InvalidDocument { .. } => {
                ExError::new(ExErrorKind::StructuralError).with_message(message)
            }
            RabvalError::InvalidDiffEntry { category, .. } => {
                ExError::new(ExErrorKind::InvalidResource)
                    .with_category(category)
                    .with_message(message)
            }
            RabvalError::DuplicateIdentity { category, identity } => {
                ExError::new(ExErrorKind::DuplicateResource)
                    .with_category(category)
                    .with_identity(identity)
                    .with_message(message)
            }
            RabvalError::AlreadyPresent { category, identity }
            | RabvalError::NotPresent { category, identity } => {
                ExError::new(ExErrorKind::DiffConflict)
                    .with_category(category)
                    .with_identity(identity)
                    .with_message(message)
            }
            RabvalError::InvalidConfig { .. } | RabvalError::InvalidIgnoreRule { .. } => {
                ExError::new(ExErrorKind::InvalidConfig).with_message(message)
            }
        }
    }
}

impl From<std::io::Error> for ExError {
    fn from(err: std::io::Error) -> Self {
        ExError::new(ExErrorKind::Io).with_message(err.to_string())
    }
}

impl From<serde_json::Error> for ExError {
    fn from(err: serde_json::Error) -> Self {
        ExError::new(ExErrorKind::Serialization).with_message(err.to_string())
    }
}
