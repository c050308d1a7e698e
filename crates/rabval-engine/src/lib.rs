//! rabval engine - broker-facing orchestration
//!
//! Everything that talks to a live broker or to the filesystem lives here:
//! the management API client, deploy planning and execution, and resolution
//! of definitions inputs that may be files or broker URLs. The pure checks
//! and transformations stay in `rabval-core`.

pub mod deploy;
pub mod management;
pub mod resolve;

pub use deploy::{
    deploy, plan_deploy, DeployOptions, DeployPlan, DeployReport, Operation, OperationKind,
    OperationOutcome, OperationStatus, SkippedChange,
};
pub use management::{HttpManagementClient, ManagementApi};
pub use resolve::{
    load_ignore_list, load_usage, read_definitions, resolve_definitions, write_definitions,
    DefinitionsSource,
};
