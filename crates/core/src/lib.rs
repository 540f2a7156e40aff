pub mod domain;
pub mod error;

pub use domain::context::ProjectContext;
pub use domain::results::{
    ArchitectureSpec, CodebaseSpec, DeploymentSpec, ModuleSpec, RequirementsSpec, ResultStatus,
    ReviewReport,
};
pub use domain::role::AgentRole;
pub use domain::stage::{Stage, GENERATION_STAGES};
pub use error::CoreError;
