pub const PROJECT_NAME: &str = "simrunner";

pub mod config;
pub mod error;
pub mod executor;
pub mod harvester;
pub mod hooks;
pub mod job;
pub mod scheduler;
pub mod utils;
pub mod validator;
pub mod workspace;

pub use config::{BatchConfig, BatchName, Markers, RunSettings};
pub use error::{ConfigError, Error};
pub use hooks::{HookRegistry, JobContext};
pub use job::Job;
pub use scheduler::{Batch, BatchReport, Concurrency, JobReport, JobStatus};
pub use validator::{validate, ValidatedConfig};
pub use workspace::{Workspace, WorkspaceManager};
