use std::{path::PathBuf, process::ExitStatus};
use thiserror::Error;

/// One variant per preflight check, in the order the checks run.
#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("root folder does not exist: {0:?}")]
	RootMissing(PathBuf),

	#[error("template folder does not exist: {0:?}")]
	TemplateMissing(PathBuf),

	#[error("no *.{extension} project file found in template folder {path:?}")]
	NoProjectMarker { path: PathBuf, extension: String },

	#[error("executable not found: {0:?}")]
	ExecutableMissing(PathBuf),

	#[error("executable is not a runnable file: {0:?}")]
	ExecutableNotInvocable(PathBuf),

	#[error("could not read folder {path:?}")]
	FolderUnreadable {
		#[source]
		source: std::io::Error,
		path: PathBuf,
	},

	#[error("job folder does not exist: {0:?}")]
	JobSourceMissing(PathBuf),

	#[error("no *.{extension} job files found in job folder {path:?}")]
	NoJobFiles { path: PathBuf, extension: String },

	#[error("could not create results folder {path:?}")]
	ResultsUncreatable {
		#[source]
		source: std::io::Error,
		path: PathBuf,
	},

	#[error("invalid batch name `{name}`: {reason}")]
	InvalidName { name: String, reason: &'static str },
}

/// The primary error type for everything that happens inside a batch.
#[derive(Error, Debug)]
pub enum Error {
	#[error(transparent)]
	Config(#[from] ConfigError),

	#[error("workspace operation failed on {path:?}")]
	Workspace {
		#[source]
		source: std::io::Error,
		path: PathBuf,
	},

	#[error("could not stage {input:?} into the workspace")]
	Staging {
		#[source]
		source: std::io::Error,
		input: PathBuf,
	},

	#[error("could not launch {executable:?}")]
	Spawn {
		#[source]
		source: std::io::Error,
		executable: PathBuf,
	},

	#[error("simulation of {input:?} exited abnormally ({status})")]
	Execution { input: PathBuf, status: ExitStatus },

	#[error("could not harvest artifact {artifact:?}")]
	Harvest {
		#[source]
		source: std::io::Error,
		artifact: PathBuf,
	},

	#[error("hook failed for {input:?}")]
	Hook {
		#[source]
		source: anyhow::Error,
		input: PathBuf,
	},

	#[error("batch-completion hook failed")]
	BatchHook(#[source] anyhow::Error),

	#[error("{failed} of {total} jobs failed")]
	BatchFailed { failed: usize, total: usize },

	#[error("could not build worker pool")]
	ThreadPool(#[from] rayon::ThreadPoolBuildError),

	#[error(transparent)]
	Io(#[from] std::io::Error),
}
