use std::{
	fs, io,
	path::{Path, PathBuf},
	process::{Command, ExitStatus},
	time::{Duration, Instant},
};

use crate::{error::Error, job::Job, utils::fs::copy_preserving, validator::ValidatedConfig, workspace::Workspace};

/// How a single simulator invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionOutcome {
	pub status: ExitStatus,
	pub elapsed: Duration,
}

impl ExecutionOutcome {
	pub fn success(&self) -> bool {
		self.status.success()
	}

	/// `None` when the process was terminated by a signal.
	pub fn code(&self) -> Option<i32> {
		self.status.code()
	}
}

/// Stages a job into a workspace and runs the simulator on it.
#[derive(Debug, Clone)]
pub struct JobExecutor {
	executable: PathBuf,
	strict: bool,
}

impl JobExecutor {
	pub fn new(config: &ValidatedConfig) -> Self {
		Self {
			executable: config.executable().to_path_buf(),
			strict: config.settings().strict,
		}
	}

	/// Copies the input in, runs `<executable> <staged input>` from inside the workspace and
	/// removes the staged copy again, whatever the simulator did.
	///
	/// An abnormal exit is only an error in strict mode; otherwise it is logged and handed to
	/// the per-job hook through the returned outcome.
	#[tracing::instrument(level = "debug", skip_all, fields(job = %job.input().display()))]
	pub fn run(&self, workspace: &Workspace, job: &Job) -> Result<ExecutionOutcome, Error> {
		let staged = self.stage(workspace, job)?;
		let result = self.invoke(workspace, &staged);

		if let Err(e) = fs::remove_file(&staged) {
			tracing::warn!("could not remove staged input {}: {}", staged.display(), e);
		}

		let outcome = result?;
		if !outcome.success() {
			if self.strict {
				return Err(Error::Execution {
					input: job.input().to_path_buf(),
					status: outcome.status,
				});
			}
			tracing::warn!("simulation of {} exited abnormally ({})", job.input().display(), outcome.status);
		}
		Ok(outcome)
	}

	fn stage(&self, workspace: &Workspace, job: &Job) -> Result<PathBuf, Error> {
		let staging_error = |source| Error::Staging {
			source,
			input: job.input().to_path_buf(),
		};

		let file_name = job
			.input()
			.file_name()
			.ok_or_else(|| staging_error(io::Error::new(io::ErrorKind::InvalidInput, "job input has no file name")))?;
		let staged = workspace.join(file_name);
		copy_preserving(job.input(), &staged).map_err(staging_error)?;
		tracing::debug!("staged {} into {}", job.input().display(), workspace.display());
		Ok(staged)
	}

	fn invoke(&self, workspace: &Path, staged: &Path) -> Result<ExecutionOutcome, Error> {
		let started = Instant::now();
		let output = Command::new(&self.executable)
			.arg(staged)
			.current_dir(workspace)
			.output()
			.map_err(|source| Error::Spawn {
				source,
				executable: self.executable.clone(),
			})?;
		let elapsed = started.elapsed();

		let stdout = String::from_utf8_lossy(&output.stdout);
		if !stdout.trim().is_empty() {
			tracing::debug!(stream = "stdout", "{}", stdout.trim_end());
		}
		let stderr = String::from_utf8_lossy(&output.stderr);
		if !stderr.trim().is_empty() {
			tracing::debug!(stream = "stderr", "{}", stderr.trim_end());
		}

		tracing::debug!(?elapsed, status = %output.status, "simulator finished");
		Ok(ExecutionOutcome {
			status: output.status,
			elapsed,
		})
	}
}
