use std::{
	any::Any,
	panic::{self, AssertUnwindSafe},
	path::PathBuf,
	time::{Duration, Instant},
};

use anyhow::anyhow;

use rayon::prelude::*;

use crate::{
	config::{BatchConfig, BatchName},
	error::Error,
	executor::JobExecutor,
	harvester::Harvester,
	hooks::{HookRegistry, JobContext},
	job::Job,
	validator::{validate, ValidatedConfig},
	workspace::{Workspace, WorkspaceManager},
	PROJECT_NAME,
};

/// How the jobs of a batch are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concurrency {
	/// One workspace, jobs in discovery order on the calling thread.
	Sequential,
	/// A fixed pool of `workers` threads, one fresh workspace per job.
	Parallel { workers: usize },
}

impl Concurrency {
	/// `None` or `0` runs sequentially, a positive count sizes the pool and a negative one
	/// asks for the platform default.
	pub fn from_request(request: Option<i64>) -> Self {
		match request {
			None | Some(0) => Self::Sequential,
			Some(n) if n > 0 => Self::Parallel { workers: n as usize },
			Some(_) => Self::Parallel { workers: num_cpus::get() },
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
	/// The simulator ran and the per-job hook returned successfully.
	Completed { exit_code: Option<i32>, success: bool },
	Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
	pub job: Job,
	pub workspace: PathBuf,
	pub status: JobStatus,
}

impl JobReport {
	pub fn is_failure(&self) -> bool {
		matches!(self.status, JobStatus::Failed { .. })
	}
}

/// Handed to the batch-completion hook and returned from [`Batch::run`].
#[derive(Debug, Clone)]
pub struct BatchReport {
	pub batch: BatchName,
	pub concurrency: Concurrency,
	/// In job order, regardless of the order jobs finished in.
	pub jobs: Vec<JobReport>,
	pub elapsed: Duration,
}

impl BatchReport {
	pub fn total(&self) -> usize {
		self.jobs.len()
	}

	pub fn failed(&self) -> usize {
		self.jobs.iter().filter(|r| r.is_failure()).count()
	}

	/// Jobs whose simulator exited abnormally but were still handed to the hook.
	pub fn abnormal(&self) -> usize {
		self.jobs
			.iter()
			.filter(|r| matches!(r.status, JobStatus::Completed { success: false, .. }))
			.count()
	}
}

/// The per-run collaborators, built once from the validated configuration.
struct Pipeline {
	workspaces: WorkspaceManager,
	executor: JobExecutor,
	harvester: Harvester,
}

/// A validated batch together with its hooks.
#[derive(Debug)]
pub struct Batch {
	config: ValidatedConfig,
	hooks: HookRegistry,
}

impl Batch {
	pub fn new(config: ValidatedConfig) -> Self {
		Self {
			config,
			hooks: HookRegistry::default(),
		}
	}

	/// Runs the preflight checks and builds the batch.
	pub fn from_config(config: &BatchConfig) -> Result<Self, Error> {
		Ok(Self::new(validate(config)?))
	}

	pub fn config(&self) -> &ValidatedConfig {
		&self.config
	}

	pub fn hooks_mut(&mut self) -> &mut HookRegistry {
		&mut self.hooks
	}

	/// The job files, sorted by name. Discovered again on every call.
	pub fn jobs(&self) -> Result<Vec<Job>, Error> {
		Ok(Job::discover(self.config.jobs(), &self.config.markers().job)?)
	}

	pub fn run(&self, concurrency: Option<i64>) -> Result<BatchReport, Error> {
		self.run_with(Concurrency::from_request(concurrency))
	}

	/// Runs every job once, then the batch-completion hook.
	///
	/// Sequentially, the first job that cannot be staged or executed (or, in strict mode,
	/// exits abnormally) aborts the batch. In parallel such jobs are recorded as failed and
	/// the remaining jobs still run; strict mode then turns any failure into
	/// [`Error::BatchFailed`] once the batch hook has run.
	pub fn run_with(&self, concurrency: Concurrency) -> Result<BatchReport, Error> {
		self.run_jobs(&self.jobs()?, concurrency)
	}

	/// Like [`Batch::run_with`], for a job list the caller already discovered.
	#[tracing::instrument(level = "info", skip(self, jobs), fields(batch = %self.config.name()))]
	pub fn run_jobs(&self, jobs: &[Job], concurrency: Concurrency) -> Result<BatchReport, Error> {
		let started = Instant::now();
		let pipeline = Pipeline {
			workspaces: WorkspaceManager::new(&self.config)?,
			executor: JobExecutor::new(&self.config),
			harvester: Harvester::new(&self.config),
		};
		tracing::info!(jobs = jobs.len(), ?concurrency, "starting batch");

		let reports = match concurrency {
			Concurrency::Sequential => self.run_sequential(&pipeline, jobs)?,
			Concurrency::Parallel { workers } => self.run_parallel(&pipeline, jobs, workers)?,
		};

		let report = BatchReport {
			batch: self.config.name().clone(),
			concurrency,
			jobs: reports,
			elapsed: started.elapsed(),
		};
		tracing::info!(
			total = report.total(),
			failed = report.failed(),
			abnormal = report.abnormal(),
			elapsed = ?report.elapsed,
			"batch finished"
		);

		self.hooks.batch_complete(&report).map_err(Error::BatchHook)?;

		if self.config.settings().strict && report.failed() > 0 {
			return Err(Error::BatchFailed {
				failed: report.failed(),
				total: report.total(),
			});
		}
		Ok(report)
	}

	fn run_sequential(&self, pipeline: &Pipeline, jobs: &[Job]) -> Result<Vec<JobReport>, Error> {
		let path = pipeline.workspaces.reserve_next();
		let recycled = if self.config.settings().recycle_workspace {
			Some(pipeline.workspaces.acquire_at(path.clone())?)
		} else {
			None
		};

		let mut reports = Vec::with_capacity(jobs.len());
		for job in jobs {
			self.announce(job);
			let status = match &recycled {
				Some(workspace) => {
					let status = self.process(pipeline, workspace, job)?;
					workspace.clear_transient(pipeline.workspaces.template())?;
					status
				}
				None => {
					let workspace = pipeline.workspaces.acquire_at(path.clone())?;
					let status = self.process(pipeline, &workspace, job)?;
					workspace.release()?;
					status
				}
			};
			reports.push(JobReport {
				job: job.clone(),
				workspace: path.clone(),
				status,
			});
		}

		if let Some(workspace) = recycled {
			workspace.release()?;
		}
		Ok(reports)
	}

	fn run_parallel(&self, pipeline: &Pipeline, jobs: &[Job], workers: usize) -> Result<Vec<JobReport>, Error> {
		let pool = rayon::ThreadPoolBuilder::new()
			.num_threads(workers.max(1))
			.thread_name(|i| format!("{PROJECT_NAME}-worker-{i}"))
			.build()?;

		Ok(pool.install(|| jobs.par_iter().map(|job| self.run_isolated(pipeline, job)).collect()))
	}

	/// One parallel job, start to finish, in a workspace nobody else uses.
	fn run_isolated(&self, pipeline: &Pipeline, job: &Job) -> JobReport {
		let _span = tracing::debug_span!("job", ordinal = job.ordinal()).entered();
		self.announce(job);

		let workspace_path = pipeline.workspaces.path_for(job.ordinal());
		let result = pipeline.workspaces.acquire(job.ordinal()).and_then(|workspace| {
			let status = self.process(pipeline, &workspace, job)?;
			workspace.release()?;
			Ok(status)
		});

		let status = result.unwrap_or_else(|e| {
			let reason = describe(&e);
			tracing::error!("{} failed: {}", job.input().display(), reason);
			JobStatus::Failed { reason }
		});
		JobReport {
			job: job.clone(),
			workspace: workspace_path,
			status,
		}
	}

	/// Executes `job` in `workspace` and hands the result to the per-job hook.
	///
	/// Errors and panics from the hook are recorded on the job; only staging and execution
	/// errors propagate.
	fn process(&self, pipeline: &Pipeline, workspace: &Workspace, job: &Job) -> Result<JobStatus, Error> {
		let outcome = pipeline.executor.run(workspace, job)?;

		let ctx = JobContext {
			workspace,
			job,
			outcome: &outcome,
			config: &self.config,
			harvester: &pipeline.harvester,
		};
		let hook_result = panic::catch_unwind(AssertUnwindSafe(|| self.hooks.job_complete(&ctx)))
			.unwrap_or_else(|payload| Err(anyhow!("hook panicked: {}", panic_message(payload.as_ref()))));
		let status = match hook_result {
			Ok(()) => JobStatus::Completed {
				exit_code: outcome.code(),
				success: outcome.success(),
			},
			Err(source) => {
				let error = Error::Hook {
					source,
					input: job.input().to_path_buf(),
				};
				let reason = describe(&error);
				tracing::error!("{}", reason);
				JobStatus::Failed { reason }
			}
		};
		Ok(status)
	}

	fn announce(&self, job: &Job) {
		if self.config.settings().verbosity > 1 {
			tracing::info!("processing {}", job.input().display());
		} else {
			tracing::debug!("processing {}", job.input().display());
		}
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
	if let Some(message) = payload.downcast_ref::<&str>() {
		message
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message
	} else {
		"unknown cause"
	}
}

/// The error message followed by each of its causes.
fn describe(error: &Error) -> String {
	let mut reason = error.to_string();
	let mut source = std::error::Error::source(error);
	while let Some(cause) = source {
		reason.push_str(": ");
		reason.push_str(&cause.to_string());
		source = cause.source();
	}
	reason
}
