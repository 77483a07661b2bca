use std::{fmt, path::Path};

use anyhow::Result;

use crate::{
	executor::ExecutionOutcome,
	harvester::{Harvester, ResultArtifact},
	job::Job,
	scheduler::BatchReport,
	validator::ValidatedConfig,
	workspace::Workspace,
};

pub type JobHook = dyn Fn(&JobContext<'_>) -> Result<()> + Send + Sync;
pub type BatchHook = dyn Fn(&BatchReport) -> Result<()> + Send + Sync;

/// Everything a per-job hook gets to see once the simulator has exited.
///
/// The workspace still holds the simulator's output at this point and is released by the
/// scheduler after the hook returns.
pub struct JobContext<'a> {
	pub workspace: &'a Workspace,
	pub job: &'a Job,
	pub outcome: &'a ExecutionOutcome,
	pub config: &'a ValidatedConfig,
	pub(crate) harvester: &'a Harvester,
}

impl JobContext<'_> {
	/// Runs the default harvest, for hooks that only want to add behaviour around it.
	pub fn harvest(&self) -> Result<Vec<ResultArtifact>, crate::error::Error> {
		self.harvester.harvest(self.workspace, self.job)
	}

	pub fn results(&self) -> &Path {
		self.harvester.results()
	}
}

/// The two replaceable callbacks of a batch.
///
/// Hooks are installed through `&mut` access before a run starts; running only needs
/// `&self`, so they cannot be swapped while jobs are in flight.
#[derive(Default)]
pub struct HookRegistry {
	on_job_complete: Option<Box<JobHook>>,
	on_batch_complete: Option<Box<BatchHook>>,
}

impl fmt::Debug for HookRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HookRegistry")
			.field("on_job_complete", &self.on_job_complete.as_ref().map(|_| "custom"))
			.field("on_batch_complete", &self.on_batch_complete.as_ref().map(|_| "custom"))
			.finish()
	}
}

impl HookRegistry {
	/// Replaces the default harvest. Call [`JobContext::harvest`] to keep it.
	pub fn set_job_hook<F>(&mut self, hook: F)
	where
		F: Fn(&JobContext<'_>) -> Result<()> + Send + Sync + 'static,
	{
		self.on_job_complete = Some(Box::new(hook));
	}

	pub fn set_batch_hook<F>(&mut self, hook: F)
	where
		F: Fn(&BatchReport) -> Result<()> + Send + Sync + 'static,
	{
		self.on_batch_complete = Some(Box::new(hook));
	}

	pub(crate) fn job_complete(&self, ctx: &JobContext<'_>) -> Result<()> {
		match &self.on_job_complete {
			Some(hook) => hook(ctx),
			None => default_job_hook(ctx),
		}
	}

	pub(crate) fn batch_complete(&self, report: &BatchReport) -> Result<()> {
		match &self.on_batch_complete {
			Some(hook) => hook(report),
			None => Ok(()),
		}
	}
}

/// Harvests every artifact, whatever the exit status was.
pub fn default_job_hook(ctx: &JobContext<'_>) -> Result<()> {
	let harvested = ctx.harvest()?;
	tracing::debug!(job = %ctx.job.stem(), artifacts = harvested.len(), "harvested");
	Ok(())
}
