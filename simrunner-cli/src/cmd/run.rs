use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueHint};
use simrunner_core::Concurrency;

use super::{args::BatchArgs, check::preflight, logs, Cmd};
use crate::cli::CliUi;

#[derive(Parser, Default, Debug)]
pub struct Run {
	#[command(flatten)]
	batch: BatchArgs,
	#[arg(
		long,
		short = 'j',
		allow_negative_numbers = true,
		help = "Run jobs in parallel on this many workers (0 runs them one after another, a negative count uses every CPU)"
	)]
	workers: Option<i64>,
	#[arg(long, value_hint = ValueHint::DirPath, help = "Also write a full trace of the run to a file in this folder")]
	log_dir: Option<PathBuf>,
}

impl Cmd for Run {
	fn run(self) -> Result<()> {
		let config = self.batch.load()?;
		let _guard = logs::init(config.settings.verbosity, self.log_dir.as_deref());
		let ui = CliUi::new(config.settings.verbosity);

		let mut batch = preflight(&ui, &config)?;
		let jobs = batch.jobs()?;
		let bar = ui.progress(jobs.len())?;

		let job_bar = bar.clone();
		batch.hooks_mut().set_job_hook(move |ctx| {
			let harvested = ctx.harvest()?;
			job_bar.set_message(format!("{} ({} artifacts)", ctx.job.stem(), harvested.len()));
			job_bar.inc(1);
			Ok(())
		});

		let summary_bar = bar.clone();
		let summary_ui = ui.clone();
		batch.hooks_mut().set_batch_hook(move |report| {
			summary_bar.finish_and_clear();
			summary_ui.summary(report);
			Ok(())
		});

		let result = batch.run_jobs(&jobs, Concurrency::from_request(self.workers));
		bar.finish_and_clear();
		result?;
		Ok(())
	}
}
