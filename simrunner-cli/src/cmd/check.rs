use anyhow::{anyhow, Result};
use clap::Parser;
use simrunner_core::{Batch, BatchConfig, ConfigError, Error};

use super::{args::BatchArgs, logs, Cmd};
use crate::cli::CliUi;

#[derive(Parser, Default, Debug)]
pub struct Check {
	#[command(flatten)]
	batch: BatchArgs,
}

impl Cmd for Check {
	fn run(self) -> Result<()> {
		let config = self.batch.load()?;
		let _guard = logs::init(config.settings.verbosity, None);
		let ui = CliUi::new(config.settings.verbosity);

		let batch = preflight(&ui, &config)?;
		let jobs = batch.jobs()?;
		let validated = batch.config();
		ui.success(&format!("batch {} passed every preflight check", validated.name()));
		ui.info(&format!("template   {}", validated.template().display()));
		ui.info(&format!("executable {}", validated.executable().display()));
		ui.info(&format!("results    {}", validated.results().display()));
		ui.info(&format!("{} jobs in {}", jobs.len(), validated.jobs().display()));
		ui.jobs(&jobs);
		Ok(())
	}
}

/// Validates `config`, reporting a failed check with a hint on how to fix it.
pub(super) fn preflight(ui: &CliUi, config: &BatchConfig) -> Result<Batch> {
	match Batch::from_config(config) {
		Ok(batch) => Ok(batch),
		Err(Error::Config(e)) => {
			ui.error(&e.to_string(), hint(&e));
			Err(anyhow!("batch {} failed its preflight checks", config.name))
		}
		Err(e) => Err(e.into()),
	}
}

fn hint(error: &ConfigError) -> Option<&'static str> {
	match error {
		ConfigError::NoProjectMarker { .. } => Some("the template needs a file with the `markers.project` extension"),
		ConfigError::NoJobFiles { .. } => Some("job files are recognized by the `markers.job` extension"),
		ConfigError::ExecutableNotInvocable(_) => Some("the simulator must be a regular file with an execute bit set"),
		ConfigError::RootMissing(_) => Some("the workspace root is never created automatically"),
		ConfigError::FolderUnreadable { .. } => Some("check the folder's permissions"),
		_ => None,
	}
}
