use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, ValueHint};
use config::{Config as LayeredConfig, Environment, File, FileFormat, FileSourceFile};
use simrunner_core::{BatchConfig, PROJECT_NAME};
use simrunner_stdx::path::Expand;

/// Flags shared by every subcommand that needs a batch configuration.
///
/// Each one overrides the matching key of the configuration file and the environment.
#[derive(Args, Default, Debug)]
pub struct BatchArgs {
	#[arg(long, short = 'c', value_hint = ValueHint::FilePath)]
	config: Option<PathBuf>,
	#[arg(long, help = "Base name of the scratch workspaces")]
	name: Option<String>,
	#[arg(long, value_hint = ValueHint::DirPath, help = "Folder the workspaces are created in")]
	root: Option<PathBuf>,
	#[arg(long, value_hint = ValueHint::DirPath, help = "Project files cloned into every workspace")]
	template: Option<PathBuf>,
	#[arg(long, value_hint = ValueHint::FilePath)]
	executable: Option<PathBuf>,
	#[arg(long, value_hint = ValueHint::DirPath, help = "Folder holding one input file per job")]
	jobs: Option<PathBuf>,
	#[arg(long, value_hint = ValueHint::DirPath, help = "Where harvested artifacts go (defaults to the root)")]
	results: Option<PathBuf>,
	#[arg(long, help = "Count an abnormal simulator exit as a failed job")]
	strict: bool,
	#[arg(long, help = "Clone a fresh workspace for every job, even when running sequentially")]
	fresh_workspaces: bool,
	#[arg(short, long, action = ArgAction::Count)]
	verbose: u8,
}

impl BatchArgs {
	pub fn load(&self) -> Result<BatchConfig> {
		let env = Environment::with_prefix(&PROJECT_NAME.to_uppercase())
			.prefix_separator("__")
			.separator("__")
			.try_parsing(true);
		self.load_with(env)
	}

	fn load_with(&self, env: Environment) -> Result<BatchConfig> {
		let mut builder = LayeredConfig::builder();
		if let Some(file) = self.config_file() {
			builder = builder.add_source(file);
		}

		builder = builder
			.add_source(env)
			.set_override_option("name", self.name.clone())?
			.set_override_option("root", lossy(&self.root))?
			.set_override_option("template", lossy(&self.template))?
			.set_override_option("executable", lossy(&self.executable))?
			.set_override_option("jobs", lossy(&self.jobs))?
			.set_override_option("results", lossy(&self.results))?;
		if self.strict {
			builder = builder.set_override("settings.strict", true)?;
		}
		if self.fresh_workspaces {
			builder = builder.set_override("settings.recycle_workspace", false)?;
		}
		if self.verbose > 0 {
			builder = builder.set_override("settings.verbosity", i64::from(self.verbose))?;
		}

		builder
			.build()?
			.try_deserialize::<BatchConfig>()
			.context("invalid batch configuration")
	}

	/// An explicit `--config` or `$SIMRUNNER_CONFIG` must exist; the per-user default is
	/// optional.
	fn config_file(&self) -> Option<File<FileSourceFile, FileFormat>> {
		if let Some(path) = &self.config {
			return Some(File::from(path.clone().expand_user()).required(true));
		}

		let var = format!("{}_CONFIG", PROJECT_NAME.to_uppercase());
		if let Ok(path) = std::env::var(&var) {
			return Some(File::from(PathBuf::from(path).expand_user()).required(true));
		}

		dirs::config_dir().map(|dir| File::from(dir.join(PROJECT_NAME).join("config.toml")).required(false))
	}
}

fn lossy(path: &Option<PathBuf>) -> Option<String> {
	path.as_deref().map(Path::to_string_lossy).map(Into::into)
}
