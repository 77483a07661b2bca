use std::{
	fs,
	path::{Path, PathBuf},
};

use simrunner_stdx::path::Expand;

use crate::{
	config::{BatchConfig, BatchName, Markers, RunSettings},
	error::ConfigError,
	utils::fs::contains_extension,
};

/// A batch configuration that passed every preflight check.
///
/// The only way to obtain one is [`validate`], so holding a `ValidatedConfig` means the
/// template, executable and job folder were present when the batch started and the
/// results folder exists. It is never mutated afterwards and is shared by reference
/// with every worker.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
	name: BatchName,
	root: PathBuf,
	template: PathBuf,
	executable: PathBuf,
	jobs: PathBuf,
	results: PathBuf,
	markers: Markers,
	settings: RunSettings,
}

impl ValidatedConfig {
	pub fn name(&self) -> &BatchName {
		&self.name
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn template(&self) -> &Path {
		&self.template
	}

	pub fn executable(&self) -> &Path {
		&self.executable
	}

	pub fn jobs(&self) -> &Path {
		&self.jobs
	}

	pub fn results(&self) -> &Path {
		&self.results
	}

	pub fn markers(&self) -> &Markers {
		&self.markers
	}

	pub fn settings(&self) -> &RunSettings {
		&self.settings
	}
}

/// Runs the preflight checks in order and stops at the first failure.
///
/// The only side effect is creating the results folder (and its parents) when it is
/// missing.
#[tracing::instrument(level = "debug", skip(config), fields(batch = %config.name), err(Display))]
pub fn validate(config: &BatchConfig) -> Result<ValidatedConfig, ConfigError> {
	let root = resolve(&config.root);
	let template = resolve(&config.template);
	let executable = resolve(&config.executable);
	let jobs = resolve(&config.jobs);

	if !root.is_dir() {
		return Err(ConfigError::RootMissing(root));
	}

	if !template.is_dir() {
		return Err(ConfigError::TemplateMissing(template));
	}
	if !has_marker(&template, &config.markers.project)? {
		return Err(ConfigError::NoProjectMarker {
			path: template,
			extension: config.markers.project.clone(),
		});
	}

	check_executable(&executable)?;

	if !jobs.is_dir() {
		return Err(ConfigError::JobSourceMissing(jobs));
	}
	if !has_marker(&jobs, &config.markers.job)? {
		return Err(ConfigError::NoJobFiles {
			path: jobs,
			extension: config.markers.job.clone(),
		});
	}

	let results = match &config.results {
		Some(results) => resolve(results),
		None => root.clone(),
	};
	if !results.is_dir() {
		fs::create_dir_all(&results).map_err(|source| ConfigError::ResultsUncreatable {
			source,
			path: results.clone(),
		})?;
		tracing::info!("created results folder {}", results.display());
	}

	Ok(ValidatedConfig {
		name: config.name.clone(),
		root,
		template,
		executable,
		jobs,
		results,
		markers: config.markers.clone(),
		settings: config.settings.clone(),
	})
}

/// Expands `~` and anchors relative paths at the current directory, since the simulator
/// runs with the workspace as its working directory.
fn resolve(path: &Path) -> PathBuf {
	let expanded = path.to_path_buf().expand_user();
	std::path::absolute(&expanded).unwrap_or(expanded)
}

fn has_marker(dir: &Path, extension: &str) -> Result<bool, ConfigError> {
	contains_extension(dir, extension).map_err(|source| ConfigError::FolderUnreadable {
		source,
		path: dir.to_path_buf(),
	})
}

fn check_executable(path: &Path) -> Result<(), ConfigError> {
	let metadata = fs::metadata(path).map_err(|_| ConfigError::ExecutableMissing(path.to_path_buf()))?;
	if !metadata.is_file() {
		return Err(ConfigError::ExecutableNotInvocable(path.to_path_buf()));
	}

	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		if metadata.permissions().mode() & 0o111 == 0 {
			return Err(ConfigError::ExecutableNotInvocable(path.to_path_buf()));
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;
	use tempfile::{tempdir, TempDir};

	struct Layout {
		root: TempDir,
	}

	impl Layout {
		/// root/{model/model.proj, bin/sim, jobs/job1.in}
		fn new() -> Self {
			let root = tempdir().unwrap();
			let base = root.path();
			fs::create_dir_all(base.join("model")).unwrap();
			fs::write(base.join("model/model.proj"), "project").unwrap();
			fs::create_dir_all(base.join("bin")).unwrap();
			fs::write(base.join("bin/sim"), "#!/bin/sh\n").unwrap();
			#[cfg(unix)]
			{
				use std::os::unix::fs::PermissionsExt;
				fs::set_permissions(base.join("bin/sim"), fs::Permissions::from_mode(0o755)).unwrap();
			}
			fs::create_dir_all(base.join("jobs")).unwrap();
			fs::write(base.join("jobs/job1.in"), "job").unwrap();
			Self { root }
		}

		fn path(&self, relative: &str) -> PathBuf {
			self.root.path().join(relative)
		}

		fn config(&self) -> BatchConfig {
			BatchConfig::new(
				BatchName::try_from("sweep").unwrap(),
				self.root.path(),
				self.path("model"),
				self.path("bin/sim"),
				self.path("jobs"),
			)
			.with_markers(Markers {
				project: "proj".into(),
				job: "in".into(),
				artifact: "res".into(),
			})
		}
	}

	#[test]
	fn valid_layout_passes() {
		let layout = Layout::new();
		let validated = validate(&layout.config()).unwrap();
		assert_eq!(validated.root(), layout.root.path());
		assert_eq!(validated.executable(), layout.path("bin/sim"));
	}

	#[test]
	fn results_default_to_root() {
		let layout = Layout::new();
		let validated = validate(&layout.config()).unwrap();
		assert_eq!(validated.results(), layout.root.path());
	}

	#[test]
	fn missing_results_are_created() {
		let layout = Layout::new();
		let results = layout.path("out/nested/results");
		let validated = validate(&layout.config().with_results(&results)).unwrap();
		assert!(results.is_dir());
		assert_eq!(validated.results(), results);
	}

	#[test]
	fn missing_root() {
		let layout = Layout::new();
		let mut config = layout.config();
		config.root = layout.path("nowhere");
		assert!(matches!(validate(&config), Err(ConfigError::RootMissing(_))));
	}

	#[test]
	fn missing_template() {
		let layout = Layout::new();
		let mut config = layout.config();
		config.template = layout.path("no-model");
		assert!(matches!(validate(&config), Err(ConfigError::TemplateMissing(_))));
	}

	#[test]
	fn template_without_project_marker() {
		let layout = Layout::new();
		fs::remove_file(layout.path("model/model.proj")).unwrap();
		fs::write(layout.path("model/notes.md"), "").unwrap();
		assert!(matches!(validate(&layout.config()), Err(ConfigError::NoProjectMarker { .. })));
	}

	#[test]
	fn missing_executable() {
		let layout = Layout::new();
		fs::remove_file(layout.path("bin/sim")).unwrap();
		assert!(matches!(validate(&layout.config()), Err(ConfigError::ExecutableMissing(_))));
	}

	#[test]
	fn executable_is_a_directory() {
		let layout = Layout::new();
		let mut config = layout.config();
		config.executable = layout.path("bin");
		assert!(matches!(validate(&config), Err(ConfigError::ExecutableNotInvocable(_))));
	}

	#[cfg(unix)]
	#[test]
	fn executable_without_exec_bit() {
		use std::os::unix::fs::PermissionsExt;
		let layout = Layout::new();
		fs::set_permissions(layout.path("bin/sim"), fs::Permissions::from_mode(0o644)).unwrap();
		assert!(matches!(validate(&layout.config()), Err(ConfigError::ExecutableNotInvocable(_))));
	}

	#[test]
	fn missing_job_folder() {
		let layout = Layout::new();
		fs::remove_dir_all(layout.path("jobs")).unwrap();
		assert!(matches!(validate(&layout.config()), Err(ConfigError::JobSourceMissing(_))));
	}

	#[test]
	fn job_folder_without_jobs() {
		let layout = Layout::new();
		fs::remove_file(layout.path("jobs/job1.in")).unwrap();
		fs::write(layout.path("jobs/readme.txt"), "").unwrap();
		assert!(matches!(validate(&layout.config()), Err(ConfigError::NoJobFiles { .. })));
	}

	#[cfg(unix)]
	#[test]
	fn unreadable_template_is_reported_as_such() {
		use std::os::unix::fs::PermissionsExt;
		let layout = Layout::new();
		fs::set_permissions(layout.path("model"), fs::Permissions::from_mode(0o000)).unwrap();
		if fs::read_dir(layout.path("model")).is_ok() {
			// permissions are not enforced for root
			fs::set_permissions(layout.path("model"), fs::Permissions::from_mode(0o755)).unwrap();
			return;
		}

		let result = validate(&layout.config());
		fs::set_permissions(layout.path("model"), fs::Permissions::from_mode(0o755)).unwrap();

		match result {
			Err(ConfigError::FolderUnreadable { path, .. }) => assert_eq!(path, layout.path("model")),
			other => panic!("unexpected result {other:?}"),
		}
	}

	#[test]
	fn results_path_blocked_by_file() {
		let layout = Layout::new();
		fs::write(layout.path("taken"), "").unwrap();
		let config = layout.config().with_results(layout.path("taken/results"));
		assert!(matches!(validate(&config), Err(ConfigError::ResultsUncreatable { .. })));
	}

	#[test]
	fn first_failing_check_wins() {
		let layout = Layout::new();
		let mut config = layout.config();
		config.template = layout.path("no-model");
		config.jobs = layout.path("no-jobs");
		assert!(matches!(validate(&config), Err(ConfigError::TemplateMissing(_))));
	}
}
