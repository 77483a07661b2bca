use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Unique name of a batch, used as the base name of every scratch workspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BatchName(String);

impl BatchName {
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl TryFrom<String> for BatchName {
	type Error = ConfigError;

	fn try_from(name: String) -> Result<Self, Self::Error> {
		let reason = if name.trim().is_empty() {
			Some("name is empty")
		} else if name == "." || name == ".." {
			Some("name refers to a relative directory")
		} else if name.contains(['/', '\\']) {
			Some("name contains a path separator")
		} else {
			None
		};

		match reason {
			Some(reason) => Err(ConfigError::InvalidName { name, reason }),
			None => Ok(Self(name)),
		}
	}
}

impl TryFrom<&str> for BatchName {
	type Error = ConfigError;

	fn try_from(name: &str) -> Result<Self, Self::Error> {
		Self::try_from(name.to_string())
	}
}

impl From<BatchName> for String {
	fn from(name: BatchName) -> Self {
		name.0
	}
}

impl fmt::Display for BatchName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// File extensions the runner recognizes, without the leading dot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Markers {
	/// Marks a directory as a simulation project; the template must hold at least one.
	pub project: String,
	/// One file per job in the job folder.
	pub job: String,
	/// Output files the simulator leaves in the workspace.
	pub artifact: String,
}

impl Default for Markers {
	fn default() -> Self {
		Self {
			project: "aproj".into(),
			job: "asim".into(),
			artifact: "txt".into(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSettings {
	/// Treat an abnormal simulator exit as a job failure instead of handing it to the hook.
	pub strict: bool,
	/// Sequential mode only: keep one workspace for the whole batch and clear it between jobs.
	/// When disabled, every job gets a fresh clone at the same reserved path.
	pub recycle_workspace: bool,
	pub verbosity: u8,
	/// How many directory levels below the workspace root the harvester searches.
	pub scan_depth: usize,
}

impl Default for RunSettings {
	fn default() -> Self {
		Self {
			strict: false,
			recycle_workspace: true,
			verbosity: 1,
			scan_depth: 1,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
	pub name: BatchName,
	/// Container for the scratch workspaces. Must already exist.
	pub root: PathBuf,
	/// Common project files, cloned into every workspace.
	pub template: PathBuf,
	pub executable: PathBuf,
	/// Folder holding one input file per job.
	pub jobs: PathBuf,
	/// Defaults to `root` when left out.
	#[serde(default)]
	pub results: Option<PathBuf>,
	#[serde(default)]
	pub markers: Markers,
	#[serde(default)]
	pub settings: RunSettings,
}

impl BatchConfig {
	pub fn new<R, T, E, J>(name: BatchName, root: R, template: T, executable: E, jobs: J) -> Self
	where
		R: Into<PathBuf>,
		T: Into<PathBuf>,
		E: Into<PathBuf>,
		J: Into<PathBuf>,
	{
		Self {
			name,
			root: root.into(),
			template: template.into(),
			executable: executable.into(),
			jobs: jobs.into(),
			results: None,
			markers: Markers::default(),
			settings: RunSettings::default(),
		}
	}

	pub fn with_results<P: Into<PathBuf>>(mut self, results: P) -> Self {
		self.results = Some(results.into());
		self
	}

	pub fn with_markers(mut self, markers: Markers) -> Self {
		self.markers = markers;
		self
	}

	pub fn with_settings(mut self, settings: RunSettings) -> Self {
		self.settings = settings;
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn rejects_bad_names() {
		for name in ["", "  ", ".", "..", "a/b", "a\\b"] {
			assert!(BatchName::try_from(name).is_err(), "{name:?} should be rejected");
		}
		assert_eq!(BatchName::try_from("sweep-01").unwrap().as_str(), "sweep-01");
	}

	#[test]
	fn deserialize_minimal() {
		let config: BatchConfig = toml::from_str(
			r#"
			name = "sweep"
			root = "/tmp/batch"
			template = "/tmp/batch/model"
			executable = "/opt/sim/bin/simulator"
			jobs = "/tmp/batch/jobs"
			"#,
		)
		.unwrap();

		assert_eq!(config.name.as_str(), "sweep");
		assert_eq!(config.results, None);
		assert_eq!(config.markers, Markers::default());
		assert_eq!(config.settings, RunSettings::default());
	}

	#[test]
	fn deserialize_full() {
		let config: BatchConfig = toml::from_str(
			r#"
			name = "sweep"
			root = "/tmp/batch"
			template = "/tmp/batch/model"
			executable = "/opt/sim/bin/simulator"
			jobs = "/tmp/batch/jobs"
			results = "/tmp/batch/results"

			[markers]
			project = "proj"
			job = "in"
			artifact = "res"

			[settings]
			strict = true
			recycle_workspace = false
			"#,
		)
		.unwrap();

		assert_eq!(config.results, Some(PathBuf::from("/tmp/batch/results")));
		assert_eq!(config.markers.artifact, "res");
		assert!(config.settings.strict);
		assert!(!config.settings.recycle_workspace);
		assert_eq!(config.settings.scan_depth, 1);
	}

	#[test]
	fn deserialize_rejects_invalid_name() {
		let result = toml::from_str::<BatchConfig>(
			r#"
			name = ".."
			root = "/tmp/batch"
			template = "/tmp/batch/model"
			executable = "/opt/sim/bin/simulator"
			jobs = "/tmp/batch/jobs"
			"#,
		);
		assert!(result.is_err());
	}
}
