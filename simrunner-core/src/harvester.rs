use std::{
	fs::{self, OpenOptions},
	io,
	path::{Path, PathBuf},
};

use simrunner_stdx::path::PathExt;
use walkdir::WalkDir;

use crate::{
	error::Error,
	job::Job,
	utils::fs::{copy_preserving, count_prefixed},
	validator::ValidatedConfig,
};

/// An output file moved into the results folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultArtifact {
	/// Where the simulator left it inside the workspace.
	pub origin: PathBuf,
	/// Final location in the results folder.
	pub path: PathBuf,
}

impl ResultArtifact {
	pub fn file_name(&self) -> String {
		self.path
			.file_name()
			.map(|n| n.to_string_lossy().into_owned())
			.unwrap_or_default()
	}
}

/// Moves simulator output out of a workspace into the shared results folder.
#[derive(Debug, Clone)]
pub struct Harvester {
	results: PathBuf,
	extension: String,
	scan_depth: usize,
}

impl Harvester {
	pub fn new(config: &ValidatedConfig) -> Self {
		Self {
			results: config.results().to_path_buf(),
			extension: config.markers().artifact.clone(),
			scan_depth: config.settings().scan_depth.max(1),
		}
	}

	pub fn results(&self) -> &Path {
		&self.results
	}

	/// `<job-stem>_<artifact-stem>`, the name an artifact gets before disambiguation.
	pub fn base_name(job: &Job, artifact: &Path) -> String {
		format!("{}_{}", job.stem(), artifact.stem_lossy())
	}

	/// Moves every recognized artifact in `workspace` into the results folder.
	///
	/// An artifact that cannot be moved is logged and left behind; the others are still
	/// harvested. Finding nothing is not an error.
	#[tracing::instrument(level = "debug", skip_all, fields(job = %job.stem()))]
	pub fn harvest(&self, workspace: &Path, job: &Job) -> Result<Vec<ResultArtifact>, Error> {
		let mut harvested = Vec::new();
		for artifact in self.scan(workspace)? {
			match self.collect(&artifact, job) {
				Ok(result) => {
					tracing::info!("{} -> {}", artifact.display(), result.path.display());
					harvested.push(result);
				}
				Err(e) => tracing::warn!(error = ?e, "skipping artifact {}", artifact.display()),
			}
		}
		Ok(harvested)
	}

	fn scan(&self, workspace: &Path) -> Result<Vec<PathBuf>, Error> {
		let mut artifacts = Vec::new();
		let walker = WalkDir::new(workspace)
			.min_depth(1)
			.max_depth(self.scan_depth)
			.sort_by_file_name();
		for entry in walker {
			let entry = entry.map_err(|e| Error::Harvest {
				source: e.into(),
				artifact: workspace.to_path_buf(),
			})?;
			if entry.file_type().is_file() && entry.path().has_extension(&self.extension) {
				artifacts.push(entry.into_path());
			}
		}
		Ok(artifacts)
	}

	fn collect(&self, artifact: &Path, job: &Job) -> Result<ResultArtifact, Error> {
		let harvest_error = |source| Error::Harvest {
			source,
			artifact: artifact.to_path_buf(),
		};

		let target = self
			.reserve(&Self::base_name(job, artifact), &artifact.extension_lossy())
			.map_err(harvest_error)?;

		if let Err(e) = copy_preserving(artifact, &target) {
			let _ = fs::remove_file(&target);
			return Err(harvest_error(e));
		}
		fs::remove_file(artifact).map_err(harvest_error)?;

		Ok(ResultArtifact {
			origin: artifact.to_path_buf(),
			path: target,
		})
	}

	/// Claims a free name for `base` in the results folder.
	///
	/// The first candidate is suffixed with the number of existing entries starting with
	/// `base` (no suffix when there are none). The candidate is created exclusively, so two
	/// workers racing for the same name never both get it; the loser moves on to the next
	/// index.
	fn reserve(&self, base: &str, extension: &str) -> io::Result<PathBuf> {
		let mut index = count_prefixed(&self.results, base)?;
		loop {
			let mut name = if index == 0 {
				base.to_string()
			} else {
				format!("{base}-{index}")
			};
			if !extension.is_empty() {
				name.push('.');
				name.push_str(extension);
			}

			let candidate = self.results.join(name);
			match OpenOptions::new().write(true).create_new(true).open(&candidate) {
				Ok(_) => return Ok(candidate),
				Err(e) if e.kind() == io::ErrorKind::AlreadyExists => index += 1,
				Err(e) => return Err(e),
			}
		}
	}
}
