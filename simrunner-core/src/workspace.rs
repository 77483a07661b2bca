use std::{
	fs, io,
	ops::Deref,
	path::{Path, PathBuf},
};

use walkdir::WalkDir;

use crate::{config::BatchName, error::Error, utils::fs::copy_tree, validator::ValidatedConfig};

/// A scratch directory cloned from the template, owned by exactly one job at a time.
///
/// Dropping a workspace that was not explicitly released still removes it, so every exit
/// path out of a job (early return, error, panic unwinding through a hook) cleans up.
#[derive(Debug)]
pub struct Workspace {
	path: PathBuf,
	released: bool,
}

impl Deref for Workspace {
	type Target = Path;

	fn deref(&self) -> &Self::Target {
		&self.path
	}
}

impl Drop for Workspace {
	fn drop(&mut self) {
		if self.released {
			return;
		}
		if let Err(e) = fs::remove_dir_all(&self.path) {
			tracing::error!("workspace {} leaked: {}", self.path.display(), e);
		}
	}
}

impl Workspace {
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Removes the workspace from disk, reporting failures to the caller.
	#[tracing::instrument(level = "debug", skip(self), fields(workspace = %self.path.display()))]
	pub fn release(mut self) -> Result<(), Error> {
		self.released = true;
		fs::remove_dir_all(&self.path).map_err(|source| Error::Workspace {
			source,
			path: self.path.clone(),
		})
	}

	/// Deletes every file and folder whose path, relative to the workspace, does not exist
	/// in `template`, at any depth.
	pub fn clear_transient(&self, template: &Path) -> Result<(), Error> {
		let clear = || -> io::Result<()> {
			let mut walker = WalkDir::new(&self.path).min_depth(1).into_iter();
			while let Some(entry) = walker.next() {
				let entry = entry.map_err(io::Error::from)?;
				let relative = entry
					.path()
					.strip_prefix(&self.path)
					.map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
				let original = template.join(relative);
				let is_dir = entry.file_type().is_dir();

				if is_dir && original.is_dir() {
					continue;
				}
				if !is_dir && original.symlink_metadata().is_ok() {
					continue;
				}

				if is_dir {
					walker.skip_current_dir();
					fs::remove_dir_all(entry.path())?;
				} else {
					fs::remove_file(entry.path())?;
				}
				tracing::debug!("cleared {}", entry.path().display());
			}
			Ok(())
		};
		clear().map_err(|source| Error::Workspace {
			source,
			path: self.path.clone(),
		})
	}
}

/// Hands out workspaces named `<batch>` or `<batch>-<n>` under the root folder.
///
/// The root is scanned once on construction; suffixes start above any `<batch>-<n>`
/// directory already present, so leftovers from earlier runs with the same batch name are
/// never reused or overwritten.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
	root: PathBuf,
	name: BatchName,
	template: PathBuf,
	first_free: usize,
}

impl WorkspaceManager {
	pub fn new(config: &ValidatedConfig) -> Result<Self, Error> {
		let first_free = Self::scan(config.root(), config.name()).map_err(|source| Error::Workspace {
			source,
			path: config.root().to_path_buf(),
		})?;
		Ok(Self {
			root: config.root().to_path_buf(),
			name: config.name().clone(),
			template: config.template().to_path_buf(),
			first_free,
		})
	}

	fn scan(root: &Path, name: &BatchName) -> io::Result<usize> {
		let prefix = format!("{name}-");
		let mut first_free = 0;
		for entry in fs::read_dir(root)? {
			let entry = entry?;
			if !entry.file_type()?.is_dir() {
				continue;
			}
			let file_name = entry.file_name();
			let file_name = file_name.to_string_lossy();
			if file_name == name.as_str() {
				first_free = first_free.max(1);
			} else if let Some(n) = file_name.strip_prefix(&prefix).and_then(|n| n.parse::<usize>().ok()) {
				// a suffix with no successor can't be skipped past; exclusive creation still guards it
				if let Some(next) = n.checked_add(1) {
					first_free = first_free.max(next);
				}
			}
		}
		Ok(first_free)
	}

	pub fn template(&self) -> &Path {
		&self.template
	}

	/// Path of the workspace for `suffix`; unique as long as suffixes are.
	pub fn path_for(&self, suffix: usize) -> PathBuf {
		self.root.join(format!("{}-{}", self.name, self.first_free.saturating_add(suffix)))
	}

	/// The path a sequential run should use: the bare batch name when it is free.
	pub fn reserve_next(&self) -> PathBuf {
		let base = self.root.join(self.name.as_str());
		if base.exists() {
			self.path_for(0)
		} else {
			base
		}
	}

	/// Clones the template into the workspace for `suffix`.
	pub fn acquire(&self, suffix: usize) -> Result<Workspace, Error> {
		self.acquire_at(self.path_for(suffix))
	}

	pub fn acquire_next(&self) -> Result<Workspace, Error> {
		self.acquire_at(self.reserve_next())
	}

	/// Creates `path` exclusively and clones the template into it.
	#[tracing::instrument(level = "debug", skip(self), err(Display))]
	pub fn acquire_at(&self, path: PathBuf) -> Result<Workspace, Error> {
		fs::create_dir(&path).map_err(|source| Error::Workspace {
			source,
			path: path.clone(),
		})?;

		// from here on a failed clone is cleaned up by the guard
		let workspace = Workspace { path, released: false };
		copy_tree(&self.template, &workspace.path).map_err(|source| Error::Workspace {
			source,
			path: workspace.path.clone(),
		})?;
		Ok(workspace)
	}
}
