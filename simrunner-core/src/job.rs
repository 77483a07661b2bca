use std::{
	fs, io,
	path::{Path, PathBuf},
};

use simrunner_stdx::path::PathExt;

/// One simulation to run: a single input file from the job folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
	ordinal: usize,
	input: PathBuf,
}

impl Job {
	pub fn new<P: Into<PathBuf>>(ordinal: usize, input: P) -> Self {
		Self {
			ordinal,
			input: input.into(),
		}
	}

	/// Lists every job file in `dir`, sorted by file name, and numbers them from zero.
	pub fn discover(dir: &Path, extension: &str) -> io::Result<Vec<Job>> {
		let mut inputs = Vec::new();
		for entry in fs::read_dir(dir)? {
			let entry = entry?;
			if entry.file_type()?.is_file() && entry.path().has_extension(extension) {
				inputs.push(entry.path());
			}
		}
		inputs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

		Ok(inputs
			.into_iter()
			.enumerate()
			.map(|(ordinal, input)| Job { ordinal, input })
			.collect())
	}

	pub fn ordinal(&self) -> usize {
		self.ordinal
	}

	pub fn input(&self) -> &Path {
		&self.input
	}

	/// Input file name without its extension; prefixes every artifact this job produces.
	pub fn stem(&self) -> String {
		self.input.stem_lossy()
	}
}
