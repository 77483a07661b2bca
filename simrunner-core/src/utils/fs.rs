use std::{
	fs::{self, File, FileTimes},
	io,
	path::Path,
};

use simrunner_stdx::path::PathExt;
use walkdir::WalkDir;

/// Copies a single file, carrying over permissions and access/modification times.
pub fn copy_preserving(from: &Path, to: &Path) -> io::Result<u64> {
	let bytes = fs::copy(from, to)?;
	let metadata = fs::metadata(from)?;

	let mut times = FileTimes::new();
	if let Ok(accessed) = metadata.accessed() {
		times = times.set_accessed(accessed);
	}
	if let Ok(modified) = metadata.modified() {
		times = times.set_modified(modified);
	}

	// read-only copies can't be opened for writing, but their owner may still set times
	let file = File::options().write(true).open(to).or_else(|_| File::open(to))?;
	if let Err(e) = file.set_times(times) {
		tracing::debug!("could not preserve timestamps on {}: {}", to.display(), e);
	}
	Ok(bytes)
}

/// Recursively copies the contents of `from` into the existing directory `to`.
pub fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
	for entry in WalkDir::new(from).min_depth(1) {
		let entry = entry.map_err(io::Error::from)?;
		let relative = entry
			.path()
			.strip_prefix(from)
			.map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
		let target = to.join(relative);

		let file_type = entry.file_type();
		if file_type.is_dir() {
			fs::create_dir_all(&target)?;
		} else if file_type.is_symlink() {
			copy_symlink(entry.path(), &target)?;
		} else {
			copy_preserving(entry.path(), &target)?;
		}
	}
	Ok(())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
	let link = fs::read_link(from)?;
	std::os::unix::fs::symlink(link, to)
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
	copy_preserving(from, to).map(|_| ())
}

/// Whether `dir` directly contains a regular file with the given extension.
pub fn contains_extension(dir: &Path, extension: &str) -> io::Result<bool> {
	for entry in fs::read_dir(dir)? {
		let entry = entry?;
		if entry.file_type()?.is_file() && entry.path().has_extension(extension) {
			return Ok(true);
		}
	}
	Ok(false)
}

/// Number of entries in `dir` whose file name starts with `prefix`.
pub fn count_prefixed(dir: &Path, prefix: &str) -> io::Result<usize> {
	let mut count = 0;
	for entry in fs::read_dir(dir)? {
		if entry?.file_name().to_string_lossy().starts_with(prefix) {
			count += 1;
		}
	}
	Ok(count)
}
