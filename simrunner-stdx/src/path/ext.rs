use std::path::Path;

pub trait PathExt {
	/// File stem as an owned string, empty when the path has none.
	fn stem_lossy(&self) -> String;
	/// Extension without the leading dot, empty when the path has none.
	fn extension_lossy(&self) -> String;
	/// Case-insensitive extension comparison; `ext` may be given with or without a leading dot.
	fn has_extension(&self, ext: &str) -> bool;
}

impl<T: AsRef<Path>> PathExt for T {
	fn stem_lossy(&self) -> String {
		self.as_ref()
			.file_stem()
			.map(|s| s.to_string_lossy().into_owned())
			.unwrap_or_default()
	}

	fn extension_lossy(&self) -> String {
		self.as_ref()
			.extension()
			.map(|s| s.to_string_lossy().into_owned())
			.unwrap_or_default()
	}

	fn has_extension(&self, ext: &str) -> bool {
		let wanted = ext.trim_start_matches('.');
		match self.as_ref().extension() {
			Some(actual) => actual.to_string_lossy().eq_ignore_ascii_case(wanted),
			None => wanted.is_empty(),
		}
	}
}
