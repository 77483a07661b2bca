use std::{ffi::OsStr, path::PathBuf};

/// Tilde expansion for paths coming from configuration files and the command line.
pub trait Expand {
	fn expand_user(self) -> PathBuf
	where
		Self: Sized;
}

impl<T: Into<PathBuf>> Expand for T {
	fn expand_user(self) -> PathBuf {
		let path = self.into();
		let mut components = path.components();
		if let Some(component) = components.next() {
			if component.as_os_str() == OsStr::new("~") {
				// without a home directory the path is left untouched and fails preflight instead
				if let Some(mut home) = dirs::home_dir() {
					home.extend(components);
					return home;
				}
			}
		}
		path
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn tilde_inside_component_is_kept() {
		let original = PathBuf::from("/srv/batches~/run");
		assert_eq!(original.clone().expand_user(), original)
	}

	#[test]
	fn leading_tilde_is_home() {
		let expected = dirs::home_dir().unwrap().join("sims/template");
		assert_eq!("~/sims/template".expand_user(), expected)
	}

	#[test]
	fn relative_path_is_kept() {
		assert_eq!("jobs".expand_user(), PathBuf::from("jobs"))
	}
}
