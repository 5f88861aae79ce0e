//! Message file discovery.

// std
use std::fs;
// self
use crate::_prelude::*;

/// Name fragment that marks a file as an HL7v2 message.
pub const HL7_MARKER: &str = ".hl7";

/// Recursively lists message files under `root`.
///
/// Entries are visited in name order within each directory and a file qualifies when its
/// name contains [`HL7_MARKER`] anywhere, so `a.hl7.bak` counts too. Symlinks to files are
/// followed; symlinked directories are not descended into.
pub fn discover(root: &Path) -> Result<Vec<PathBuf>> {
	let mut found = Vec::new();

	visit(root, &mut found)?;

	Ok(found)
}

fn visit(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
	let discovery = |source| Error::Discovery { path: dir.to_owned(), source };
	let mut entries = fs::read_dir(dir)
		.map_err(discovery)?
		.collect::<Result<Vec<_>, _>>()
		.map_err(discovery)?;

	entries.sort_by_key(|entry| entry.file_name());

	for entry in entries {
		let path = entry.path();
		let kind = entry.file_type().map_err(discovery)?;

		if kind.is_dir() {
			visit(&path, found)?;

			continue;
		}
		if !entry.file_name().to_string_lossy().contains(HL7_MARKER) {
			continue;
		}

		match fs::metadata(&path) {
			Ok(meta) if meta.is_file() => found.push(path),
			Ok(_) => {},
			Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping dangling link."),
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;

	#[test]
	fn finds_nested_files_in_name_order() {
		let root = env::temp_dir().join(format!("hl7v2-dispatch-walk-{}", process::id()));
		let nested = root.join("b-dir");

		fs::create_dir_all(&nested).expect("Temp dirs should be created.");

		for path in [
			root.join("c.hl7"),
			root.join("a.hl7.bak"),
			root.join("notes.txt"),
			nested.join("x.HL7"),
			nested.join("y.hl7"),
		] {
			fs::write(path, b"MSH|^~\\&|").expect("Temp files should be written.");
		}

		let found = discover(&root).expect("Discovery should succeed.");
		let names = found
			.iter()
			.map(|path| {
				path.strip_prefix(&root).expect("Paths stay under root.").to_string_lossy().into_owned()
			})
			.collect::<Vec<_>>();

		assert_eq!(names, ["a.hl7.bak", "b-dir/y.hl7", "c.hl7"]);

		fs::remove_dir_all(&root).expect("Temp dirs should be removed.");
	}

	#[cfg(unix)]
	#[test]
	fn symlinked_files_are_included() {
		// std
		use std::os::unix::fs::symlink;

		let tmp = env::temp_dir();
		let root = tmp.join(format!("hl7v2-dispatch-walk-links-{}", process::id()));
		let target_dir = tmp.join(format!("hl7v2-dispatch-walk-target-{}", process::id()));
		let target = target_dir.join("real.hl7");

		fs::create_dir_all(&root).expect("Temp dirs should be created.");
		fs::create_dir_all(&target_dir).expect("Temp dirs should be created.");
		fs::write(&target, b"MSH|^~\\&|").expect("Temp files should be written.");

		for (from, to) in [
			(target.clone(), "linked.hl7"),
			(root.join("gone.hl7.src"), "dangling.hl7"),
			(target_dir.clone(), "dir.hl7"),
		] {
			symlink(from, root.join(to)).expect("Link should be created.");
		}

		let found = discover(&root).expect("Discovery should succeed.");

		assert_eq!(found, [root.join("linked.hl7")]);

		fs::remove_dir_all(&root).expect("Temp dirs should be removed.");
		fs::remove_dir_all(&target_dir).expect("Temp dirs should be removed.");
	}

	#[test]
	fn missing_root_is_a_discovery_error() {
		let err = discover(Path::new("/definitely/not/here")).expect_err("Missing root must fail.");

		assert!(matches!(err, Error::Discovery { .. }));
	}
}
