//! Directory scanner (§4.7): memoized recursive walk that yields
//! `(path, stat)` without following symbolic links, plus unsafe-symlink
//! detection.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Component, Path, PathBuf};

use crate::error::ScanError;
use crate::exclude::ExcludeMatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
	File,
	Dir,
	Symlink,
}

#[derive(Debug, Clone)]
pub struct Stat {
	pub kind: Kind,
	pub size: u64,
	pub mtime: f64,
}

#[derive(Debug, Clone)]
pub struct Entry {
	pub rel_path: PathBuf,
	pub stat: Stat,
}

#[derive(Debug, Clone, Copy)]
pub struct Include {
	pub files: bool,
	pub dirs: bool,
	pub symlinks: bool,
}

impl Default for Include {
	fn default() -> Self {
		Include { files: true, dirs: true, symlinks: true }
	}
}

thread_local! {
	static CACHE: RefCell<HashMap<PathBuf, Vec<Entry>>> = RefCell::new(HashMap::new());
}

/// Enumerate every entry under `root`, following no symlinks, without
/// any include/exclude filtering. Used by the exclude matcher, which
/// applies its own filtering after the walk.
pub fn walk_all(root: &Path) -> Result<Vec<Entry>, ScanError> {
	scan(root, Include::default(), None, true)
}

/// `scan(root, include, exclude, memoize)` per §4.7. Paths are relative
/// to `root`. A path is skipped if it equals an excluded path or if a
/// path-component prefix of it equals an excluded directory (exclusion
/// is inherited by descendants).
pub fn scan(
	root: &Path,
	include: Include,
	exclude: Option<&ExcludeMatcher>,
	memoize: bool,
) -> Result<Vec<Entry>, ScanError> {
	if memoize {
		if let Some(cached) = CACHE.with(|c| c.borrow().get(root).cloned()) {
			return Ok(filter_include(cached, include));
		}
	}

	let mut out = Vec::new();
	walk_dir(root, root, Path::new(""), exclude, &mut out)?;

	if memoize {
		CACHE.with(|c| c.borrow_mut().insert(root.to_path_buf(), out.clone()));
	}

	Ok(filter_include(out, include))
}

pub fn invalidate(root: &Path) {
	CACHE.with(|c| {
		c.borrow_mut().remove(root);
	});
}

fn filter_include(entries: Vec<Entry>, include: Include) -> Vec<Entry> {
	entries
		.into_iter()
		.filter(|e| match e.stat.kind {
			Kind::File => include.files,
			Kind::Dir => include.dirs,
			Kind::Symlink => include.symlinks,
		})
		.collect()
}

fn walk_dir(
	root: &Path,
	dir: &Path,
	rel_dir: &Path,
	exclude: Option<&ExcludeMatcher>,
	out: &mut Vec<Entry>,
) -> Result<(), ScanError> {
	let read_dir = fs::read_dir(dir).map_err(|e| ScanError::Io {
		path: dir.display().to_string(),
		source: e,
	})?;

	for entry in read_dir {
		let entry = entry.map_err(|e| ScanError::Io { path: dir.display().to_string(), source: e })?;
		let rel_path = rel_dir.join(entry.file_name());

		if let Some(matcher) = exclude {
			if is_excluded_by_prefix(matcher, &rel_path) {
				continue;
			}
		}

		let metadata = entry.metadata().map_err(|e| ScanError::Io {
			path: rel_path.display().to_string(),
			source: e,
		})?;

		let kind = if metadata.file_type().is_symlink() {
			Kind::Symlink
		} else if metadata.is_dir() {
			Kind::Dir
		} else {
			Kind::File
		};

		let stat = Stat { kind, size: metadata.len(), mtime: metadata.mtime() as f64 };
		out.push(Entry { rel_path: rel_path.clone(), stat });

		if kind == Kind::Dir {
			let full = root.join(&rel_path);
			walk_dir(root, &full, &rel_path, exclude, out)?;
		}
	}
	Ok(())
}

/// A path is skipped if it, or any path-component prefix of it, is a
/// direct exclude match.
fn is_excluded_by_prefix(matcher: &ExcludeMatcher, rel_path: &Path) -> bool {
	let mut prefix = PathBuf::new();
	for component in rel_path.components() {
		prefix.push(component);
		if matcher.is_excluded(&prefix) {
			return true;
		}
	}
	false
}

/// A symlink is unsafe if its target, resolved relative to its parent,
/// escapes `root`, or if the target is itself absolute.
pub fn is_unsafe_symlink(root: &Path, rel_path: &Path) -> Result<bool, ScanError> {
	let full = root.join(rel_path);
	let target = fs::read_link(&full)
		.map_err(|e| ScanError::Io { path: full.display().to_string(), source: e })?;

	if target.is_absolute() {
		return Ok(true);
	}

	let parent = rel_path.parent().unwrap_or_else(|| Path::new(""));
	let mut resolved = parent.to_path_buf();
	for component in target.components() {
		match component {
			Component::ParentDir => {
				if !resolved.pop() {
					return Ok(true);
				}
			}
			Component::CurDir => {}
			Component::Normal(part) => resolved.push(part),
			Component::RootDir | Component::Prefix(_) => return Ok(true),
		}
	}

	Ok(resolved.components().any(|c| matches!(c, Component::ParentDir)))
}


// vim: ts=4
