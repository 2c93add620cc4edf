//! Materializer (§4.11): brings the local tree into a state where
//! every selected path is a real file or directory and every other
//! RMDB path is a symlink to the corresponding remote path.

use std::collections::HashSet;
use std::fs;
use std::os::unix::fs::symlink;
use std::path::Path;

use crate::error::MaterializeError;
use crate::lpdb::Lpdb;
use crate::rmdb::Rmdb;
use crate::selection::Selection;

/// Byte-count progress callback: `(bytes_transferred, bytes_total)`.
pub type Progress<'a> = dyn FnMut(u64, u64) + 'a;

#[derive(Debug, Default)]
pub struct MaterializeReport {
	pub deleted: Vec<String>,
	pub symlinked: Vec<String>,
	pub transferred: Vec<String>,
	pub failed: Vec<(String, String)>,
}

fn in_selected_set(path: &str, selected: &HashSet<String>) -> bool {
	selected.iter().any(|s| path == s || path.starts_with(&format!("{}/", s)) || s.starts_with(&format!("{}/", path)))
}

/// Step 1: delete paths materialized locally that are neither in `S`
/// nor ancestors/descendants of any path in `S`, leaf-first.
pub fn remove_stale(
	local_root: &Path,
	materialized: &[String],
	selected_paths: &HashSet<String>,
	report: &mut MaterializeReport,
) -> Result<(), MaterializeError> {
	let mut stale: Vec<&String> = materialized
		.iter()
		.filter(|p| !in_selected_set(p, selected_paths))
		.collect();
	stale.sort_by_key(|p| std::cmp::Reverse(p.matches('/').count()));

	for path in stale {
		let full = local_root.join(path);
		let metadata = match fs::symlink_metadata(&full) {
			Ok(m) => m,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
			Err(e) => return Err(MaterializeError::Io { path: path.clone(), source: e }),
		};
		let result = if metadata.is_dir() && !metadata.file_type().is_symlink() {
			fs::remove_dir(&full)
		} else {
			fs::remove_file(&full)
		};
		result.map_err(|e| MaterializeError::Io { path: path.clone(), source: e })?;
		report.deleted.push(path.clone());
	}
	Ok(())
}

/// Step 2: overlay every RMDB directory and file as a real directory
/// or symlink, skipping paths already materialized unless `overwrite`.
/// Entries in `selected_paths` are never overlaid, even with
/// `overwrite` set — they're real files `remove_stale` already
/// confirmed should stay materialized.
pub fn overlay_symlinks(
	local_root: &Path,
	remote_root: &Path,
	rmdb: &Rmdb,
	selected_paths: &HashSet<String>,
	overwrite: bool,
	report: &mut MaterializeReport,
) -> Result<(), MaterializeError> {
	let mut entries = rmdb.subtree(None, None, None).map_err(to_materialize_error)?;
	entries.sort_by_key(|e| e.path.matches('/').count());

	for entry in entries {
		if entry.path.is_empty() {
			continue;
		}
		if in_selected_set(&entry.path, selected_paths) {
			continue;
		}
		let local_path = local_root.join(&entry.path);

		if entry.is_dir {
			if !local_path.exists() {
				fs::create_dir_all(&local_path)
					.map_err(|e| MaterializeError::Io { path: entry.path.clone(), source: e })?;
			}
			continue;
		}

		let exists = fs::symlink_metadata(&local_path).is_ok();
		if exists && !overwrite {
			continue;
		}
		if exists && overwrite {
			fs::remove_file(&local_path)
				.map_err(|e| MaterializeError::Io { path: entry.path.clone(), source: e })?;
		}

		let target = remote_root.join(&entry.path);
		symlink(&target, &local_path)
			.map_err(|e| MaterializeError::Io { path: entry.path.clone(), source: e })?;
		report.symlinked.push(entry.path.clone());
	}
	Ok(())
}

fn to_materialize_error(e: crate::error::PihError) -> MaterializeError {
	MaterializeError::Io { path: String::new(), source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()) }
}

/// Step 3: copy each selected path from remote to local, preserving
/// mtime, overwriting any symlink that occupies the path. Individual
/// failures are accumulated into the report rather than aborting (§7
/// propagation rules).
pub fn transfer_in(
	local_root: &Path,
	remote_root: &Path,
	selection: &Selection,
	mut progress: Option<&mut Progress>,
	report: &mut MaterializeReport,
) -> Result<(), MaterializeError> {
	let mut paths: Vec<&String> =
		selection.directories.iter().chain(selection.files.iter()).collect();
	paths.sort_by_key(|p| p.matches('/').count());

	let total: u64 = paths
		.iter()
		.map(|p| fs::symlink_metadata(remote_root.join(p)).map(|m| m.len()).unwrap_or(0))
		.sum();
	let mut done = 0u64;

	for path in paths {
		if let Err(e) = transfer_one(local_root, remote_root, path) {
			report.failed.push((path.clone(), e.to_string()));
			continue;
		}
		report.transferred.push(path.clone());
		done += fs::symlink_metadata(remote_root.join(path)).map(|m| m.len()).unwrap_or(0);
		if let Some(ref mut cb) = progress {
			cb(done, total);
		}
	}
	Ok(())
}

fn transfer_one(local_root: &Path, remote_root: &Path, path: &str) -> Result<(), std::io::Error> {
	let src = remote_root.join(path);
	let dst = local_root.join(path);
	let metadata = fs::symlink_metadata(&src)?;

	if metadata.is_dir() {
		fs::create_dir_all(&dst)?;
		return copy_dir_contents(&src, &dst);
	}

	copy_file(&src, &dst, &metadata)
}

/// Walk `src`'s descendants, recreating directories and copying files
/// into the matching path under `dst`. Mirrors `setup_from_local`'s
/// recursive entry-by-entry transfer, but driven by a live directory
/// walk rather than a pre-collected scan.
fn copy_dir_contents(src: &Path, dst: &Path) -> Result<(), std::io::Error> {
	for entry in fs::read_dir(src)? {
		let entry = entry?;
		let entry_src = entry.path();
		let entry_dst = dst.join(entry.file_name());
		let metadata = fs::symlink_metadata(&entry_src)?;

		if metadata.is_dir() {
			fs::create_dir_all(&entry_dst)?;
			copy_dir_contents(&entry_src, &entry_dst)?;
		} else if metadata.file_type().is_symlink() {
			continue;
		} else {
			copy_file(&entry_src, &entry_dst, &metadata)?;
		}
	}
	Ok(())
}

fn copy_file(src: &Path, dst: &Path, metadata: &fs::Metadata) -> Result<(), std::io::Error> {
	if let Ok(existing) = fs::symlink_metadata(dst) {
		if existing.file_type().is_symlink() {
			fs::remove_file(dst)?;
		}
	}
	if let Some(parent) = dst.parent() {
		fs::create_dir_all(parent)?;
	}
	fs::copy(src, dst)?;
	let mtime = filetime::FileTime::from_last_modification_time(metadata);
	filetime::set_file_mtime(dst, mtime)?;
	Ok(())
}

/// Step 4: mark newly materialized paths as local and newly symlinked
/// paths as non-local in LPDB. LPDB itself only tracks priority, so
/// this amounts to ensuring membership; callers track local/symlinked
/// state alongside via the report.
pub fn sync_lpdb_membership(
	lpdb: &Lpdb,
	report: &MaterializeReport,
) -> Result<(), crate::error::PihError> {
	for path in &report.transferred {
		if lpdb.get(path)?.is_none() {
			lpdb.add_paths(&[path.clone()], &[], 0.0, false)?;
		}
	}
	Ok(())
}

/// `setup_from_local`: transfer everything from local to remote
/// (excluding matched patterns and unsafe symlinks), then overlay
/// local with symlinks.
pub fn setup_from_local(
	local_root: &Path,
	remote_root: &Path,
	entries: &[crate::scanner::Entry],
) -> Result<MaterializeReport, MaterializeError> {
	let mut report = MaterializeReport::default();
	let mut sorted: Vec<&crate::scanner::Entry> = entries.iter().collect();
	sorted.sort_by_key(|e| e.rel_path.components().count());

	for entry in sorted {
		let rel = entry.rel_path.to_string_lossy().to_string();
		let src = local_root.join(&rel);
		let dst = remote_root.join(&rel);
		match entry.stat.kind {
			crate::scanner::Kind::Dir => {
				fs::create_dir_all(&dst).map_err(|e| MaterializeError::Io { path: rel.clone(), source: e })?;
			}
			crate::scanner::Kind::File => {
				if let Some(parent) = dst.parent() {
					fs::create_dir_all(parent)
						.map_err(|e| MaterializeError::Io { path: rel.clone(), source: e })?;
				}
				fs::copy(&src, &dst).map_err(|e| MaterializeError::Io { path: rel.clone(), source: e })?;
				report.transferred.push(rel.clone());
			}
			crate::scanner::Kind::Symlink => {}
		}
	}
	Ok(report)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::scanner::{Entry, Kind, Stat};
	use std::path::PathBuf;
	use tempfile::TempDir;

	#[test]
	fn remove_stale_deletes_leaf_first() {
		let tmp = TempDir::new().unwrap();
		fs::create_dir_all(tmp.path().join("a/b")).unwrap();
		fs::write(tmp.path().join("a/b/c.txt"), b"x").unwrap();

		let materialized = vec!["a".to_string(), "a/b".to_string(), "a/b/c.txt".to_string()];
		let selected = HashSet::new();
		let mut report = MaterializeReport::default();
		remove_stale(tmp.path(), &materialized, &selected, &mut report).unwrap();
		assert!(!tmp.path().join("a").exists());
	}

	#[test]
	fn overlay_symlinks_creates_dirs_and_links() {
		let local = TempDir::new().unwrap();
		let remote = TempDir::new().unwrap();
		fs::create_dir_all(remote.path().join("a")).unwrap();
		fs::write(remote.path().join("a/f.txt"), b"x").unwrap();

		let db = TempDir::new().unwrap();
		let rmdb = Rmdb::open(&db.path().join("r.db")).unwrap();
		rmdb.add_paths(&["a/f.txt".to_string()], &["a".to_string()], 0.0).unwrap();

		let mut report = MaterializeReport::default();
		overlay_symlinks(local.path(), remote.path(), &rmdb, &HashSet::new(), false, &mut report).unwrap();
		assert!(local.path().join("a").is_dir());
		assert!(fs::symlink_metadata(local.path().join("a/f.txt")).unwrap().file_type().is_symlink());
	}

	#[test]
	fn overlay_symlinks_skips_selected_paths_even_with_overwrite() {
		let local = TempDir::new().unwrap();
		let remote = TempDir::new().unwrap();
		fs::write(remote.path().join("f.txt"), b"remote").unwrap();
		fs::write(local.path().join("f.txt"), b"local materialized").unwrap();

		let db = TempDir::new().unwrap();
		let rmdb = Rmdb::open(&db.path().join("r.db")).unwrap();
		rmdb.add_paths(&["f.txt".to_string()], &[], 0.0).unwrap();

		let selected: HashSet<String> = ["f.txt".to_string()].into_iter().collect();
		let mut report = MaterializeReport::default();
		overlay_symlinks(local.path(), remote.path(), &rmdb, &selected, true, &mut report).unwrap();

		assert!(!fs::symlink_metadata(local.path().join("f.txt")).unwrap().file_type().is_symlink());
		assert_eq!(fs::read(local.path().join("f.txt")).unwrap(), b"local materialized");
	}

	#[test]
	fn transfer_in_copies_directory_contents_recursively() {
		let local = TempDir::new().unwrap();
		let remote = TempDir::new().unwrap();
		fs::create_dir_all(remote.path().join("a/b")).unwrap();
		fs::write(remote.path().join("a/one.txt"), b"1").unwrap();
		fs::write(remote.path().join("a/b/two.txt"), b"2").unwrap();

		let selection = crate::selection::Selection {
			directories: ["a".to_string()].into_iter().collect(),
			files: HashSet::new(),
		};
		let mut report = MaterializeReport::default();
		transfer_in(local.path(), remote.path(), &selection, None, &mut report).unwrap();

		assert_eq!(fs::read(local.path().join("a/one.txt")).unwrap(), b"1");
		assert_eq!(fs::read(local.path().join("a/b/two.txt")).unwrap(), b"2");
	}

	#[test]
	fn setup_from_local_copies_files_to_remote() {
		let local = TempDir::new().unwrap();
		let remote = TempDir::new().unwrap();
		fs::write(local.path().join("x.txt"), b"hello").unwrap();

		let entries = vec![Entry {
			rel_path: PathBuf::from("x.txt"),
			stat: Stat { kind: Kind::File, size: 5, mtime: 0.0 },
		}];
		let report = setup_from_local(local.path(), remote.path(), &entries).unwrap();
		assert_eq!(report.transferred, vec!["x.txt".to_string()]);
		assert!(remote.path().join("x.txt").exists());
	}
}

// vim: ts=4
