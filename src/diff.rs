//! Difference engine (§4.8): computes added/modified/deleted path sets
//! across LPDB, RMDB, and the local and remote scans, relative to the
//! last-sync timestamp.

use std::collections::{HashMap, HashSet};

use crate::exclude::ExcludeMatcher;
use crate::lpdb::Lpdb;
use crate::rmdb::Rmdb;
use crate::scanner::{self, Entry, Kind};

#[derive(Debug, Default)]
pub struct Difference {
	pub local_added: HashSet<String>,
	pub remote_added: HashSet<String>,
	pub local_modified: HashSet<String>,
	pub remote_modified: HashSet<String>,
	pub local_deleted: HashSet<String>,
	pub remote_deleted: HashSet<String>,
	/// Of `remote_deleted`, those this client had already symlinked
	/// away (RMDB shows the remote path still existing as `local =
	/// false` for this client's own LPDB) rather than held a real copy
	/// of — eligible for trash-reuse consideration.
	pub trash_bound: HashSet<String>,
}

fn path_string(entry: &Entry) -> String {
	entry.rel_path.to_string_lossy().replace('\\', "/")
}

fn index_by_path(entries: &[Entry]) -> HashMap<String, &Entry> {
	entries.iter().map(|e| (path_string(e), e)).collect()
}

/// Compute the full difference for one reconciliation pass.
pub fn compute(
	lpdb: &Lpdb,
	rmdb: &Rmdb,
	local_scan: &[Entry],
	remote_scan: &[Entry],
	local_root: &std::path::Path,
	exclude: &ExcludeMatcher,
	last_sync: f64,
) -> Result<Difference, crate::error::ZielenError> {
	let lpdb_paths = lpdb.subtree(None)?;
	let lpdb_set: HashSet<String> = lpdb_paths.iter().map(|p| p.path.clone()).collect();
	let rmdb_paths = rmdb.subtree(None, None, None)?;
	let rmdb_set: HashSet<String> = rmdb_paths.iter().map(|p| p.path.clone()).collect();

	let local_by_path = index_by_path(local_scan);
	let remote_by_path = index_by_path(remote_scan);

	let mut diff = Difference::default();

	for (path, entry) in &local_by_path {
		if lpdb_set.contains(path) {
			continue;
		}
		if entry.stat.kind == Kind::Symlink
			&& scanner::is_unsafe_symlink(local_root, &entry.rel_path).unwrap_or(true)
		{
			continue;
		}
		if exclude.is_excluded(&entry.rel_path) {
			continue;
		}
		diff.local_added.insert(path.clone());
	}

	for path in remote_by_path.keys() {
		if !lpdb_set.contains(path) {
			diff.remote_added.insert(path.clone());
		}
	}

	for path in &lpdb_set {
		if let Some(entry) = local_by_path.get(path) {
			if entry.stat.kind == Kind::File && entry.stat.mtime > last_sync {
				diff.local_modified.insert(path.clone());
			}
		}
	}

	for path in &lpdb_set {
		let mtime_modified = remote_by_path
			.get(path)
			.map(|e| e.stat.kind == Kind::File && e.stat.mtime > last_sync)
			.unwrap_or(false);
		let rmdb_modified = rmdb
			.get(path)
			.ok()
			.flatten()
			.map(|e| !e.is_dir && e.last_sync > last_sync)
			.unwrap_or(false);
		if mtime_modified || rmdb_modified {
			diff.remote_modified.insert(path.clone());
		}
	}

	let mut local_deleted: HashSet<String> = lpdb_set
		.iter()
		.filter(|p| !local_by_path.contains_key(p.as_str()))
		.cloned()
		.collect();
	prune_descendants_of_deleted_ancestor(&mut local_deleted, &lpdb_paths);
	diff.local_deleted = local_deleted;

	let mut remote_deleted: HashSet<String> = lpdb_set
		.iter()
		.filter(|p| !remote_by_path.contains_key(p.as_str()))
		.cloned()
		.collect();
	prune_descendants_of_deleted_ancestor(&mut remote_deleted, &lpdb_paths);
	diff.remote_deleted = remote_deleted;

	for path in &diff.remote_deleted {
		if rmdb_set.contains(path) {
			diff.trash_bound.insert(path.clone());
		}
	}

	Ok(diff)
}

/// Remove from `deleted` any path that has an ancestor also in
/// `deleted` — deleting a directory subsumes its descendants.
fn prune_descendants_of_deleted_ancestor(
	deleted: &mut HashSet<String>,
	universe: &[crate::lpdb::PathPriority],
) {
	let dirs: HashSet<&String> = universe
		.iter()
		.filter(|p| p.is_dir && deleted.contains(&p.path))
		.map(|p| &p.path)
		.collect();
	deleted.retain(|path| !dirs.iter().any(|dir| path.as_str() != dir.as_str() && path.starts_with(dir.as_str())));
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::scanner::Stat;
	use std::path::PathBuf;

	fn entry(path: &str, kind: Kind, mtime: f64) -> Entry {
		Entry { rel_path: PathBuf::from(path), stat: Stat { kind, size: 1, mtime } }
	}

	#[test]
	fn deleting_directory_subsumes_descendants() {
		let mut deleted: HashSet<String> =
			["a".to_string(), "a/b.txt".to_string(), "a/c".to_string(), "a/c/d.txt".to_string()]
				.into_iter()
				.collect();
		let universe = vec![
			crate::lpdb::PathPriority { path: "a".to_string(), is_dir: true, priority: 0.0 },
			crate::lpdb::PathPriority { path: "a/c".to_string(), is_dir: true, priority: 0.0 },
		];
		prune_descendants_of_deleted_ancestor(&mut deleted, &universe);
		assert_eq!(deleted, ["a".to_string()].into_iter().collect());
	}

	#[test]
	fn compute_detects_local_added_and_modified() {
		use tempfile::TempDir;

		let tmp = TempDir::new().unwrap();
		let lpdb = Lpdb::open(&tmp.path().join("local.db")).unwrap();
		let rmdb = Rmdb::open(&tmp.path().join("remote.db")).unwrap();
		lpdb.add_paths(&["old.txt".to_string()], &[], 1.0, false).unwrap();
		rmdb.add_paths(&["old.txt".to_string()], &[], 0.0).unwrap();

		let local_root = tmp.path().join("local_root");
		std::fs::create_dir(&local_root).unwrap();
		let exclude = ExcludeMatcher::parse("").unwrap();

		let local_scan = vec![entry("old.txt", Kind::File, 5.0), entry("new.txt", Kind::File, 5.0)];
		let remote_scan = vec![entry("old.txt", Kind::File, 0.0)];

		let diff =
			compute(&lpdb, &rmdb, &local_scan, &remote_scan, &local_root, &exclude, 1.0).unwrap();
		assert!(diff.local_added.contains("new.txt"));
		assert!(diff.local_modified.contains("old.txt"));
		assert!(diff.remote_deleted.is_empty());
	}
}

// vim: ts=4
