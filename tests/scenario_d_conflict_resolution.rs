//! Scenario D (§8): both sides modify `letters/a.txt` since the last
//! sync, local later than remote. The older (remote) copy is renamed
//! aside with a `_conflict-` suffix; the newer content then propagates
//! to fill the freed original path, and the conflict file itself
//! propagates like any other newly added path, so both sides end up
//! agreeing on the original path and carrying exactly one conflict
//! file each.

use std::collections::HashSet;
use std::fs;

use tempfile::TempDir;
use zielen_core::conflict::{self, Side};
use zielen_core::lpdb::Lpdb;
use zielen_core::rmdb::Rmdb;

fn conflict_files(dir: &std::path::Path) -> Vec<String> {
	fs::read_dir(dir)
		.unwrap()
		.filter_map(|e| e.ok())
		.map(|e| e.file_name().to_string_lossy().to_string())
		.filter(|name| name.contains("_conflict-"))
		.collect()
}

#[test]
fn newer_side_wins_original_path_older_side_conflict_file_propagates() {
	let local = TempDir::new().unwrap();
	let remote = TempDir::new().unwrap();
	fs::create_dir_all(local.path().join("letters")).unwrap();
	fs::create_dir_all(remote.path().join("letters")).unwrap();
	fs::write(local.path().join("letters/a.txt"), b"local edit").unwrap();
	fs::write(remote.path().join("letters/a.txt"), b"remote edit").unwrap();

	let dbs = TempDir::new().unwrap();
	let lpdb = Lpdb::open(&dbs.path().join("local.db")).unwrap();
	let rmdb = Rmdb::open(&dbs.path().join("remote.db")).unwrap();
	lpdb.add_paths(&["letters/a.txt".to_string()], &["letters".to_string()], 0.0, false).unwrap();
	rmdb.add_paths(&["letters/a.txt".to_string()], &["letters".to_string()], 0.0).unwrap();

	let modified: HashSet<String> = ["letters/a.txt".to_string()].into_iter().collect();
	let now = 1_700_000_000.0;

	// Local is later than remote.
	let resolutions = conflict::resolve(
		&modified,
		&modified,
		|_| Some(150.0),
		|_| Some(50.0),
		local.path(),
		remote.path(),
		&lpdb,
		&rmdb,
		now,
	)
	.unwrap();

	assert_eq!(resolutions.len(), 1);
	let resolution = &resolutions[0];
	assert_eq!(resolution.renamed_side_was_older, Side::Remote);
	assert!(resolution.renamed_path.starts_with("letters/a_conflict-"));
	assert!(resolution.renamed_path.ends_with(".txt"));

	// Remote's original path was freed by the rename; the newer (local)
	// content fills it, same as any ordinary modified-file transfer.
	let dst = remote.path().join("letters/a.txt");
	assert!(!dst.exists(), "rename should have freed the original remote path");
	fs::copy(local.path().join("letters/a.txt"), &dst).unwrap();
	rmdb.update_sync_time(&["letters/a.txt".to_string()], now).unwrap();

	// The conflict file itself is a newly added path on the remote side
	// and propagates to local exactly like any other new file.
	fs::copy(
		remote.path().join(&resolution.renamed_path),
		local.path().join(&resolution.renamed_path),
	)
	.unwrap();
	lpdb.add_paths(&[resolution.renamed_path.clone()], &[], 0.0, false).unwrap();

	assert_eq!(fs::read(local.path().join("letters/a.txt")).unwrap(), b"local edit");
	assert_eq!(fs::read(remote.path().join("letters/a.txt")).unwrap(), b"local edit");

	let local_conflicts = conflict_files(&local.path().join("letters"));
	let remote_conflicts = conflict_files(&remote.path().join("letters"));
	assert_eq!(local_conflicts.len(), 1);
	assert_eq!(remote_conflicts.len(), 1);
	assert_eq!(local_conflicts[0], remote_conflicts[0]);
}

// vim: ts=4
