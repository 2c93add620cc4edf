//! Scenario A (§8): a profile initialized from local, then one new
//! local file appears before the next sync. After sync the remote
//! mirrors every local path.

use std::collections::HashSet;
use std::fs;

use tempfile::TempDir;
use zielen_core::exclude::ExcludeMatcher;
use zielen_core::lpdb::Lpdb;
use zielen_core::rmdb::Rmdb;
use zielen_core::scanner::{self, Include};
use zielen_core::{diff, materializer};

fn write(root: &std::path::Path, rel: &str, contents: &[u8]) {
	let full = root.join(rel);
	fs::create_dir_all(full.parent().unwrap()).unwrap();
	fs::write(full, contents).unwrap();
}

#[test]
fn new_local_file_propagates_to_remote() {
	let local = TempDir::new().unwrap();
	let remote = TempDir::new().unwrap();
	let dbs = TempDir::new().unwrap();

	write(local.path(), "letters/a.txt", b"a");
	write(local.path(), "letters/upper/A.txt", b"A");
	write(local.path(), "numbers/1.txt", b"1");

	let initial_scan = scanner::scan(local.path(), Include::default(), None, false).unwrap();
	materializer::setup_from_local(local.path(), remote.path(), &initial_scan).unwrap();

	let lpdb = Lpdb::open(&dbs.path().join("local.db")).unwrap();
	let rmdb = Rmdb::open(&dbs.path().join("remote.db")).unwrap();
	let (files, dirs): (Vec<String>, Vec<String>) = initial_scan
		.iter()
		.map(|e| e.rel_path.to_string_lossy().to_string())
		.partition(|p| !local.path().join(p).is_dir());
	lpdb.add_paths(&files, &dirs, 0.0, false).unwrap();
	rmdb.add_paths(&files, &dirs, 0.0).unwrap();

	// Before the second sync, a new local file appears.
	write(local.path(), "letters/upper/B.txt", b"BB");

	let exclude = ExcludeMatcher::parse("").unwrap();
	let local_scan = scanner::scan(local.path(), Include::default(), Some(&exclude), false).unwrap();
	let remote_scan = scanner::scan(remote.path(), Include::default(), None, false).unwrap();

	let difference =
		diff::compute(&lpdb, &rmdb, &local_scan, &remote_scan, local.path(), &exclude, 0.0).unwrap();
	assert!(difference.local_added.contains("letters/upper/B.txt"));

	for path in &difference.local_added {
		let src = local.path().join(path);
		let dst = remote.path().join(path);
		fs::create_dir_all(dst.parent().unwrap()).unwrap();
		fs::copy(&src, &dst).unwrap();
	}
	rmdb.add_paths(&difference.local_added.iter().cloned().collect::<Vec<_>>(), &[], 0.0).unwrap();

	let final_remote_scan = scanner::scan(remote.path(), Include::default(), None, false).unwrap();
	let final_paths: HashSet<String> =
		final_remote_scan.iter().map(|e| e.rel_path.to_string_lossy().to_string()).collect();

	let expected: HashSet<String> = [
		"letters",
		"letters/upper",
		"numbers",
		"letters/a.txt",
		"letters/upper/A.txt",
		"letters/upper/B.txt",
		"numbers/1.txt",
	]
	.into_iter()
	.map(String::from)
	.collect();
	assert_eq!(final_paths, expected);
}

// vim: ts=4
