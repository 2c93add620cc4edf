//! Black-box coverage for two of the §8 universal properties not
//! exercised elsewhere: `setup_from_local` round-trips every local
//! path onto the remote, and a second difference computation against
//! unchanged state produces no further work (idempotence).

use std::collections::HashSet;
use std::fs;

use tempfile::TempDir;
use zielen_core::exclude::ExcludeMatcher;
use zielen_core::lpdb::Lpdb;
use zielen_core::rmdb::Rmdb;
use zielen_core::scanner::{self, Include};
use zielen_core::{diff, materializer};

#[test]
fn setup_from_local_round_trips_every_path() {
	let local = TempDir::new().unwrap();
	let remote = TempDir::new().unwrap();

	fs::create_dir_all(local.path().join("a/b")).unwrap();
	fs::write(local.path().join("a/b/c.txt"), b"x").unwrap();
	fs::write(local.path().join("top.txt"), b"y").unwrap();

	let scan = scanner::scan(local.path(), Include::default(), None, false).unwrap();
	materializer::setup_from_local(local.path(), remote.path(), &scan).unwrap();

	let local_paths: HashSet<String> =
		scan.iter().map(|e| e.rel_path.to_string_lossy().to_string()).collect();
	let remote_scan = scanner::scan(remote.path(), Include::default(), None, false).unwrap();
	let remote_paths: HashSet<String> =
		remote_scan.iter().map(|e| e.rel_path.to_string_lossy().to_string()).collect();

	assert_eq!(local_paths, remote_paths);
}

#[test]
fn a_second_pass_over_unchanged_state_finds_nothing_to_do() {
	let local = TempDir::new().unwrap();
	let remote = TempDir::new().unwrap();
	let dbs = TempDir::new().unwrap();

	fs::create_dir_all(local.path().join("a")).unwrap();
	fs::create_dir_all(remote.path().join("a")).unwrap();
	fs::write(local.path().join("a/x.txt"), b"x").unwrap();
	fs::write(remote.path().join("a/x.txt"), b"x").unwrap();

	let lpdb = Lpdb::open(&dbs.path().join("local.db")).unwrap();
	let rmdb = Rmdb::open(&dbs.path().join("remote.db")).unwrap();
	lpdb.add_paths(&["a/x.txt".to_string()], &["a".to_string()], 0.0, false).unwrap();
	rmdb.add_paths(&["a/x.txt".to_string()], &["a".to_string()], 0.0).unwrap();

	let exclude = ExcludeMatcher::parse("").unwrap();
	let last_sync = 1_000_000.0;
	// Both sides last touched long before last_sync: nothing moved.
	filetime::set_file_mtime(
		local.path().join("a/x.txt"),
		filetime::FileTime::from_unix_time(1_000, 0),
	)
	.unwrap();
	filetime::set_file_mtime(
		remote.path().join("a/x.txt"),
		filetime::FileTime::from_unix_time(1_000, 0),
	)
	.unwrap();

	for _ in 0..2 {
		let local_scan = scanner::scan(local.path(), Include::default(), Some(&exclude), false).unwrap();
		let remote_scan = scanner::scan(remote.path(), Include::default(), None, false).unwrap();
		let difference = diff::compute(
			&lpdb,
			&rmdb,
			&local_scan,
			&remote_scan,
			local.path(),
			&exclude,
			last_sync,
		)
		.unwrap();

		assert!(difference.local_added.is_empty());
		assert!(difference.remote_added.is_empty());
		assert!(difference.local_modified.is_empty());
		assert!(difference.remote_modified.is_empty());
		assert!(difference.local_deleted.is_empty());
		assert!(difference.remote_deleted.is_empty());
	}
}

// vim: ts=4
