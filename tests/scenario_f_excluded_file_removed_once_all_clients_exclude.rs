//! Scenario F (§8): two clients share one remote directory. Client 1
//! excludes `letters/upper/B.txt` and removes it from the shared
//! remote and RMDB; client 2, which had not excluded it, then observes
//! the path missing from the remote scan and drops it from its own
//! LPDB on its next pass like any other remote deletion.

use std::fs;

use tempfile::TempDir;
use zielen_core::diff;
use zielen_core::exclude::ExcludeMatcher;
use zielen_core::lpdb::Lpdb;
use zielen_core::rmdb::Rmdb;
use zielen_core::scanner::{self, Include};

#[test]
fn excluding_client_removes_it_and_the_other_clients_lpdb_drops_it_too() {
	let remote = TempDir::new().unwrap();
	fs::create_dir_all(remote.path().join("letters/upper")).unwrap();
	fs::write(remote.path().join("letters/upper/B.txt"), b"shared").unwrap();

	let dbs = TempDir::new().unwrap();
	let rmdb = Rmdb::open(&dbs.path().join("remote.db")).unwrap(); // shared state
	let client1_lpdb = Lpdb::open(&dbs.path().join("client1.db")).unwrap();
	let client2_lpdb = Lpdb::open(&dbs.path().join("client2.db")).unwrap();
	rmdb.add_paths(
		&["letters/upper/B.txt".to_string()],
		&["letters".to_string(), "letters/upper".to_string()],
		0.0,
	)
	.unwrap();
	client1_lpdb
		.add_paths(
			&["letters/upper/B.txt".to_string()],
			&["letters".to_string(), "letters/upper".to_string()],
			0.0,
			false,
		)
		.unwrap();
	client2_lpdb
		.add_paths(
			&["letters/upper/B.txt".to_string()],
			&["letters".to_string(), "letters/upper".to_string()],
			0.0,
			false,
		)
		.unwrap();

	// Client 1 excludes the path and, on its sync pass, removes it from
	// the shared remote since it is still RMDB-tracked.
	let client1_exclude = ExcludeMatcher::parse("/letters/upper/B.txt\n").unwrap();
	let client1_local = TempDir::new().unwrap();
	fs::create_dir_all(client1_local.path().join("letters/upper")).unwrap();
	fs::write(client1_local.path().join("letters/upper/B.txt"), b"shared").unwrap();

	let matches = client1_exclude.matches(client1_local.path()).unwrap();
	for path in &matches.all_matches {
		let rel = path.to_string_lossy().to_string();
		if rmdb.get(&rel).unwrap().is_some() {
			let full = remote.path().join(path);
			if full.is_dir() {
				fs::remove_dir_all(&full).unwrap();
			} else {
				fs::remove_file(&full).unwrap();
			}
			rmdb.rm_paths(&[rel.clone()]).unwrap();
			client1_lpdb.rm_paths(&[rel]).unwrap();
		}
	}
	assert!(!remote.path().join("letters/upper/B.txt").exists());
	assert!(client1_lpdb.get("letters/upper/B.txt").unwrap().is_none());

	// Client 2 had not excluded the path, so its next pass sees a
	// remote deletion: the path is tracked in its LPDB but absent from
	// the remote scan, and gets dropped like any other deleted file.
	let client2_local = TempDir::new().unwrap();
	fs::create_dir_all(client2_local.path().join("letters/upper")).unwrap();
	fs::write(client2_local.path().join("letters/upper/B.txt"), b"shared").unwrap();
	let no_exclude = ExcludeMatcher::parse("").unwrap();

	let local_scan =
		scanner::scan(client2_local.path(), Include::default(), Some(&no_exclude), false).unwrap();
	let remote_scan = scanner::scan(remote.path(), Include::default(), None, false).unwrap();
	let difference = diff::compute(
		&client2_lpdb,
		&rmdb,
		&local_scan,
		&remote_scan,
		client2_local.path(),
		&no_exclude,
		0.0,
	)
	.unwrap();
	assert!(difference.remote_deleted.contains("letters/upper/B.txt"));

	for path in &difference.remote_deleted {
		client2_lpdb.rm_paths(&[path.clone()]).unwrap();
		let _ = fs::remove_file(client2_local.path().join(path));
	}

	assert!(client2_lpdb.get("letters/upper/B.txt").unwrap().is_none());
	assert!(!client2_local.path().join("letters/upper/B.txt").exists());
}

// vim: ts=4
