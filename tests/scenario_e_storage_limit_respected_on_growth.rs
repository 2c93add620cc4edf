//! Scenario E (§8): building on the materialized state from Scenario
//! B, another client adds a larger remote file. The storage limit is
//! unchanged, so the new file is symlinked rather than materialized,
//! and every previously materialized file stays materialized.

use std::collections::HashSet;
use std::fs;

use tempfile::TempDir;
use zielen_core::materializer::{self, MaterializeReport};
use zielen_core::rmdb::Rmdb;
use zielen_core::selection::{self, Candidate, SelectionInput};

const BLOCK: u64 = 512;

#[test]
fn new_large_remote_file_symlinked_existing_selection_preserved() {
	let local = TempDir::new().unwrap();
	let remote = TempDir::new().unwrap();
	fs::create_dir_all(remote.path().join("letters/upper")).unwrap();
	fs::create_dir_all(remote.path().join("numbers")).unwrap();
	fs::write(remote.path().join("letters/a.txt"), vec![0u8; (3 * BLOCK) as usize]).unwrap();
	fs::write(remote.path().join("letters/upper/A.txt"), vec![0u8; (4 * BLOCK) as usize]).unwrap();
	fs::write(remote.path().join("numbers/1.txt"), vec![0u8; (7 * BLOCK) as usize]).unwrap();
	fs::write(remote.path().join("_.txt"), vec![0u8; BLOCK as usize]).unwrap();

	let dbs = TempDir::new().unwrap();
	let rmdb = Rmdb::open(&dbs.path().join("remote.db")).unwrap();
	rmdb.add_paths(
		&[
			"letters/a.txt".to_string(),
			"letters/upper/A.txt".to_string(),
			"numbers/1.txt".to_string(),
			"_.txt".to_string(),
		],
		&["letters".to_string(), "letters/upper".to_string(), "numbers".to_string()],
		0.0,
	)
	.unwrap();

	let mut report = MaterializeReport::default();
	materializer::overlay_symlinks(local.path(), remote.path(), &rmdb, &HashSet::new(), false, &mut report).unwrap();
	let initial_selection = selection::select(&SelectionInput {
		excluded_remote_files: Vec::new(),
		directories: Vec::new(),
		files: vec![
			Candidate { path: "letters/a.txt".into(), priority: 1.0, size: 3 * BLOCK },
			Candidate { path: "letters/upper/A.txt".into(), priority: 1.0, size: 4 * BLOCK },
			Candidate { path: "numbers/1.txt".into(), priority: 1.0, size: 7 * BLOCK },
			Candidate { path: "_.txt".into(), priority: 1.0, size: BLOCK },
		],
		storage_limit: 10 * BLOCK,
		account_for_size: true,
		block_size: BLOCK,
		sync_extra_files: true,
	})
	.unwrap();
	materializer::transfer_in(local.path(), remote.path(), &initial_selection, None, &mut report).unwrap();

	// Another client adds a 5-block file.
	fs::write(remote.path().join("letters/upper/B.txt"), vec![0u8; (5 * BLOCK) as usize]).unwrap();
	rmdb.add_paths(&["letters/upper/B.txt".to_string()], &[], 0.0).unwrap();

	let grown_selection = selection::select(&SelectionInput {
		excluded_remote_files: Vec::new(),
		directories: Vec::new(),
		files: vec![
			Candidate { path: "letters/a.txt".into(), priority: 1.0, size: 3 * BLOCK },
			Candidate { path: "letters/upper/A.txt".into(), priority: 1.0, size: 4 * BLOCK },
			Candidate { path: "numbers/1.txt".into(), priority: 1.0, size: 7 * BLOCK },
			Candidate { path: "_.txt".into(), priority: 1.0, size: BLOCK },
			Candidate { path: "letters/upper/B.txt".into(), priority: 1.0, size: 5 * BLOCK },
		],
		storage_limit: 10 * BLOCK,
		account_for_size: true,
		block_size: BLOCK,
		sync_extra_files: true,
	})
	.unwrap();
	assert!(!grown_selection.files.contains("letters/upper/B.txt"));
	assert_eq!(grown_selection.files, initial_selection.files);

	materializer::overlay_symlinks(local.path(), remote.path(), &rmdb, &HashSet::new(), false, &mut report).unwrap();
	materializer::transfer_in(local.path(), remote.path(), &grown_selection, None, &mut report).unwrap();

	let new_file_meta = fs::symlink_metadata(local.path().join("letters/upper/B.txt")).unwrap();
	assert!(new_file_meta.file_type().is_symlink());

	for materialized in ["letters/a.txt", "letters/upper/A.txt", "_.txt"] {
		let meta = fs::symlink_metadata(local.path().join(materialized)).unwrap();
		assert!(!meta.file_type().is_symlink(), "{materialized} should remain materialized");
	}
}

// vim: ts=4
