//! Trash-reuse oracle (§4.6): before moving a remote file into the
//! remote trash, ask whether a copy already sits in one of the user's
//! configured local trash directories. Size-conservative: a size
//! mismatch is decisive and skips digest computation entirely.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::TrashError;

struct TrashEntry {
	path: PathBuf,
	size: u64,
}

pub struct TrashOracle {
	entries: Vec<TrashEntry>,
}

impl TrashOracle {
	/// Enumerate the top-level entries of every configured trash
	/// directory. Directories are treated as a single unit whose size
	/// is the recursive sum of their contents.
	pub fn scan(trash_dirs: &[PathBuf]) -> Result<Self, TrashError> {
		let mut entries = Vec::new();
		for dir in trash_dirs {
			let read_dir = match fs::read_dir(dir) {
				Ok(rd) => rd,
				Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
				Err(e) => return Err(TrashError::Io(e)),
			};
			for item in read_dir {
				let item = item?;
				let path = item.path();
				let size = dir_size(&path)?;
				entries.push(TrashEntry { path, size });
			}
		}
		Ok(TrashOracle { entries })
	}

	/// Does a copy of `candidate` already exist in trash? Size-tied
	/// entries only are digested; a size mismatch is decisive.
	pub fn contains(&self, candidate: &Path) -> Result<bool, TrashError> {
		let candidate_size = dir_size(candidate)?;
		let tied: Vec<&TrashEntry> =
			self.entries.iter().filter(|e| e.size == candidate_size).collect();
		if tied.is_empty() {
			return Ok(false);
		}

		let candidate_digest = digest(candidate)?;
		for entry in tied {
			if digest(&entry.path)? == candidate_digest {
				return Ok(true);
			}
		}
		Ok(false)
	}
}

fn dir_size(path: &Path) -> Result<u64, TrashError> {
	let metadata = fs::symlink_metadata(path)?;
	if !metadata.is_dir() {
		return Ok(metadata.len());
	}
	let mut total = 0u64;
	for entry in fs::read_dir(path)? {
		let entry = entry?;
		total += dir_size(&entry.path())?;
	}
	Ok(total)
}

/// BLAKE3 content digest of a file, or the recursive concatenation of
/// descendant digests for a directory. SHA-256 is used as a fallback
/// when BLAKE3 hashing of a file fails (e.g. unreadable permissions on
/// one descendant while others still contribute to the composite).
fn digest(path: &Path) -> Result<Vec<u8>, TrashError> {
	let metadata = fs::symlink_metadata(path)?;
	if metadata.is_dir() {
		let mut hasher = blake3::Hasher::new();
		let mut children: Vec<_> = fs::read_dir(path)?.collect::<Result<Vec<_>, _>>()?;
		children.sort_by_key(|e| e.file_name());
		for child in children {
			hasher.update(&digest(&child.path())?);
		}
		return Ok(hasher.finalize().as_bytes().to_vec());
	}

	match hash_file_blake3(path) {
		Ok(d) => Ok(d),
		Err(_) => hash_file_sha256(path),
	}
}

fn hash_file_blake3(path: &Path) -> Result<Vec<u8>, TrashError> {
	let mut file = fs::File::open(path)?;
	let mut hasher = blake3::Hasher::new();
	let mut buf = [0u8; 65536];
	loop {
		let n = file.read(&mut buf)?;
		if n == 0 {
			break;
		}
		hasher.update(&buf[..n]);
	}
	Ok(hasher.finalize().as_bytes().to_vec())
}

fn hash_file_sha256(path: &Path) -> Result<Vec<u8>, TrashError> {
	use sha2::{Digest, Sha256};
	let mut file = fs::File::open(path)?;
	let mut hasher = Sha256::new();
	let mut buf = [0u8; 65536];
	loop {
		let n = file.read(&mut buf)?;
		if n == 0 {
			break;
		}
		hasher.update(&buf[..n]);
	}
	Ok(hasher.finalize().to_vec())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs::File;
	use std::io::Write;
	use tempfile::TempDir;

	fn write(path: &Path, contents: &[u8]) {
		File::create(path).unwrap().write_all(contents).unwrap();
	}

	#[test]
	fn finds_identical_file_by_content() {
		let trash = TempDir::new().unwrap();
		write(&trash.path().join("old.txt"), b"same contents");

		let candidate_dir = TempDir::new().unwrap();
		let candidate = candidate_dir.path().join("candidate.txt");
		write(&candidate, b"same contents");

		let oracle = TrashOracle::scan(&[trash.path().to_path_buf()]).unwrap();
		assert!(oracle.contains(&candidate).unwrap());
	}

	#[test]
	fn size_mismatch_is_decisive() {
		let trash = TempDir::new().unwrap();
		write(&trash.path().join("old.txt"), b"short");

		let candidate_dir = TempDir::new().unwrap();
		let candidate = candidate_dir.path().join("candidate.txt");
		write(&candidate, b"a much longer file body");

		let oracle = TrashOracle::scan(&[trash.path().to_path_buf()]).unwrap();
		assert!(!oracle.contains(&candidate).unwrap());
	}

	#[test]
	fn same_size_different_content_is_not_a_match() {
		let trash = TempDir::new().unwrap();
		write(&trash.path().join("old.txt"), b"aaaaa");

		let candidate_dir = TempDir::new().unwrap();
		let candidate = candidate_dir.path().join("candidate.txt");
		write(&candidate, b"bbbbb");

		let oracle = TrashOracle::scan(&[trash.path().to_path_buf()]).unwrap();
		assert!(!oracle.contains(&candidate).unwrap());
	}

	#[test]
	fn directory_candidate_treated_as_single_unit() {
		let trash = TempDir::new().unwrap();
		let old_dir = trash.path().join("old_dir");
		fs::create_dir(&old_dir).unwrap();
		write(&old_dir.join("a.txt"), b"hello");

		let candidate_parent = TempDir::new().unwrap();
		let candidate = candidate_parent.path().join("new_dir");
		fs::create_dir(&candidate).unwrap();
		write(&candidate.join("a.txt"), b"hello");

		let oracle = TrashOracle::scan(&[trash.path().to_path_buf()]).unwrap();
		assert!(oracle.contains(&candidate).unwrap());
	}
}

// vim: ts=4
