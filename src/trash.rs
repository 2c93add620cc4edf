//! Remote trash lifecycle (§4.12): moves deleted remote files into
//! `.zielen/Trash` with collision-free naming, touches their mtime,
//! and ages out entries older than a configured period.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::TrashError;
use crate::lpdb::Lpdb;
use crate::rmdb::Rmdb;

pub fn trash_dir(remote_root: &Path) -> PathBuf {
	remote_root.join(".zielen").join("Trash")
}

/// Derive a collision-free destination filename in `.zielen/Trash` for
/// `basename`: if a file with that name already exists, append `(n)`
/// before the extension with the smallest unused positive `n`.
fn unique_trash_name(dir: &Path, basename: &str) -> PathBuf {
	let candidate = dir.join(basename);
	if !candidate.exists() {
		return candidate;
	}

	let (stem, ext) = match basename.rfind('.') {
		Some(idx) if idx > 0 => (&basename[..idx], &basename[idx..]),
		_ => (basename, ""),
	};

	let mut n = 1u32;
	loop {
		let candidate = dir.join(format!("{}({}){}", stem, n, ext));
		if !candidate.exists() {
			return candidate;
		}
		n += 1;
	}
}

/// Move each of `paths` (remote-relative) into `.zielen/Trash`, remove
/// them from both databases.
pub fn trash_files(
	remote_root: &Path,
	paths: &[String],
	lpdb: &Lpdb,
	rmdb: &Rmdb,
) -> Result<Vec<String>, TrashError> {
	let dir = trash_dir(remote_root);
	fs::create_dir_all(&dir)?;

	let mut trashed = Vec::new();
	for path in paths {
		let src = remote_root.join(path);
		let basename = Path::new(path).file_name().map(|n| n.to_string_lossy().to_string());
		let Some(basename) = basename else { continue };

		let dst = unique_trash_name(&dir, &basename);
		fs::rename(&src, &dst)?;
		touch_mtime(&dst)?;
		trashed.push(dst.strip_prefix(remote_root).unwrap_or(&dst).to_string_lossy().to_string());

		lpdb.rm_paths(&[path.clone()]).map_err(pih_to_trash_error)?;
		rmdb.rm_paths(&[path.clone()]).map_err(pih_to_trash_error)?;
	}

	Ok(trashed)
}

fn pih_to_trash_error(e: crate::error::PihError) -> TrashError {
	TrashError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
}

fn touch_mtime(path: &Path) -> Result<(), TrashError> {
	let now = filetime::FileTime::from_system_time(SystemTime::now());
	filetime::set_file_mtime(path, now)?;
	Ok(())
}

/// For each top-level entry in `.zielen/Trash` whose mtime is older
/// than `now - cleanup_period_secs`, remove it (recursively if a
/// directory).
pub fn cleanup_trash(
	remote_root: &Path,
	cleanup_period_secs: f64,
	now: f64,
) -> Result<Vec<String>, TrashError> {
	let dir = trash_dir(remote_root);
	let read_dir = match fs::read_dir(&dir) {
		Ok(rd) => rd,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
		Err(e) => return Err(TrashError::Io(e)),
	};

	let cutoff = now - cleanup_period_secs;
	let mut removed = Vec::new();
	for entry in read_dir {
		let entry = entry?;
		let metadata = entry.metadata()?;
		let mtime = metadata
			.modified()
			.ok()
			.and_then(|t| t.duration_since(UNIX_EPOCH).ok())
			.map(|d| d.as_secs_f64())
			.unwrap_or(0.0);

		if mtime < cutoff {
			if metadata.is_dir() {
				fs::remove_dir_all(entry.path())?;
			} else {
				fs::remove_file(entry.path())?;
			}
			removed.push(entry.file_name().to_string_lossy().to_string());
		}
	}
	Ok(removed)
}


// vim: ts=4
