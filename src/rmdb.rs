//! Remote metadata database (§4.4): tracks `(path, is_dir, last_sync)`
//! for every path known to have existed on the remote as of the last
//! completed pass. No priority roll-up — `last_sync` is a per-node
//! timestamp, not a summed quantity.

use crate::chs::Chs;
use crate::error::PihError;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEntry {
	pub path: String,
	pub is_dir: bool,
	pub last_sync: f64,
}

pub struct Rmdb {
	chs: Chs<f64>,
}

impl Rmdb {
	pub fn open(path: &Path) -> Result<Self, PihError> {
		Ok(Rmdb { chs: Chs::open(path)? })
	}

	/// Record that `path` was seen on the remote at `last_sync` (a Unix
	/// timestamp). Replaces any prior entry at the same path.
	pub fn add_paths(
		&self,
		files: &[String],
		dirs: &[String],
		last_sync: f64,
	) -> Result<(), PihError> {
		for p in files.iter().chain(dirs.iter()) {
			self.chs.remove_subtree(p)?;
		}
		for p in dirs {
			self.chs.add_node(p, true, last_sync)?;
		}
		for p in files {
			self.chs.add_node(p, false, last_sync)?;
		}
		Ok(())
	}

	/// Bump `last_sync` for already-tracked paths without touching the
	/// closure structure.
	pub fn update_sync_time(&self, paths: &[String], last_sync: f64) -> Result<(), PihError> {
		for p in paths {
			if self.chs.get(p)?.is_some() {
				self.chs.set_payload(p, last_sync)?;
			}
		}
		Ok(())
	}

	pub fn rm_paths(&self, paths: &[String]) -> Result<(), PihError> {
		for p in paths {
			self.chs.remove_subtree(p)?;
		}
		let live = self.chs.all_paths()?;
		crate::pih::CollisionTable::gc(self.chs.database(), &live)
	}

	pub fn get(&self, path: &str) -> Result<Option<RemoteEntry>, PihError> {
		Ok(self.chs.get(path)?.map(|(is_dir, last_sync)| RemoteEntry {
			path: path.to_string(),
			is_dir,
			last_sync,
		}))
	}

	/// List entries under `root` (the whole tree if `None`), optionally
	/// filtered to only directories/only files (`directory`) and to
	/// entries synced at or after `min_last_sync`.
	pub fn subtree(
		&self,
		root: Option<&str>,
		directory: Option<bool>,
		min_last_sync: Option<f64>,
	) -> Result<Vec<RemoteEntry>, PihError> {
		Ok(self
			.chs
			.subtree(root)?
			.into_iter()
			.map(|e| RemoteEntry { path: e.path, is_dir: e.is_dir, last_sync: e.payload })
			.filter(|e| directory.map(|d| e.is_dir == d).unwrap_or(true))
			.filter(|e| min_last_sync.map(|m| e.last_sync >= m).unwrap_or(true))
			.collect())
	}

	pub fn all_paths(&self) -> Result<std::collections::HashSet<String>, PihError> {
		self.chs.all_paths()
	}
}


// vim: ts=4
