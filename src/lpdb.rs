//! Local priority database (§4.3): per-client store of `(path, is_dir,
//! priority)`, where a directory's priority is the sum of its immediate
//! children's priorities.

use crate::chs::Chs;
use crate::error::PihError;
use std::collections::HashMap;
use std::path::Path;

/// A path and its current priority, as returned by query operations.
#[derive(Debug, Clone, PartialEq)]
pub struct PathPriority {
	pub path: String,
	pub is_dir: bool,
	pub priority: f64,
}

pub struct Lpdb {
	chs: Chs<f64>,
}

impl Lpdb {
	pub fn open(path: &Path) -> Result<Self, PihError> {
		Ok(Lpdb { chs: Chs::open(path)? })
	}

	/// Insert `files` and `dirs` with the given initial `priority`. The
	/// file/dir split exists solely so empty directories can be
	/// recorded explicitly. If `replace`, any existing node at the same
	/// path is deleted first. After insert, every ancestor directory is
	/// rolled up (§4.3 contract).
	pub fn add_paths(
		&self,
		files: &[String],
		dirs: &[String],
		priority: f64,
		replace: bool,
	) -> Result<(), PihError> {
		if replace {
			for p in files.iter().chain(dirs.iter()) {
				self.chs.remove_subtree(p)?;
			}
		}
		for p in dirs {
			self.chs.add_node(p, true, priority)?;
		}
		for p in files {
			self.chs.add_node(p, false, priority)?;
		}
		self.roll_up(files.iter().chain(dirs.iter()))
	}

	/// Insert new files/dirs with priority set to the current
	/// `MAX(priority) WHERE directory = false`, or 0 if the table is
	/// empty (§3 Config `InflatePriority`).
	pub fn add_inflated(&self, files: &[String], dirs: &[String]) -> Result<(), PihError> {
		let max_priority = self
			.chs
			.subtree(None)?
			.into_iter()
			.filter(|e| !e.is_dir)
			.map(|e| e.payload)
			.fold(0.0_f64, f64::max);
		self.add_paths(files, dirs, max_priority, false)
	}

	/// Cascade-delete the subtrees rooted at each of `paths`, then roll
	/// up parent priorities. Garbage-collects orphaned collision rows.
	pub fn rm_paths(&self, paths: &[String]) -> Result<(), PihError> {
		for p in paths {
			self.chs.remove_subtree(p)?;
		}
		self.roll_up(paths.iter())?;
		let live = self.chs.all_paths()?;
		crate::pih::CollisionTable::gc(self.chs.database(), &live)
	}

	/// Add `delta` to each path's priority, then roll up.
	pub fn increment(&self, paths: &[String], delta: f64) -> Result<(), PihError> {
		for p in paths {
			if let Some((is_dir, priority)) = self.chs.get(p)? {
				self.chs.set_payload(p, priority + delta)?;
				let _ = is_dir;
			}
		}
		self.roll_up(paths.iter())
	}

	/// Multiply every node's priority by `factor`. No roll-up needed:
	/// roll-up is linear and decay is applied uniformly (§4.3).
	pub fn decay(&self, factor: f64) -> Result<(), PihError> {
		for entry in self.chs.subtree(None)? {
			self.chs.set_payload(&entry.path, entry.payload * factor)?;
		}
		Ok(())
	}

	/// Recompute directory priorities for every ancestor of the given
	/// paths, processing in strictly decreasing path-depth order so a
	/// directory's children are up to date before it is summed.
	fn roll_up<'a>(&self, changed: impl Iterator<Item = &'a String>) -> Result<(), PihError> {
		let mut to_recompute: HashMap<String, ()> = HashMap::new();
		for path in changed {
			for (ancestor, depth) in self.chs.ancestors(path)? {
				if depth > 0 {
					to_recompute.insert(ancestor, ());
				}
			}
		}
		let mut dirs: Vec<String> = to_recompute.into_keys().collect();
		dirs.sort_by_key(|p| std::cmp::Reverse(p.matches('/').count()));
		for dir in dirs {
			let children = self.immediate_children(&dir)?;
			let sum: f64 = children.iter().map(|c| c.priority).sum();
			self.chs.set_payload(&dir, sum)?;
		}
		Ok(())
	}

	/// Children at depth 1 from `dir`.
	fn immediate_children(&self, dir: &str) -> Result<Vec<PathPriority>, PihError> {
		Ok(self
			.chs
			.subtree(Some(dir))?
			.into_iter()
			.filter(|e| e.path != dir && parent_path(&e.path) == dir)
			.map(|e| PathPriority { path: e.path, is_dir: e.is_dir, priority: e.payload })
			.collect())
	}

	pub fn get(&self, path: &str) -> Result<Option<PathPriority>, PihError> {
		Ok(self.chs.get(path)?.map(|(is_dir, priority)| PathPriority {
			path: path.to_string(),
			is_dir,
			priority,
		}))
	}

	pub fn subtree(&self, root: Option<&str>) -> Result<Vec<PathPriority>, PihError> {
		Ok(self
			.chs
			.subtree(root)?
			.into_iter()
			.map(|e| PathPriority { path: e.path, is_dir: e.is_dir, priority: e.payload })
			.collect())
	}
}

fn parent_path(path: &str) -> String {
	match path.rfind('/') {
		Some(idx) => path[..idx].to_string(),
		None => String::new(),
	}
}


// vim: ts=4
