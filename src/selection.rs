//! Selection engine (§4.10): decides which paths materialize locally
//! versus remain symlinked, under a byte budget, preferring whole
//! directories over scattered files.

use std::collections::{HashMap, HashSet};

use crate::error::SelectionError;

#[derive(Debug, Clone)]
pub struct Candidate {
	pub path: String,
	pub priority: f64,
	pub size: u64,
}

#[derive(Debug, Clone)]
pub struct SelectionInput {
	/// Files excluded locally but still present on the remote (because
	/// some other client has not excluded them). Always materialized.
	pub excluded_remote_files: Vec<Candidate>,
	/// Every RMDB directory, with size = sum of RMDB descendant sizes
	/// and priority = LPDB priority.
	pub directories: Vec<Candidate>,
	/// Every LPDB file not in `excluded_remote_files`.
	pub files: Vec<Candidate>,
	pub storage_limit: u64,
	pub account_for_size: bool,
	pub block_size: u64,
	pub sync_extra_files: bool,
}

#[derive(Debug, Default)]
pub struct Selection {
	pub directories: HashSet<String>,
	pub files: HashSet<String>,
}

fn rank_key(c: &Candidate, account_for_size: bool) -> f64 {
	if account_for_size {
		if c.size == 0 {
			0.0
		} else {
			c.priority / c.size as f64
		}
	} else {
		c.priority
	}
}

fn ranked(mut candidates: Vec<Candidate>, account_for_size: bool) -> Vec<Candidate> {
	candidates.sort_by(|a, b| {
		let ka = rank_key(a, account_for_size);
		let kb = rank_key(b, account_for_size);
		kb.partial_cmp(&ka).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.path.cmp(&b.path))
	});
	candidates
}

fn is_subdir_of(path: &str, dir: &str) -> bool {
	path != dir && path.starts_with(dir) && path.as_bytes().get(dir.len()) == Some(&b'/')
}

/// Run the full selection procedure: directories first, then files
/// with the remaining budget.
pub fn select(input: &SelectionInput) -> Result<Selection, SelectionError> {
	if input.block_size == 0 {
		return Err(SelectionError::InvalidBudget { message: "block size must be non-zero".into() });
	}

	let excluded_size: u64 = input.excluded_remote_files.iter().map(|c| c.size).sum();
	let lpdb_file_count = input.files.len() as u64;
	let mut remaining = input
		.storage_limit
		.saturating_sub(excluded_size)
		.saturating_sub(input.block_size.saturating_mul(lpdb_file_count));

	let mut selected_dirs: HashSet<String> = HashSet::new();
	let mut selected_dir_sizes: HashMap<String, u64> = HashMap::new();

	for dir in ranked(input.directories.clone(), input.account_for_size) {
		if dir.size > input.storage_limit {
			continue;
		}
		if selected_dirs.iter().any(|sel| is_subdir_of(&dir.path, sel)) {
			continue;
		}

		let selected_subdirs: Vec<&String> =
			selected_dirs.iter().filter(|sel| is_subdir_of(sel, &dir.path)).collect();
		let subdirs_size: u64 = selected_subdirs
			.iter()
			.map(|sel| *selected_dir_sizes.get(sel.as_str()).unwrap_or(&0))
			.sum();

		let contained_files: Vec<&Candidate> = input
			.files
			.iter()
			.filter(|f| f.path == dir.path || is_subdir_of(&f.path, &dir.path))
			.collect();
		let already_selected_files =
			contained_files.iter().filter(|f| selected_in_dir(&f.path, &selected_dirs)).count();
		let reclaimable = contained_files.len().saturating_sub(already_selected_files) as u64;

		let candidate_total = remaining as i128 - dir.size as i128
			+ subdirs_size as i128
			+ (input.block_size as i128 * reclaimable as i128);

		if candidate_total >= 0 {
			for sel in selected_subdirs.iter().map(|s| s.to_string()).collect::<Vec<_>>() {
				selected_dirs.remove(&sel);
				selected_dir_sizes.remove(&sel);
			}
			remaining = candidate_total as u64;
			selected_dir_sizes.insert(dir.path.clone(), dir.size);
			selected_dirs.insert(dir.path.clone());
		}
	}

	let mut selected_files: HashSet<String> = HashSet::new();

	if input.sync_extra_files {
		let candidate_files: Vec<Candidate> = input
			.files
			.iter()
			.filter(|f| !selected_in_dir(&f.path, &selected_dirs))
			.cloned()
			.collect();

		for file in ranked(candidate_files, input.account_for_size) {
			let candidate_total = remaining as i128 - file.size as i128 + input.block_size as i128;
			if candidate_total >= 0 {
				remaining = candidate_total as u64;
				selected_files.insert(file.path.clone());
			}
		}
	}

	Ok(Selection { directories: selected_dirs, files: selected_files })
}

fn selected_in_dir(path: &str, selected_dirs: &HashSet<String>) -> bool {
	selected_dirs.iter().any(|d| path == d.as_str() || is_subdir_of(path, d))
}


// vim: ts=4
