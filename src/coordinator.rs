//! Reconciliation coordinator (§4.14): the top-level state machine for
//! one sync pass. Every `APPLY_*` step commits its own transaction so a
//! crash mid-pass leaves both databases consistent with the filesystem
//! state up to that step.

use std::collections::HashSet;
use std::time::Duration;

use tokio::time::timeout;

use crate::conflict;
use crate::diff;
use crate::error::ZielenError;
use crate::exclude::ExcludeMatcher;
use crate::lock::ProfileLock;
use crate::lpdb::Lpdb;
use crate::mount::MountCollaborator;
use crate::profile::{Profile, Status};
use crate::rmdb::Rmdb;
use crate::scanner::{self, Include};
use crate::selection::{self, Candidate, SelectionInput};
use crate::trash;
use crate::{config::Config, materializer};

const PREDICATE_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Default)]
pub struct PassReport {
	pub local_added: usize,
	pub remote_added: usize,
	pub conflicts: usize,
	pub selected_dirs: usize,
	pub selected_files: usize,
	pub trashed: usize,
	pub cleaned_up: usize,
}

pub struct Coordinator<'a> {
	pub profile: Profile,
	pub config: Config,
	pub exclude: ExcludeMatcher,
	pub lpdb: Lpdb,
	pub rmdb: Rmdb,
	pub mount: &'a dyn MountCollaborator,
}

impl<'a> Coordinator<'a> {
	/// Run one full reconciliation pass. Returns `Err` without
	/// advancing `last_sync` if the pass aborts before
	/// `COMMIT_DATABASES`.
	pub async fn run_pass(&self) -> Result<PassReport, ZielenError> {
		let user_id = unsafe { libc::getuid() };
		let _lock = ProfileLock::acquire(user_id, &self.profile.name)?;

		let mut info = self.profile.read_info()?;
		if info.status == Status::Partial {
			return Err(ZielenError::Status {
				message: format!("profile {:?} is only partially initialized", self.profile.name),
			});
		}

		if !self.config.is_local_remote() {
			timeout(Duration::from_secs(20), self.mount.mount(&self.profile.mount_point()))
				.await
				.map_err(|_| ZielenError::Remote { message: "mount timed out".into() })??;
		}

		let local_root = self.profile.mount_point().parent().map(|p| p.to_path_buf()).unwrap_or_default();
		let remote_root = self.profile.mount_point();

		let local_scan = scanner::scan(&local_root, Include::default(), Some(&self.exclude), true)
			.map_err(ZielenError::Scan)?;
		let remote_scan = self.scan_remote_with_timeout(&remote_root).await?;

		let last_sync = conflict::from_iso8601(&info.last_sync).unwrap_or(0.0);
		let difference = diff::compute(
			&self.lpdb,
			&self.rmdb,
			&local_scan,
			&remote_scan,
			&local_root,
			&self.exclude,
			last_sync,
		)?;

		let mut report = PassReport {
			local_added: difference.local_added.len(),
			remote_added: difference.remote_added.len(),
			..Default::default()
		};

		self.apply_deletions(&difference, &local_root, &remote_root)?;

		let now = conflict::now_unix();
		let resolutions = conflict::resolve(
			&difference.local_modified,
			&difference.remote_modified,
			|p| mtime_of(&local_root.join(p)),
			|p| mtime_of(&remote_root.join(p)),
			&local_root,
			&remote_root,
			&self.lpdb,
			&self.rmdb,
			now,
		)?;
		report.conflicts = resolutions.len();

		self.transfer_modified_to_remote(&difference, &resolutions, &local_root, &remote_root)?;

		let selection_input = self.build_selection_input(&local_root, &remote_root)?;
		let selection = selection::select(&selection_input)?;
		report.selected_dirs = selection.directories.len();
		report.selected_files = selection.files.len();

		let mut materialize_report = materializer::MaterializeReport::default();
		let materialized = self.lpdb.subtree(None)?.into_iter().map(|p| p.path).collect::<Vec<_>>();
		let selected_paths: HashSet<String> =
			selection.directories.iter().chain(selection.files.iter()).cloned().collect();
		materializer::remove_stale(&local_root, &materialized, &selected_paths, &mut materialize_report)
			.map_err(ZielenError::Materialize)?;
		materializer::overlay_symlinks(&local_root, &remote_root, &self.rmdb, &selected_paths, true, &mut materialize_report)
			.map_err(ZielenError::Materialize)?;
		materializer::transfer_in(&local_root, &remote_root, &selection, None, &mut materialize_report)
			.map_err(ZielenError::Materialize)?;
		materializer::sync_lpdb_membership(&self.lpdb, &materialize_report)?;

		self.remove_excluded_remote(&local_root, &remote_root)?;

		let cleanup_period = self.config.trash_cleanup_period_secs;
		let elapsed_since_adjust = now - conflict::from_iso8601(&info.last_adjust).unwrap_or(0.0);
		if elapsed_since_adjust >= cleanup_period {
			let removed = trash::cleanup_trash(&remote_root, cleanup_period, now).map_err(ZielenError::Trash)?;
			report.trashed = removed.len();
			report.cleaned_up = removed.len();
		}

		info.last_sync = conflict::to_iso8601(now);
		info.last_adjust = conflict::to_iso8601(now);
		self.profile.write_info(&info)?;

		if !self.config.is_local_remote() {
			self.mount.unmount(&self.profile.mount_point()).await?;
		}

		Ok(report)
	}

	/// Remote directory scans are a mount-sensitive operation bounded by
	/// the 20s predicate-query timeout (§5).
	async fn scan_remote_with_timeout(
		&self,
		remote_root: &std::path::Path,
	) -> Result<Vec<scanner::Entry>, ZielenError> {
		let root = remote_root.to_path_buf();
		let scan_task = tokio::task::spawn_blocking(move || {
			scanner::scan(&root, Include::default(), None, true)
		});
		match timeout(PREDICATE_TIMEOUT, scan_task).await {
			Ok(join_result) => {
				let scan_result = join_result
					.map_err(|e| ZielenError::Remote { message: format!("remote scan task panicked: {}", e) })?;
				scan_result.map_err(ZielenError::Scan)
			}
			Err(_) => Err(ZielenError::Remote { message: "remote scan timed out".into() }),
		}
	}

	fn apply_deletions(
		&self,
		difference: &diff::Difference,
		local_root: &std::path::Path,
		remote_root: &std::path::Path,
	) -> Result<(), ZielenError> {
		for path in &difference.local_deleted {
			self.lpdb.rm_paths(&[path.clone()])?;
		}

		let trash_dirs = &self.config.trash_dirs;
		let oracle = crate::trash_oracle::TrashOracle::scan(trash_dirs).map_err(ZielenError::Trash)?;

		let mut permanently_deleted = Vec::new();
		let mut trash_bound = Vec::new();
		for path in &difference.remote_deleted {
			let full = local_root.join(path);
			let reused = oracle.contains(&full).unwrap_or(false);
			if self.config.use_trash && !reused {
				trash_bound.push(path.clone());
			} else {
				permanently_deleted.push(path.clone());
			}
		}

		if !trash_bound.is_empty() {
			trash::trash_files(remote_root, &trash_bound, &self.lpdb, &self.rmdb).map_err(ZielenError::Trash)?;
		}
		for path in &permanently_deleted {
			let full = remote_root.join(path);
			if full.is_dir() {
				let _ = std::fs::remove_dir_all(&full);
			} else {
				let _ = std::fs::remove_file(&full);
			}
			self.rmdb.rm_paths(&[path.clone()])?;
			self.lpdb.rm_paths(&[path.clone()])?;
		}
		Ok(())
	}

	fn transfer_modified_to_remote(
		&self,
		difference: &diff::Difference,
		resolutions: &[conflict::Resolution],
		local_root: &std::path::Path,
		remote_root: &std::path::Path,
	) -> Result<(), ZielenError> {
		let now = conflict::now_unix();

		// conflict::resolve already renamed the older side's copy away and
		// dropped `original_path` from both databases; transferring it
		// here under its old name would hit a missing source on whichever
		// side lost the rename.
		let resolved_originals: HashSet<&str> =
			resolutions.iter().map(|r| r.original_path.as_str()).collect();

		for path in difference.local_added.iter().chain(difference.local_modified.iter()) {
			if resolved_originals.contains(path.as_str()) {
				continue;
			}
			let src = local_root.join(path);
			let dst = remote_root.join(path);
			if let Some(parent) = dst.parent() {
				std::fs::create_dir_all(parent)?;
			}
			if src.is_dir() {
				std::fs::create_dir_all(&dst)?;
			} else {
				std::fs::copy(&src, &dst)?;
			}
		}

		for resolution in resolutions {
			let (holder_root, missing_root) = match resolution.renamed_side_was_older {
				conflict::Side::Local => (local_root, remote_root),
				conflict::Side::Remote => (remote_root, local_root),
			};
			let src = holder_root.join(&resolution.renamed_path);
			let dst = missing_root.join(&resolution.renamed_path);
			if let Some(parent) = dst.parent() {
				std::fs::create_dir_all(parent)?;
			}
			std::fs::copy(&src, &dst)?;
		}

		let new_paths: Vec<String> = difference
			.local_added
			.iter()
			.filter(|p| !resolved_originals.contains(p.as_str()))
			.cloned()
			.collect();
		if !new_paths.is_empty() {
			self.rmdb.add_paths(&new_paths, &[], now)?;
			let (new_dirs, new_files): (Vec<String>, Vec<String>) =
				new_paths.into_iter().partition(|p| local_root.join(p).is_dir());
			self.lpdb.add_paths(&new_files, &new_dirs, 0.0, false)?;
		}
		let modified: Vec<String> = difference
			.local_modified
			.iter()
			.filter(|p| !resolved_originals.contains(p.as_str()))
			.cloned()
			.collect();
		if !modified.is_empty() {
			self.rmdb.update_sync_time(&modified, now)?;
		}
		Ok(())
	}

	fn remove_excluded_remote(
		&self,
		local_root: &std::path::Path,
		remote_root: &std::path::Path,
	) -> Result<(), ZielenError> {
		let matches = self.exclude.matches(local_root).map_err(ZielenError::Exclude)?;
		for path in &matches.all_matches {
			let rel = path.to_string_lossy().to_string();
			if let Ok(Some(_)) = self.rmdb.get(&rel) {
				let full = remote_root.join(path);
				if full.is_dir() {
					let _ = std::fs::remove_dir_all(&full);
				} else {
					let _ = std::fs::remove_file(&full);
				}
				self.rmdb.rm_paths(&[rel])?;
			}
		}
		Ok(())
	}

	fn build_selection_input(
		&self,
		local_root: &std::path::Path,
		remote_root: &std::path::Path,
	) -> Result<SelectionInput, ZielenError> {
		let rmdb_entries = self.rmdb.subtree(None, None, None)?;
		let lpdb_entries = self.lpdb.subtree(None)?;

		// Pool 1 (§4.10): files this client's own exclude patterns drop,
		// but that the remote still carries because some other client
		// hasn't excluded them. Those are always materialized, so they
		// come out of the budget before directories/files are ranked.
		let local_excluded = self.exclude.matches(local_root).map_err(ZielenError::Exclude)?;

		let mut excluded_remote_files = Vec::new();
		let mut excluded_paths: HashSet<String> = HashSet::new();
		for entry in &rmdb_entries {
			if entry.is_dir {
				continue;
			}
			if local_excluded.all_matches.contains(std::path::Path::new(&entry.path)) {
				let priority = self.lpdb.get(&entry.path)?.map(|p| p.priority).unwrap_or(0.0);
				let size = std::fs::metadata(remote_root.join(&entry.path)).map(|m| m.len()).unwrap_or(0);
				excluded_paths.insert(entry.path.clone());
				excluded_remote_files.push(Candidate { path: entry.path.clone(), priority, size });
			}
		}

		let mut directories = Vec::new();
		for entry in &rmdb_entries {
			if !entry.is_dir {
				continue;
			}
			let priority = self.lpdb.get(&entry.path)?.map(|p| p.priority).unwrap_or(0.0);
			let size = dir_size(remote_root, &entry.path);
			directories.push(Candidate { path: entry.path.clone(), priority, size });
		}

		let mut files = Vec::new();
		for entry in &lpdb_entries {
			if entry.is_dir || excluded_paths.contains(&entry.path) {
				continue;
			}
			let size = std::fs::metadata(remote_root.join(&entry.path)).map(|m| m.len()).unwrap_or(0);
			files.push(Candidate { path: entry.path.clone(), priority: entry.priority, size });
		}

		Ok(SelectionInput {
			excluded_remote_files,
			directories,
			files,
			storage_limit: self.config.storage_limit,
			account_for_size: self.config.account_for_size,
			block_size: 4096,
			sync_extra_files: true,
		})
	}
}

fn dir_size(remote_root: &std::path::Path, rel_dir: &str) -> u64 {
	let full = remote_root.join(rel_dir);
	scanner::walk_all(&full).map(|entries| entries.iter().map(|e| e.stat.size).sum()).unwrap_or(0)
}

fn mtime_of(path: &std::path::Path) -> Option<f64> {
	std::fs::metadata(path).ok().and_then(|m| {
		m.modified().ok().and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok()).map(|d| d.as_secs_f64())
	})
}

/// Await SIGTERM, SIGHUP, or SIGINT and translate them into a
/// `ZielenError::Signal`, for callers racing this against `run_pass`.
pub async fn wait_for_cancel_signal() -> ZielenError {
	use tokio::signal::unix::{signal, SignalKind};

	let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
	let mut sighup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");
	let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

	tokio::select! {
		_ = sigterm.recv() => ZielenError::Signal { signal: "SIGTERM" },
		_ = sighup.recv() => ZielenError::Signal { signal: "SIGHUP" },
		_ = sigint.recv() => ZielenError::Signal { signal: "SIGINT" },
	}
}

// vim: ts=4
