//! `sync` (§6): run one reconciliation pass for a profile.

use clap::Args;

use crate::cli::{resolve_profile_name, ProfileRef};
use crate::error::ZielenError;
use crate::exclude::ExcludeMatcher;
use crate::logging::info;
use crate::lpdb::Lpdb;
use crate::mount::{LocalMount, MountCollaborator, SshfsMount};
use crate::profile::{Profile, Status};
use crate::rmdb::Rmdb;

#[derive(Debug, Args)]
pub struct SyncArgs {
	pub profile_ref: ProfileRef,
}

pub async fn run(args: SyncArgs, config_home: &std::path::Path) -> Result<(), ZielenError> {
	let name = resolve_profile_name(config_home, &args.profile_ref)?;
	let profile = Profile::new(config_home, &name);
	if !profile.exists() {
		return Err(ZielenError::Input { message: format!("profile {:?} does not exist", name) });
	}

	let info_record = profile.read_info()?;
	if info_record.status == Status::Partial {
		return Err(ZielenError::Status {
			message: format!("profile {:?} is only partially initialized; re-run init", name),
		});
	}

	let config = profile.load_config()?;
	let exclude = ExcludeMatcher::load(&profile.exclude_path()).map_err(ZielenError::Exclude)?;
	let lpdb = Lpdb::open(&profile.local_db_path())?;
	let rmdb = Rmdb::open(&config.remote_dir.join(".zielen").join("remote.db"))?;

	let sshfs_mount;
	let local_mount;
	let mount: &dyn MountCollaborator = if let Some(host) = &config.remote_host {
		sshfs_mount = SshfsMount {
			remote_host: host.clone(),
			remote_user: config.remote_user.clone(),
			port: config.port,
			remote_dir: config.remote_dir.clone(),
			sshfs_options: config.sshfs_options.clone(),
		};
		&sshfs_mount
	} else {
		local_mount = LocalMount;
		&local_mount
	};

	let coordinator =
		crate::coordinator::Coordinator { profile, config, exclude, lpdb, rmdb, mount };

	let report = tokio::select! {
		result = coordinator.run_pass() => result?,
		err = crate::coordinator::wait_for_cancel_signal() => return Err(err),
	};

	info!(
		local_added = report.local_added,
		remote_added = report.remote_added,
		conflicts = report.conflicts,
		selected_dirs = report.selected_dirs,
		selected_files = report.selected_files,
		trashed = report.trashed,
		"sync pass complete"
	);
	Ok(())
}

// vim: ts=4
