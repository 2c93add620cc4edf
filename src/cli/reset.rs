//! `reset` (§6): retrieve remote files back to local and de-register a
//! profile, grounded on the original `ResetCommand`.

use std::fs;

use clap::Args;

use crate::cli::{resolve_profile_name, ProfileRef};
use crate::error::ZielenError;
use crate::mount::{LocalMount, MountCollaborator, SshfsMount};
use crate::profile::Profile;
use crate::rmdb::Rmdb;
use crate::scanner;

#[derive(Debug, Args)]
pub struct ResetArgs {
	pub profile_ref: ProfileRef,

	/// Keep the remote directory's contents instead of removing them
	/// once retrieval succeeds.
	#[arg(long)]
	pub keep_remote: bool,

	/// Don't copy files back to the local directory; only de-register
	/// the profile.
	#[arg(long)]
	pub no_retrieve: bool,
}

pub async fn run(args: ResetArgs, config_home: &std::path::Path) -> Result<(), ZielenError> {
	let name = resolve_profile_name(config_home, &args.profile_ref)?;
	let profile = Profile::new(config_home, &name);
	if !profile.exists() {
		return Err(ZielenError::Input { message: format!("profile {:?} does not exist", name) });
	}
	let info = profile.read_info()?;
	let config = profile.load_config()?;
	let rmdb = Rmdb::open(&config.remote_dir.join(".zielen").join("remote.db"))?;

	if !config.is_local_remote() {
		let host = config.remote_host.clone().unwrap();
		let mount = SshfsMount {
			remote_host: host,
			remote_user: config.remote_user.clone(),
			port: config.port,
			remote_dir: config.remote_dir.clone(),
			sshfs_options: config.sshfs_options.clone(),
		};
		mount.mount(&profile.mount_point()).await.map_err(ZielenError::Mount)?;
	}

	if !args.no_retrieve {
		let entries = rmdb.subtree(None, None, None)?;
		for entry in entries {
			if entry.is_dir {
				continue;
			}
			let src = config.remote_dir.join(&entry.path);
			let dst = config.local_dir.join(&entry.path);
			if let Some(parent) = dst.parent() {
				fs::create_dir_all(parent)?;
			}
			if fs::symlink_metadata(&dst).map(|m| m.file_type().is_symlink()).unwrap_or(false) {
				fs::remove_file(&dst)?;
			}
			fs::copy(&src, &dst)?;
			if !args.keep_remote {
				let _ = fs::remove_file(&src);
			}
		}

		if !args.keep_remote {
			let leftover = scanner::scan(&config.remote_dir, scanner::Include { dirs: false, ..Default::default() }, None, false)
				.map_err(ZielenError::Scan)?
				.into_iter()
				.filter(|e| !e.rel_path.starts_with(".zielen"))
				.count();
			if leftover > 0 {
				return Err(ZielenError::Remote { message: "some files were not retrieved".into() });
			}
		}
	}

	// Local symlinks that point into the remote tree are an artifact of
	// the materializer overlay, not user data; drop them now that the
	// remote side is going away.
	let local_entries =
		scanner::scan(&config.local_dir, scanner::Include { files: false, dirs: false, symlinks: true }, None, false)
			.map_err(ZielenError::Scan)?;
	for entry in local_entries {
		let full = config.local_dir.join(&entry.rel_path);
		if let Ok(target) = fs::read_link(&full) {
			let resolved =
				if target.is_absolute() { target } else { full.parent().unwrap().join(&target) };
			if resolved.starts_with(&config.remote_dir) {
				let _ = fs::remove_file(&full);
			}
		}
	}

	let _ = fs::remove_file(config.remote_dir.join(".zielen").join("exclude").join(&info.id));

	if !config.is_local_remote() {
		let mount = SshfsMount {
			remote_host: config.remote_host.clone().unwrap(),
			remote_user: config.remote_user.clone(),
			port: config.port,
			remote_dir: config.remote_dir.clone(),
			sshfs_options: config.sshfs_options.clone(),
		};
		mount.unmount(&profile.mount_point()).await.map_err(ZielenError::Mount)?;
	} else {
		let _mount = LocalMount;
	}

	profile.remove()?;
	Ok(())
}

// vim: ts=4
