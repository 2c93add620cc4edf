//! `empty-trash` (§6): permanently delete every entry in the remote
//! trash directory.

use std::fs;

use clap::Args;

use crate::cli::{resolve_profile_name, ProfileRef};
use crate::error::ZielenError;
use crate::profile::Profile;
use crate::trash;

#[derive(Debug, Args)]
pub struct EmptyTrashArgs {
	pub profile_ref: ProfileRef,
}

pub fn run(args: EmptyTrashArgs, config_home: &std::path::Path) -> Result<(), ZielenError> {
	let name = resolve_profile_name(config_home, &args.profile_ref)?;
	let profile = Profile::new(config_home, &name);
	if !profile.exists() {
		return Err(ZielenError::Input { message: format!("profile {:?} does not exist", name) });
	}
	let config = profile.load_config()?;

	let dir = trash::trash_dir(&config.remote_dir);
	let mut deleted = 0usize;
	let read_dir = match fs::read_dir(&dir) {
		Ok(rd) => rd,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
			println!("0 files deleted");
			return Ok(());
		}
		Err(e) => return Err(e.into()),
	};
	for entry in read_dir {
		let entry = entry?;
		let result = if entry.file_type()?.is_dir() {
			fs::remove_dir_all(entry.path())
		} else {
			fs::remove_file(entry.path())
		};
		match result {
			Ok(()) => deleted += 1,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
			Err(e) => return Err(e.into()),
		}
	}
	println!("{} files deleted", deleted);
	Ok(())
}

// vim: ts=4
