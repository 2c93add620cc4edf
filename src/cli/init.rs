//! `init` (§6): create a profile and set up the remote (or local) tree
//! to match, grounded on the original `InitCommand` — validate the
//! name, generate the profile's files, then perform one-directional
//! setup from whichever side is authoritative.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use uuid::Uuid;

use crate::error::{ProfileError, ZielenError};
use crate::logging::info;
use crate::profile::{InitOpts, Profile, ProfileInfo, Status};
use crate::{conflict, materializer, profile as profile_mod, scanner};

#[derive(Debug, Args)]
pub struct InitArgs {
	pub profile_name: String,

	#[arg(long)]
	pub exclude: Option<PathBuf>,

	#[arg(long)]
	pub template: Option<PathBuf>,

	#[arg(long)]
	pub add_remote: bool,
}

pub fn run(args: InitArgs, config_home: &std::path::Path) -> Result<(), ZielenError> {
	validate_profile_name(&args.profile_name)?;

	if let Some(exclude) = &args.exclude {
		if !exclude.is_file() {
			return Err(ZielenError::Input { message: "argument for --exclude is not a file".into() });
		}
	}
	let template = args.template.as_ref().ok_or_else(|| ZielenError::Input {
		message: "--template is required: it supplies LocalDir/RemoteDir and the rest of the config".into(),
	})?;
	if !template.is_file() {
		return Err(ZielenError::Input { message: "argument for --template is not a file".into() });
	}

	let profile = Profile::new(config_home, &args.profile_name);
	if let Ok(existing) = profile.read_info() {
		if existing.status == Status::Initialized {
			return Err(ZielenError::Input { message: "this profile already exists".into() });
		}
	}

	profile.create().map_err(|e| match e {
		ProfileError::AlreadyExists { .. } => ZielenError::Status {
			message: format!("profile {:?} initialization already in progress", args.profile_name),
		},
		other => other.into(),
	})?;

	fs::copy(template, profile.config_path())?;
	let config = profile.load_config()?;

	profile_mod::check_overlap(config_home, &config.local_dir, Some(&args.profile_name))?;

	match &args.exclude {
		Some(path) => {
			fs::copy(path, profile.exclude_path())?;
		}
		None => {
			fs::write(profile.exclude_path(), "")?;
		}
	}

	let local_exists = config.local_dir.is_dir();
	let remote_exists = config.remote_dir.is_dir();
	if args.add_remote && !remote_exists {
		return Err(ZielenError::Input { message: "remote directory does not exist".into() });
	}
	if !args.add_remote && !local_exists {
		return Err(ZielenError::Input { message: "local directory does not exist".into() });
	}

	fs::create_dir_all(config.remote_dir.join(".zielen").join("Trash"))?;
	fs::create_dir_all(config.remote_dir.join(".zielen").join("exclude"))?;

	let profile_id = Uuid::new_v4().to_string();

	if args.add_remote {
		let remote_entries = scanner::scan(&config.remote_dir, scanner::Include::default(), None, false)
			.map_err(ZielenError::Scan)?;
		materializer::setup_from_local(&config.remote_dir, &config.local_dir, &remote_entries)
			.map_err(ZielenError::Materialize)?;
	} else {
		let local_entries = scanner::scan(&config.local_dir, scanner::Include::default(), None, false)
			.map_err(ZielenError::Scan)?;
		materializer::setup_from_local(&config.local_dir, &config.remote_dir, &local_entries)
			.map_err(ZielenError::Materialize)?;
	}

	fs::copy(
		profile.exclude_path(),
		config.remote_dir.join(".zielen").join("exclude").join(&profile_id),
	)?;

	let now = conflict::now_unix();
	profile.write_info(&ProfileInfo {
		status: Status::Initialized,
		last_sync: conflict::to_iso8601(now),
		last_adjust: conflict::to_iso8601(now),
		version: env!("CARGO_PKG_VERSION").to_string(),
		id: profile_id,
		init_opts: InitOpts { add_remote: args.add_remote },
	})?;

	info!(profile = %args.profile_name, "profile initialized");
	Ok(())
}

fn validate_profile_name(name: &str) -> Result<(), ZielenError> {
	if name.chars().any(char::is_whitespace) {
		return Err(ZielenError::Input { message: "profile name must not contain spaces".into() });
	}
	if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
		return Err(ZielenError::Input { message: "profile name must not contain special symbols".into() });
	}
	Ok(())
}

// vim: ts=4
