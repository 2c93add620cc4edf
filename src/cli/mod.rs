//! Command surface (§6): one module per subcommand, dispatched by
//! [`crate::cli::Cli`] from `main.rs`.

pub mod empty_trash;
pub mod init;
pub mod list;
pub mod reset;
pub mod sync;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::ZielenError;

/// Priority-adjusted partial mirror reconciler between a local and a
/// remote directory.
#[derive(Debug, Parser)]
#[command(name = "zielen", version, about)]
pub struct Cli {
	/// Print the full error trace on failure.
	#[arg(long, global = true)]
	pub debug: bool,

	/// Suppress non-error output.
	#[arg(short, long, global = true)]
	pub quiet: bool,

	#[command(subcommand)]
	pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
	/// Create a profile; set up from local or remote.
	Init(init::InitArgs),
	/// Run one reconciliation pass.
	Sync(sync::SyncArgs),
	/// Retrieve remote files and delete a profile.
	Reset(reset::ResetArgs),
	/// Tabulate all profiles.
	List(list::ListArgs),
	/// Permanently delete all entries in the remote trash.
	EmptyTrash(empty_trash::EmptyTrashArgs),
}

/// Identifies a profile either by name or, for the one-shot commands
/// that accept it, by the local directory already registered to it.
#[derive(Debug, Clone)]
pub enum ProfileRef {
	Name(String),
	LocalPath(PathBuf),
}

impl std::str::FromStr for ProfileRef {
	type Err = std::convert::Infallible;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		let path = PathBuf::from(value);
		Ok(if value.contains('/') || path.is_absolute() {
			ProfileRef::LocalPath(path)
		} else {
			ProfileRef::Name(value.to_string())
		})
	}
}

/// Resolve a [`ProfileRef`] to a concrete profile name, searching
/// registered profiles by `LocalDir` when given a path.
pub fn resolve_profile_name(
	config_home: &std::path::Path,
	profile_ref: &ProfileRef,
) -> Result<String, ZielenError> {
	match profile_ref {
		ProfileRef::Name(name) => Ok(name.clone()),
		ProfileRef::LocalPath(path) => {
			let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
			for name in crate::profile::list_profiles(config_home)? {
				let profile = crate::profile::Profile::new(config_home, &name);
				let Ok(config) = profile.load_config() else { continue };
				if config.local_dir == canonical || config.local_dir == *path {
					return Ok(name);
				}
			}
			Err(ZielenError::Input {
				message: format!("no profile registered for local path {}", path.display()),
			})
		}
	}
}

pub fn config_home() -> PathBuf {
	std::env::var_os("XDG_CONFIG_HOME")
		.map(PathBuf::from)
		.or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
		.unwrap_or_else(|| PathBuf::from(".config"))
}

// vim: ts=4
