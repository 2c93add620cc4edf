//! Profile metadata (§3, §6): on-disk layout under
//! `$XDG_CONFIG_HOME/<product>/profiles/<name>/` and the profile-overlap
//! check.
//!
//! Overlap detection enumerates existing profile directories at check
//! time and loads each config on demand, rather than sharing mutable
//! state through a process-wide registry of live instances.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config;
use crate::error::ProfileError;

pub const PRODUCT_NAME: &str = "zielen";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
	Partial,
	Initialized,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitOpts {
	pub add_remote: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileInfo {
	pub status: Status,
	pub last_sync: String,
	pub last_adjust: String,
	pub version: String,
	pub id: String,
	pub init_opts: InitOpts,
}

pub struct Profile {
	pub name: String,
	pub dir: PathBuf,
}

impl Profile {
	pub fn new(config_home: &Path, name: &str) -> Self {
		Profile { name: name.to_string(), dir: profiles_root(config_home).join(name) }
	}

	pub fn config_path(&self) -> PathBuf {
		self.dir.join("config")
	}

	pub fn exclude_path(&self) -> PathBuf {
		self.dir.join("exclude")
	}

	pub fn info_path(&self) -> PathBuf {
		self.dir.join("info.json")
	}

	pub fn local_db_path(&self) -> PathBuf {
		self.dir.join("local.db")
	}

	pub fn mount_point(&self) -> PathBuf {
		self.dir.join("mnt")
	}

	pub fn exists(&self) -> bool {
		self.dir.exists()
	}

	pub fn read_info(&self) -> Result<ProfileInfo, ProfileError> {
		let contents = fs::read_to_string(self.info_path())?;
		Ok(serde_json::from_str(&contents)?)
	}

	pub fn write_info(&self, info: &ProfileInfo) -> Result<(), ProfileError> {
		let contents = serde_json::to_string_pretty(info)?;
		fs::write(self.info_path(), contents)?;
		Ok(())
	}

	pub fn load_config(&self) -> Result<config::Config, ProfileError> {
		config::load(&self.config_path()).map_err(|e| ProfileError::Invalid { message: e.to_string() })
	}

	/// Create the profile's directory skeleton (§6 persisted state
	/// layout). Fails if the profile already exists.
	pub fn create(&self) -> Result<(), ProfileError> {
		if self.exists() {
			return Err(ProfileError::AlreadyExists { name: self.name.clone() });
		}
		fs::create_dir_all(self.mount_point())?;
		Ok(())
	}

	pub fn remove(&self) -> Result<(), ProfileError> {
		if !self.exists() {
			return Err(ProfileError::NotFound { name: self.name.clone() });
		}
		fs::remove_dir_all(&self.dir)?;
		Ok(())
	}
}

fn profiles_root(config_home: &Path) -> PathBuf {
	config_home.join(PRODUCT_NAME).join("profiles")
}

/// List every existing profile name under `config_home`.
pub fn list_profiles(config_home: &Path) -> Result<Vec<String>, ProfileError> {
	let root = profiles_root(config_home);
	let read_dir = match fs::read_dir(&root) {
		Ok(rd) => rd,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
		Err(e) => return Err(e.into()),
	};
	let mut names = Vec::new();
	for entry in read_dir {
		let entry = entry?;
		if entry.file_type()?.is_dir() {
			names.push(entry.file_name().to_string_lossy().to_string());
		}
	}
	names.sort();
	Ok(names)
}

/// Check whether `local_dir` overlaps an already-registered profile's
/// `LocalDir`, or the program's own config directory. Enumerates
/// profile directories fresh on every call.
pub fn check_overlap(
	config_home: &Path,
	local_dir: &Path,
	excluding: Option<&str>,
) -> Result<(), ProfileError> {
	if local_dir.starts_with(config_home) {
		return Err(ProfileError::Overlap {
			existing: "<config directory>".to_string(),
			path: local_dir.display().to_string(),
		});
	}

	for name in list_profiles(config_home)? {
		if Some(name.as_str()) == excluding {
			continue;
		}
		let profile = Profile::new(config_home, &name);
		let Ok(config) = profile.load_config() else { continue };
		if paths_overlap(local_dir, &config.local_dir) {
			return Err(ProfileError::Overlap {
				existing: name,
				path: local_dir.display().to_string(),
			});
		}
	}
	Ok(())
}

fn paths_overlap(a: &Path, b: &Path) -> bool {
	!a.as_os_str().is_empty() && !b.as_os_str().is_empty() && (a.starts_with(b) || b.starts_with(a))
}


// vim: ts=4
