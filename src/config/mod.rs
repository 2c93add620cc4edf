//! Config file loading (§6): `Key=Value` lines, `#`-comments, unknown
//! keys fatal at load time.

pub mod options;

use std::path::{Path, PathBuf};

pub use options::Config;

use crate::error::ConfigError;

/// Parse a config file's contents into a [`Config`]. Trailing
/// whitespace is trimmed from each value; lines whose first
/// non-whitespace character is `#` are comments; unknown keys abort
/// parsing with a [`ConfigError::UnknownKey`].
pub fn parse(contents: &str) -> Result<Config, ConfigError> {
	let mut config = Config::default();

	for (lineno, raw_line) in contents.lines().enumerate() {
		let line = raw_line.trim_start();
		if line.is_empty() || line.starts_with('#') {
			continue;
		}

		let Some((key, value)) = line.split_once('=') else {
			return Err(ConfigError::InvalidValue {
				key: line.to_string(),
				value: String::new(),
				message: "expected Key=Value".to_string(),
			});
		};
		let key = key.trim();
		let value = value.trim_end().trim_start();

		apply(&mut config, key, value, lineno + 1)?;
	}

	Ok(config)
}

fn apply(config: &mut Config, key: &str, value: &str, line: usize) -> Result<(), ConfigError> {
	macro_rules! invalid {
		($msg:expr) => {
			return Err(ConfigError::InvalidValue {
				key: key.to_string(),
				value: value.to_string(),
				message: $msg.to_string(),
			})
		};
	}

	match key {
		"LocalDir" => config.local_dir = PathBuf::from(value),
		"RemoteDir" => config.remote_dir = PathBuf::from(value),
		"RemoteHost" => config.remote_host = Some(value.to_string()),
		"RemoteUser" => config.remote_user = Some(value.to_string()),
		"Port" => match value.parse() {
			Ok(p) => config.port = Some(p),
			Err(_) => invalid!("not a valid port number"),
		},
		"StorageLimit" => match options::parse_byte_size(value) {
			Ok(n) => config.storage_limit = n,
			Err(msg) => invalid!(msg),
		},
		"SyncInterval" => match value.parse() {
			Ok(n) => config.sync_interval_minutes = n,
			Err(_) => invalid!("not a valid number of minutes"),
		},
		"SshfsOptions" => config.sshfs_options = Some(value.to_string()),
		"TrashDirs" => {
			config.trash_dirs = value.split(':').filter(|s| !s.is_empty()).map(PathBuf::from).collect()
		}
		"PriorityHalfLife" => match value.parse() {
			Ok(n) => config.priority_half_life_hours = n,
			Err(_) => invalid!("not a valid number of hours"),
		},
		"TrashCleanupPeriod" => match value.parse() {
			Ok(n) => config.trash_cleanup_period_secs = n,
			Err(_) => invalid!("not a valid number of seconds"),
		},
		"UseTrash" => config.use_trash = require_bool(key, value)?,
		"DisableTrash" => config.use_trash = !require_bool(key, value)?,
		"InflatePriority" => config.inflate_priority = require_bool(key, value)?,
		"AccountForSize" => config.account_for_size = require_bool(key, value)?,
		_ => return Err(ConfigError::UnknownKey { key: key.to_string(), line }),
	}
	Ok(())
}

fn parse_bool(value: &str) -> Option<bool> {
	match value.to_ascii_lowercase().as_str() {
		"true" | "yes" | "1" => Some(true),
		"false" | "no" | "0" => Some(false),
		_ => None,
	}
}

fn require_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
	parse_bool(value).ok_or_else(|| ConfigError::InvalidValue {
		key: key.to_string(),
		value: value.to_string(),
		message: "expected true/false/yes/no".to_string(),
	})
}

pub fn load(path: &Path) -> Result<Config, ConfigError> {
	let contents = std::fs::read_to_string(path)?;
	parse(&contents)
}


// vim: ts=4
