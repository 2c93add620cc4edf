//! Typed representation of the recognized config keys (§3 Data model,
//! Config table).

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
	pub local_dir: PathBuf,
	pub remote_dir: PathBuf,
	pub remote_host: Option<String>,
	pub remote_user: Option<String>,
	pub port: Option<u16>,
	pub storage_limit: u64,
	pub sync_interval_minutes: u64,
	pub sshfs_options: Option<String>,
	pub trash_dirs: Vec<PathBuf>,
	pub priority_half_life_hours: f64,
	pub use_trash: bool,
	pub inflate_priority: bool,
	pub account_for_size: bool,
	pub trash_cleanup_period_secs: f64,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			local_dir: PathBuf::new(),
			remote_dir: PathBuf::new(),
			remote_host: None,
			remote_user: None,
			port: None,
			storage_limit: 0,
			sync_interval_minutes: 30,
			sshfs_options: None,
			trash_dirs: Vec::new(),
			priority_half_life_hours: 24.0,
			use_trash: true,
			inflate_priority: true,
			account_for_size: true,
			trash_cleanup_period_secs: 7.0 * 86400.0,
		}
	}
}

impl Config {
	/// `true` when no `RemoteHost` is configured, i.e. the remote is a
	/// plain local directory rather than reached via the SSH
	/// collaborator.
	pub fn is_local_remote(&self) -> bool {
		self.remote_host.is_none()
	}
}

/// Parse a `StorageLimit`-style value: an integer followed by an
/// optional unit in {K,KB,KiB,M,MB,MiB,G,GB,GiB}.
pub fn parse_byte_size(value: &str) -> Result<u64, String> {
	let trimmed = value.trim();
	let split_at = trimmed.find(|c: char| !c.is_ascii_digit()).unwrap_or(trimmed.len());
	let (digits, unit) = trimmed.split_at(split_at);
	let base: u64 =
		digits.parse().map_err(|_| format!("{:?} does not start with an integer", value))?;
	let multiplier: u64 = match unit.trim() {
		"" | "B" => 1,
		"K" | "KB" => 1_000,
		"KiB" => 1_024,
		"M" | "MB" => 1_000_000,
		"MiB" => 1_024 * 1_024,
		"G" | "GB" => 1_000_000_000,
		"GiB" => 1_024 * 1_024 * 1_024,
		other => return Err(format!("unrecognized size unit {:?}", other)),
	};
	Ok(base * multiplier)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_plain_integer_as_bytes() {
		assert_eq!(parse_byte_size("100").unwrap(), 100);
	}

	#[test]
	fn parses_binary_units() {
		assert_eq!(parse_byte_size("2KiB").unwrap(), 2048);
		assert_eq!(parse_byte_size("1GiB").unwrap(), 1024 * 1024 * 1024);
	}

	#[test]
	fn parses_decimal_units() {
		assert_eq!(parse_byte_size("3MB").unwrap(), 3_000_000);
	}

	#[test]
	fn rejects_unknown_unit() {
		assert!(parse_byte_size("5XB").is_err());
	}
}

// vim: ts=4
