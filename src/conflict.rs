//! Conflict resolver (§4.9): for every non-directory path modified on
//! both sides since the last sync, the older copy is renamed with a
//! timestamped suffix so both versions survive reconciliation as
//! ordinary files.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::ZielenError;
use crate::lpdb::Lpdb;
use crate::rmdb::Rmdb;

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
	pub original_path: String,
	pub renamed_path: String,
	pub renamed_side_was_older: Side,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Side {
	Local,
	Remote,
}

/// Insert a `_conflict-YYYYMMDD-HHMMSS` suffix before the extension of
/// `path`, using `unix_time` (seconds since the epoch) for the
/// timestamp.
pub fn conflict_path(path: &str, unix_time: f64) -> String {
	let ts = format_timestamp(unix_time);
	match path.rfind('.') {
		Some(dot) if dot > path.rfind('/').unwrap_or(0) => {
			format!("{}_conflict-{}{}", &path[..dot], ts, &path[dot..])
		}
		_ => format!("{}_conflict-{}", path, ts),
	}
}

fn format_timestamp(unix_time: f64) -> String {
	let secs = unix_time as i64;
	let days_since_epoch = secs.div_euclid(86400);
	let day_secs = secs.rem_euclid(86400);
	let (year, month, day) = civil_from_days(days_since_epoch);
	let hour = day_secs / 3600;
	let minute = (day_secs % 3600) / 60;
	let second = day_secs % 60;
	format!("{:04}{:02}{:02}-{:02}{:02}{:02}", year, month, day, hour, minute, second)
}

/// Render `unix_time` as the ISO-8601 timestamp string `info.json`
/// persists for `last_sync`/`last_adjust` (§6).
pub fn to_iso8601(unix_time: f64) -> String {
	let secs = unix_time.floor() as i64;
	let days_since_epoch = secs.div_euclid(86400);
	let day_secs = secs.rem_euclid(86400);
	let (year, month, day) = civil_from_days(days_since_epoch);
	let hour = day_secs / 3600;
	let minute = (day_secs % 3600) / 60;
	let second = day_secs % 60;
	format!("{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z", year, month, day, hour, minute, second)
}

/// Parse an ISO-8601 timestamp produced by [`to_iso8601`] back into unix
/// seconds. Returns `None` on malformed input (e.g. a freshly-created
/// profile whose `info.json` has not been written by a pass yet).
pub fn from_iso8601(s: &str) -> Option<f64> {
	let s = s.strip_suffix('Z').unwrap_or(s);
	let (date, time) = s.split_once('T')?;
	let mut date_parts = date.splitn(3, '-');
	let year: i64 = date_parts.next()?.parse().ok()?;
	let month: u32 = date_parts.next()?.parse().ok()?;
	let day: u32 = date_parts.next()?.parse().ok()?;
	let mut time_parts = time.splitn(3, ':');
	let hour: i64 = time_parts.next()?.parse().ok()?;
	let minute: i64 = time_parts.next()?.parse().ok()?;
	let second: i64 = time_parts.next()?.parse().ok()?;
	let days = days_from_civil(year, month, day);
	Some((days * 86400 + hour * 3600 + minute * 60 + second) as f64)
}

/// Howard Hinnant's days-from-civil algorithm, inverted.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
	let z = z + 719468;
	let era = if z >= 0 { z } else { z - 146096 } / 146097;
	let doe = (z - era * 146097) as u64;
	let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
	let y = yoe as i64 + era * 400;
	let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
	let mp = (5 * doy + 2) / 153;
	let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
	let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
	let y = if m <= 2 { y + 1 } else { y };
	(y, m, d)
}

/// Howard Hinnant's days-from-civil algorithm.
fn days_from_civil(y: i64, m: u32, d: u32) -> i64 {
	let y = if m <= 2 { y - 1 } else { y };
	let era = if y >= 0 { y } else { y - 399 } / 400;
	let yoe = (y - era * 400) as u64;
	let mp = ((m as i64 + 9) % 12) as u64;
	let doy = (153 * mp + 2) / 5 + d as u64 - 1;
	let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
	era * 146097 + doe as i64 - 719468
}

/// Resolve every path present in both `local_modified` and
/// `remote_modified`, given each side's mtime. Ties (equal mtimes)
/// leave both copies unchanged.
pub fn resolve(
	local_modified: &HashSet<String>,
	remote_modified: &HashSet<String>,
	local_mtime: impl Fn(&str) -> Option<f64>,
	remote_mtime: impl Fn(&str) -> Option<f64>,
	local_root: &Path,
	remote_root: &Path,
	lpdb: &Lpdb,
	rmdb: &Rmdb,
	now: f64,
) -> Result<Vec<Resolution>, ZielenError> {
	let mut resolutions = Vec::new();

	for path in local_modified.intersection(remote_modified) {
		let (Some(lm), Some(rm)) = (local_mtime(path), remote_mtime(path)) else {
			continue;
		};
		if (lm - rm).abs() < f64::EPSILON {
			continue;
		}

		let older_side = if lm < rm { Side::Local } else { Side::Remote };
		let renamed = conflict_path(path, now);

		match older_side {
			Side::Local => {
				fs::rename(local_root.join(path), local_root.join(&renamed))?;
			}
			Side::Remote => {
				fs::rename(remote_root.join(path), remote_root.join(&renamed))?;
			}
		}

		lpdb.rm_paths(&[path.clone()])?;
		lpdb.add_paths(&[renamed.clone()], &[], 0.0, false)?;
		rmdb.rm_paths(&[path.clone()])?;
		rmdb.add_paths(&[renamed.clone()], &[], now)?;

		resolutions.push(Resolution {
			original_path: path.clone(),
			renamed_path: renamed,
			renamed_side_was_older: older_side,
		});
	}

	Ok(resolutions)
}

pub fn now_unix() -> f64 {
	SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or(0.0)
}


// vim: ts=4
