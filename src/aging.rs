//! Priority aging (§4.13): exponential decay of LPDB priorities
//! between adjustments, and the debounced per-access increment the
//! observer collaborator drives.

use crate::error::PihError;
use crate::lpdb::Lpdb;

/// Decay factor for one adjustment interval, given the half-life and
/// the interval length in the same units (typically hours).
pub fn decay_factor(adjust_interval_secs: f64, half_life_hours: f64) -> f64 {
	let half_life_secs = half_life_hours * 3600.0;
	0.5_f64.powf(adjust_interval_secs / half_life_secs)
}

/// Apply one decay step to every LPDB priority.
pub fn adjust(lpdb: &Lpdb, adjust_interval_secs: f64, half_life_hours: f64) -> Result<(), PihError> {
	lpdb.decay(decay_factor(adjust_interval_secs, half_life_hours))
}

/// Increment the priority of a debounced batch of recently-opened
/// files by a fixed amount (1.0 per §4.13).
pub fn bump(lpdb: &Lpdb, paths: &[String]) -> Result<(), PihError> {
	lpdb.increment(paths, 1.0)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn decay_factor_halves_priority_after_one_half_life() {
		let factor = decay_factor(3600.0, 1.0);
		assert!((factor - 0.5).abs() < 1e-9);
	}

	#[test]
	fn decay_factor_is_close_to_one_for_short_intervals() {
		let factor = decay_factor(600.0, 24.0);
		assert!(factor > 0.9 && factor < 1.0);
	}

	#[test]
	fn adjust_decays_lpdb_priorities() {
		use tempfile::TempDir;
		let tmp = TempDir::new().unwrap();
		let lpdb = Lpdb::open(&tmp.path().join("l.db")).unwrap();
		lpdb.add_paths(&["a.txt".to_string()], &[], 4.0, false).unwrap();
		adjust(&lpdb, 3600.0, 1.0).unwrap();
		assert_eq!(lpdb.get("a.txt").unwrap().unwrap().priority, 2.0);
	}

	#[test]
	fn bump_increments_by_one() {
		use tempfile::TempDir;
		let tmp = TempDir::new().unwrap();
		let lpdb = Lpdb::open(&tmp.path().join("l.db")).unwrap();
		lpdb.add_paths(&["a.txt".to_string()], &[], 0.0, false).unwrap();
		bump(&lpdb, &["a.txt".to_string()]).unwrap();
		assert_eq!(lpdb.get("a.txt").unwrap().unwrap().priority, 1.0);
	}
}

// vim: ts=4
