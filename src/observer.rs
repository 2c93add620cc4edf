//! File-access observer collaborator contract (§1, §4.13). The core
//! does not watch the filesystem itself; it only consumes a debounced
//! stream of recently-opened paths and periodically decays priorities.

use std::collections::HashSet;
use std::time::Duration;

use crate::aging;
use crate::error::PihError;
use crate::lpdb::Lpdb;

/// What the observer daemon is expected to hand the core: a debounced
/// batch of paths opened since the last batch.
pub trait AccessObserver {
	/// Block until the next debounced batch is ready, or return `None`
	/// if the observer has shut down.
	fn next_batch(&mut self) -> Option<HashSet<String>>;
}

/// Drive one observer's lifecycle against an LPDB: apply `increment`
/// for every debounced batch, and `decay` every `adjust_interval`.
pub fn run(
	observer: &mut dyn AccessObserver,
	lpdb: &Lpdb,
	adjust_interval: Duration,
	priority_half_life_hours: f64,
	mut on_adjust: impl FnMut(),
) -> Result<(), PihError> {
	let mut since_last_adjust = Duration::ZERO;

	while let Some(batch) = observer.next_batch() {
		if !batch.is_empty() {
			aging::bump(lpdb, &batch.into_iter().collect::<Vec<_>>())?;
		}

		since_last_adjust += adjust_interval;
		if since_last_adjust >= adjust_interval {
			aging::adjust(lpdb, adjust_interval.as_secs_f64(), priority_half_life_hours)?;
			on_adjust();
			since_last_adjust = Duration::ZERO;
		}
	}
	Ok(())
}


// vim: ts=4
