//! Process-wide advisory lock (§5): excludes a second reconciliation
//! thread for the same `(user_id, profile_name)` pair. Bound to a Linux
//! abstract-namespace unix socket, which the kernel releases as soon as
//! the owning process exits for any reason, signal-kill included — no
//! explicit cleanup path is needed the way a lock *file* would require.

use std::os::unix::net::UnixListener;

use crate::error::LockError;

pub struct ProfileLock {
	_listener: UnixListener,
	profile: String,
}

impl ProfileLock {
	/// Attempt to acquire the lock for `(user_id, profile_name)`. Fails
	/// immediately if another process already holds it.
	pub fn acquire(user_id: u32, profile_name: &str) -> Result<Self, LockError> {
		let name = format!("\0zielen-{}-{}", user_id, profile_name);
		match UnixListener::bind(name) {
			Ok(listener) => Ok(ProfileLock { _listener: listener, profile: profile_name.to_string() }),
			Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
				Err(LockError::AlreadyLocked { profile: profile_name.to_string() })
			}
			Err(e) => Err(LockError::Io(e)),
		}
	}

	pub fn profile(&self) -> &str {
		&self.profile
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn second_acquire_for_same_profile_fails() {
		let uid = std::process::id();
		let _first = ProfileLock::acquire(uid, "lock-test-profile-a").unwrap();
		let second = ProfileLock::acquire(uid, "lock-test-profile-a");
		assert!(matches!(second, Err(LockError::AlreadyLocked { .. })));
	}

	#[test]
	fn different_profiles_do_not_conflict() {
		let uid = std::process::id();
		let _a = ProfileLock::acquire(uid, "lock-test-profile-b").unwrap();
		let b = ProfileLock::acquire(uid, "lock-test-profile-c");
		assert!(b.is_ok());
	}

	#[test]
	fn lock_releases_on_drop() {
		let uid = std::process::id();
		{
			let _lock = ProfileLock::acquire(uid, "lock-test-profile-d").unwrap();
		}
		let reacquired = ProfileLock::acquire(uid, "lock-test-profile-d");
		assert!(reacquired.is_ok());
	}
}

// vim: ts=4
