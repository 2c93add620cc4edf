//! SSH/sshfs mount collaborator contract (§1, §5). The core treats
//! mounting as an external collaborator: it only needs a mounted tree
//! to exist at the profile's `mnt/` directory within a bounded timeout,
//! and a way to tell whether the mount is still alive.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use crate::error::MountError;

const MOUNT_TIMEOUT: Duration = Duration::from_secs(20);

#[async_trait::async_trait]
pub trait MountCollaborator: Send + Sync {
	async fn mount(&self, mount_point: &Path) -> Result<(), MountError>;
	async fn unmount(&self, mount_point: &Path) -> Result<(), MountError>;
	/// The remote `.zielen` sentinel directory is visible through the
	/// mount point — i.e. the mount is still alive.
	fn is_alive(&self, mount_point: &Path) -> bool {
		mount_point.join(".zielen").is_dir()
	}
}

/// Mounts `RemoteHost:RemoteDir` at the profile's `mnt/` via `sshfs`.
pub struct SshfsMount {
	pub remote_host: String,
	pub remote_user: Option<String>,
	pub port: Option<u16>,
	pub remote_dir: PathBuf,
	pub sshfs_options: Option<String>,
}

#[async_trait::async_trait]
impl MountCollaborator for SshfsMount {
	async fn mount(&self, mount_point: &Path) -> Result<(), MountError> {
		let target = match &self.remote_user {
			Some(user) => format!("{}@{}:{}", user, self.remote_host, self.remote_dir.display()),
			None => format!("{}:{}", self.remote_host, self.remote_dir.display()),
		};

		let mut cmd = Command::new("sshfs");
		cmd.arg(&target).arg(mount_point);
		if let Some(port) = self.port {
			cmd.arg("-p").arg(port.to_string());
		}
		if let Some(options) = &self.sshfs_options {
			cmd.arg("-o").arg(options);
		}
		cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::piped());

		let spawn = cmd.spawn().map_err(|e| MountError::SpawnFailed { cmd: "sshfs".into(), source: e })?;
		let output = timeout(MOUNT_TIMEOUT, spawn.wait_with_output())
			.await
			.map_err(|_| MountError::Timeout)?
			.map_err(|e| MountError::SpawnFailed { cmd: "sshfs".into(), source: e })?;

		if !output.status.success() {
			return Err(MountError::SpawnFailed {
				cmd: "sshfs".into(),
				source: std::io::Error::new(std::io::ErrorKind::Other, "sshfs exited non-zero"),
			});
		}
		if !self.is_alive(mount_point) {
			return Err(MountError::SentinelMissing);
		}
		Ok(())
	}

	async fn unmount(&self, mount_point: &Path) -> Result<(), MountError> {
		let mut cmd = Command::new("fusermount");
		cmd.arg("-u").arg(mount_point);
		let spawn = cmd.spawn().map_err(|e| MountError::SpawnFailed { cmd: "fusermount".into(), source: e })?;
		timeout(MOUNT_TIMEOUT, spawn.wait_with_output())
			.await
			.map_err(|_| MountError::Timeout)?
			.map_err(|e| MountError::SpawnFailed { cmd: "fusermount".into(), source: e })?;
		Ok(())
	}
}

/// A local directory masquerading as "remote" — used when `RemoteHost`
/// is absent (§3 Data model, Config table).
pub struct LocalMount;

#[async_trait::async_trait]
impl MountCollaborator for LocalMount {
	async fn mount(&self, _mount_point: &Path) -> Result<(), MountError> {
		Ok(())
	}

	async fn unmount(&self, _mount_point: &Path) -> Result<(), MountError> {
		Ok(())
	}

	fn is_alive(&self, _mount_point: &Path) -> bool {
		true
	}
}


// vim: ts=4
