//! Error types for zielen-core operations

use std::error::Error;
use std::fmt;
use std::io;

/// Unified error type for the reconciliation engine.
///
/// Direct variants cover the top-level failure taxonomy of the error
/// handling design; nested variants wrap the domain-specific errors
/// raised by individual components.
#[derive(Debug)]
pub enum ZielenError {
	/// Invalid profile name, config value, or command-line usage.
	Input { message: String },

	/// The remote mount is gone, a predicate query timed out, or a
	/// transfer failed.
	Remote { message: String },

	/// Source tree does not fit in destination free space during setup.
	Space { message: String },

	/// A persisted JSON/config/db file is unreadable or malformed.
	FileParse { path: String, message: String },

	/// Another operation holds the profile lock, or the profile is
	/// `partial` and the command requires `initialized`.
	Status { message: String },

	/// The process received a terminating signal mid-pass.
	Signal { signal: &'static str },

	/// I/O error with no more specific classification.
	Io(io::Error),

	/// Path identity hash / closure store error.
	Pih(PihError),

	/// Exclude matcher error.
	Exclude(ExcludeError),

	/// Directory scanner error.
	Scan(ScanError),

	/// Selection engine error.
	Selection(SelectionError),

	/// Materializer error.
	Materialize(MaterializeError),

	/// Trash lifecycle error.
	Trash(TrashError),

	/// Config load/parse error.
	Config(ConfigError),

	/// Profile metadata error.
	Profile(ProfileError),

	/// Mount collaborator error.
	Mount(MountError),

	/// Process lock error.
	Lock(LockError),

	/// Generic message, used sparingly.
	Other { message: String },
}

impl fmt::Display for ZielenError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ZielenError::Input { message } => write!(f, "{}", message),
			ZielenError::Remote { message } => write!(f, "{}", message),
			ZielenError::Space { message } => write!(f, "{}", message),
			ZielenError::FileParse { path, message } => {
				write!(f, "failed to parse {}: {}", path, message)
			}
			ZielenError::Status { message } => write!(f, "{}", message),
			ZielenError::Signal { signal } => write!(f, "received {}", signal),
			ZielenError::Io(e) => write!(f, "I/O error: {}", e),
			ZielenError::Pih(e) => write!(f, "{}", e),
			ZielenError::Exclude(e) => write!(f, "{}", e),
			ZielenError::Scan(e) => write!(f, "{}", e),
			ZielenError::Selection(e) => write!(f, "{}", e),
			ZielenError::Materialize(e) => write!(f, "{}", e),
			ZielenError::Trash(e) => write!(f, "{}", e),
			ZielenError::Config(e) => write!(f, "{}", e),
			ZielenError::Profile(e) => write!(f, "{}", e),
			ZielenError::Mount(e) => write!(f, "{}", e),
			ZielenError::Lock(e) => write!(f, "{}", e),
			ZielenError::Other { message } => write!(f, "{}", message),
		}
	}
}

impl Error for ZielenError {}

impl From<io::Error> for ZielenError {
	fn from(e: io::Error) -> Self {
		ZielenError::Io(e)
	}
}

macro_rules! nest_error {
	($variant:ident, $ty:ty) => {
		impl From<$ty> for ZielenError {
			fn from(e: $ty) -> Self {
				ZielenError::$variant(e)
			}
		}
	};
}

nest_error!(Pih, PihError);
nest_error!(Exclude, ExcludeError);
nest_error!(Scan, ScanError);
nest_error!(Selection, SelectionError);
nest_error!(Materialize, MaterializeError);
nest_error!(Trash, TrashError);
nest_error!(Config, ConfigError);
nest_error!(Profile, ProfileError);
nest_error!(Mount, MountError);
nest_error!(Lock, LockError);

/// Path identity hash / closure-table hierarchy store errors.
#[derive(Debug)]
pub enum PihError {
	Db(String),
	Serialize(String),
}

impl fmt::Display for PihError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PihError::Db(msg) => write!(f, "database error: {}", msg),
			PihError::Serialize(msg) => write!(f, "serialization error: {}", msg),
		}
	}
}

impl Error for PihError {}

impl From<redb::Error> for PihError {
	fn from(e: redb::Error) -> Self {
		PihError::Db(e.to_string())
	}
}

impl From<redb::TransactionError> for PihError {
	fn from(e: redb::TransactionError) -> Self {
		PihError::Db(e.to_string())
	}
}

impl From<redb::TableError> for PihError {
	fn from(e: redb::TableError) -> Self {
		PihError::Db(e.to_string())
	}
}

impl From<redb::StorageError> for PihError {
	fn from(e: redb::StorageError) -> Self {
		PihError::Db(e.to_string())
	}
}

impl From<redb::CommitError> for PihError {
	fn from(e: redb::CommitError) -> Self {
		PihError::Db(e.to_string())
	}
}

impl From<Box<bincode::ErrorKind>> for PihError {
	fn from(e: Box<bincode::ErrorKind>) -> Self {
		PihError::Serialize(e.to_string())
	}
}

/// Exclude-matcher errors.
#[derive(Debug)]
pub enum ExcludeError {
	InvalidPattern { pattern: String, message: String },
	Io(io::Error),
}

impl fmt::Display for ExcludeError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ExcludeError::InvalidPattern { pattern, message } => {
				write!(f, "invalid exclude pattern {:?}: {}", pattern, message)
			}
			ExcludeError::Io(e) => write!(f, "I/O error reading exclude file: {}", e),
		}
	}
}

impl Error for ExcludeError {}

impl From<io::Error> for ExcludeError {
	fn from(e: io::Error) -> Self {
		ExcludeError::Io(e)
	}
}

/// Directory scanner errors.
#[derive(Debug)]
pub enum ScanError {
	Io { path: String, source: io::Error },
}

impl fmt::Display for ScanError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ScanError::Io { path, source } => write!(f, "failed to scan {}: {}", path, source),
		}
	}
}

impl Error for ScanError {}

/// Selection engine errors.
#[derive(Debug)]
pub enum SelectionError {
	InvalidBudget { message: String },
}

impl fmt::Display for SelectionError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SelectionError::InvalidBudget { message } => write!(f, "{}", message),
		}
	}
}

impl Error for SelectionError {}

/// Materializer errors. Individual path failures are accumulated by the
/// caller rather than propagated through this type (see §7 propagation
/// rules); this variant is for structural failures only.
#[derive(Debug)]
pub enum MaterializeError {
	Io { path: String, source: io::Error },
}

impl fmt::Display for MaterializeError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			MaterializeError::Io { path, source } => {
				write!(f, "failed to materialize {}: {}", path, source)
			}
		}
	}
}

impl Error for MaterializeError {}

/// Remote trash lifecycle errors.
#[derive(Debug)]
pub enum TrashError {
	Io(io::Error),
}

impl fmt::Display for TrashError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TrashError::Io(e) => write!(f, "trash operation failed: {}", e),
		}
	}
}

impl Error for TrashError {}

impl From<io::Error> for TrashError {
	fn from(e: io::Error) -> Self {
		TrashError::Io(e)
	}
}

/// Config load/parse errors.
#[derive(Debug)]
pub enum ConfigError {
	UnknownKey { key: String, line: usize },
	InvalidValue { key: String, value: String, message: String },
	Io(io::Error),
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConfigError::UnknownKey { key, line } => {
				write!(f, "unknown config key {:?} at line {}", key, line)
			}
			ConfigError::InvalidValue { key, value, message } => {
				write!(f, "invalid value {:?} for {}: {}", value, key, message)
			}
			ConfigError::Io(e) => write!(f, "failed to read config file: {}", e),
		}
	}
}

impl Error for ConfigError {}

impl From<io::Error> for ConfigError {
	fn from(e: io::Error) -> Self {
		ConfigError::Io(e)
	}
}

/// Profile metadata errors.
#[derive(Debug)]
pub enum ProfileError {
	AlreadyExists { name: String },
	NotFound { name: String },
	Overlap { existing: String, path: String },
	Invalid { message: String },
	Io(io::Error),
	Json(serde_json::Error),
}

impl fmt::Display for ProfileError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ProfileError::AlreadyExists { name } => write!(f, "profile {:?} already exists", name),
			ProfileError::NotFound { name } => write!(f, "profile {:?} not found", name),
			ProfileError::Overlap { existing, path } => write!(
				f,
				"local directory {} overlaps with profile {:?}",
				path, existing
			),
			ProfileError::Invalid { message } => write!(f, "{}", message),
			ProfileError::Io(e) => write!(f, "{}", e),
			ProfileError::Json(e) => write!(f, "{}", e),
		}
	}
}

impl Error for ProfileError {}

impl From<io::Error> for ProfileError {
	fn from(e: io::Error) -> Self {
		ProfileError::Io(e)
	}
}

impl From<serde_json::Error> for ProfileError {
	fn from(e: serde_json::Error) -> Self {
		ProfileError::Json(e)
	}
}

/// Mount collaborator errors.
#[derive(Debug)]
pub enum MountError {
	SpawnFailed { cmd: String, source: io::Error },
	Timeout,
	SentinelMissing,
}

impl fmt::Display for MountError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			MountError::SpawnFailed { cmd, source } => {
				write!(f, "failed to spawn {:?}: {}", cmd, source)
			}
			MountError::Timeout => write!(f, "mount operation timed out"),
			MountError::SentinelMissing => {
				write!(f, "remote .zielen sentinel directory is not visible")
			}
		}
	}
}

impl Error for MountError {}

/// Process-wide lock errors.
#[derive(Debug)]
pub enum LockError {
	AlreadyLocked { profile: String },
	Io(io::Error),
}

impl fmt::Display for LockError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			LockError::AlreadyLocked { profile } => {
				write!(f, "another instance holds the lock for profile {:?}", profile)
			}
			LockError::Io(e) => write!(f, "{}", e),
		}
	}
}

impl Error for LockError {}

impl From<io::Error> for LockError {
	fn from(e: io::Error) -> Self {
		LockError::Io(e)
	}
}

// vim: ts=4
