//! Closure-table hierarchy store (§4.2).
//!
//! For every known path, records an edge to every ancestor with its
//! depth, enabling O(1) subtree retrieval and O(depth) insertion. This
//! is the shared foundation both the local priority database and the
//! remote metadata database are built on (§4.3, §4.4); the stored
//! payload (`f64`) means "priority" in one and "last_sync" in the
//! other.

use redb::{ReadableTable, TableDefinition};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::PihError;
use crate::pih::{pih, resolve_ids, CollisionTable};

const NODES_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("nodes");
/// Key is 16 bytes: [ancestor:8][descendant:8] big-endian. Value is depth.
const CLOSURE_BY_ANCESTOR: TableDefinition<&[u8], u32> = TableDefinition::new("closure_by_ancestor");
/// Key is 16 bytes: [descendant:8][ancestor:8] big-endian. Value is depth.
const CLOSURE_BY_DESCENDANT: TableDefinition<&[u8], u32> =
	TableDefinition::new("closure_by_descendant");

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct NodeRecord<P> {
	path: String,
	is_dir: bool,
	payload: P,
}

fn edge_key(a: i64, b: i64) -> [u8; 16] {
	let mut buf = [0u8; 16];
	buf[..8].copy_from_slice(&a.to_be_bytes());
	buf[8..].copy_from_slice(&b.to_be_bytes());
	buf
}

/// One row of a subtree/ancestors query.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<P> {
	pub path: String,
	pub is_dir: bool,
	pub payload: P,
}

/// A closure-table hierarchy store backed by a single `redb` database
/// file.
pub struct Chs<P> {
	db: redb::Database,
	_marker: std::marker::PhantomData<P>,
}

impl<P> Chs<P>
where
	P: Serialize + DeserializeOwned + Clone + Default,
{
	/// Open (or create) the database at `path`, ensuring all tables
	/// exist.
	pub fn open(path: &std::path::Path) -> Result<Self, PihError> {
		let db = redb::Database::create(path)?;
		CollisionTable::ensure(&db)?;
		let txn = db.begin_write()?;
		{
			let _ = txn.open_table(NODES_TABLE)?;
			let _ = txn.open_table(CLOSURE_BY_ANCESTOR)?;
			let _ = txn.open_table(CLOSURE_BY_DESCENDANT)?;
		}
		txn.commit()?;
		Ok(Chs { db, _marker: std::marker::PhantomData })
	}

	fn id_of(&self, path: &str) -> Result<i64, PihError> {
		let salt = CollisionTable::salt(&self.db, path)?;
		Ok(pih(path, &salt))
	}

	fn parent_of(path: &str) -> Option<&str> {
		if path.is_empty() {
			return None;
		}
		match path.rfind('/') {
			Some(idx) => Some(&path[..idx]),
			None => Some(""),
		}
	}

	fn read_node(
		table: &impl ReadableTable<i64, &'static [u8]>,
		id: i64,
	) -> Result<Option<NodeRecord<P>>, PihError> {
		match table.get(id)? {
			Some(v) => Ok(Some(bincode::deserialize(v.value())?)),
			None => Ok(None),
		}
	}

	/// Insert a single node and its closure edges, deriving the id via
	/// the PIH insertion protocol (§4.1). Marks the parent path as a
	/// directory. Idempotent: re-adding an existing path overwrites its
	/// payload but leaves the closure structure untouched.
	pub fn add_node(&self, path: &str, is_dir: bool, payload: P) -> Result<i64, PihError> {
		let mut existing = HashMap::new();
		for p in self.all_paths()? {
			let id = self.id_of(&p)?;
			existing.insert(p, id);
		}

		let assigned = resolve_ids(&self.db, &existing, &[path.to_string()])?;
		let id = assigned[path];

		let txn = self.db.begin_write()?;
		{
			let mut nodes = txn.open_table(NODES_TABLE)?;
			let bytes = bincode::serialize(&NodeRecord { path: path.to_string(), is_dir, payload })?;
			nodes.insert(id, bytes.as_slice())?;

			// Self-edge, depth 0.
			{
				let mut by_anc = txn.open_table(CLOSURE_BY_ANCESTOR)?;
				let mut by_desc = txn.open_table(CLOSURE_BY_DESCENDANT)?;
				by_anc.insert(&edge_key(id, id)[..], 0u32)?;
				by_desc.insert(&edge_key(id, id)[..], 0u32)?;
			}

			// Edges to every ancestor of `path`, derived from the parent's
			// closure plus the self-edge (§4.2).
			if let Some(parent_path) = Self::parent_of(path) {
				let parent_id = self.id_of(parent_path)?;
				if nodes.get(parent_id)?.is_some() || parent_path.is_empty() {
					let mut by_desc = txn.open_table(CLOSURE_BY_DESCENDANT)?;
					let parent_ancestors: Vec<(i64, u32)> = by_desc
						.range(&edge_key(parent_id, i64::MIN)[..]..=&edge_key(parent_id, i64::MAX)[..])?
						.filter_map(|r| r.ok())
						.map(|(k, v)| {
							let bytes = k.value();
							let anc = i64::from_be_bytes(bytes[0..8].try_into().unwrap());
							(anc, v.value())
						})
						.collect();
					drop(by_desc);
					let mut by_anc = txn.open_table(CLOSURE_BY_ANCESTOR)?;
					let mut by_desc = txn.open_table(CLOSURE_BY_DESCENDANT)?;
					for (anc, depth) in parent_ancestors {
						by_anc.insert(&edge_key(anc, id)[..], depth + 1)?;
						by_desc.insert(&edge_key(id, anc)[..], depth + 1)?;
					}

					// Mark parent as directory (children imply directoryness).
					if let Some(mut parent_rec) = Self::read_node(&nodes, parent_id)? {
						if !parent_rec.is_dir {
							parent_rec.is_dir = true;
							let bytes = bincode::serialize(&parent_rec)?;
							nodes.insert(parent_id, bytes.as_slice())?;
						}
					}
				}
			}
		}
		txn.commit()?;
		Ok(id)
	}

	/// Delete the node at `path` and every descendant, cascading through
	/// the closure edges.
	pub fn remove_subtree(&self, path: &str) -> Result<(), PihError> {
		let id = self.id_of(path)?;
		let txn = self.db.begin_write()?;
		{
			let descendants: Vec<i64> = {
				let by_anc = txn.open_table(CLOSURE_BY_ANCESTOR)?;
				by_anc
					.range(&edge_key(id, i64::MIN)[..]..=&edge_key(id, i64::MAX)[..])?
					.filter_map(|r| r.ok())
					.map(|(k, _)| {
						let bytes = k.value();
						i64::from_be_bytes(bytes[8..16].try_into().unwrap())
					})
					.collect()
			};

			let mut nodes = txn.open_table(NODES_TABLE)?;
			let mut by_anc = txn.open_table(CLOSURE_BY_ANCESTOR)?;
			let mut by_desc = txn.open_table(CLOSURE_BY_DESCENDANT)?;
			for desc in &descendants {
				nodes.remove(*desc)?;

				// Edges where `desc` is the ancestor: by_anc keys [desc][x].
				let pairs_as_ancestor: Vec<(i64, i64)> = by_anc
					.range(&edge_key(*desc, i64::MIN)[..]..=&edge_key(*desc, i64::MAX)[..])?
					.filter_map(|r| r.ok())
					.map(|(k, _)| (*desc, desc_of(&k.value().try_into().unwrap())))
					.collect();
				for (anc, d) in pairs_as_ancestor {
					by_anc.remove(&edge_key(anc, d)[..])?;
					by_desc.remove(&edge_key(d, anc)[..])?;
				}

				// Edges where `desc` is the descendant: by_desc keys [desc][y].
				let pairs_as_descendant: Vec<(i64, i64)> = by_desc
					.range(&edge_key(*desc, i64::MIN)[..]..=&edge_key(*desc, i64::MAX)[..])?
					.filter_map(|r| r.ok())
					.map(|(k, _)| (desc_of(&k.value().try_into().unwrap()), *desc))
					.collect();
				for (anc, d) in pairs_as_descendant {
					by_anc.remove(&edge_key(anc, d)[..])?;
					by_desc.remove(&edge_key(d, anc)[..])?;
				}
			}
		}
		txn.commit()?;
		Ok(())
	}

	/// Every node in the subtree rooted at `root` (inclusive). `None`
	/// enumerates all nodes.
	pub fn subtree(&self, root: Option<&str>) -> Result<Vec<Entry<P>>, PihError> {
		let txn = self.db.begin_read()?;
		let nodes = txn.open_table(NODES_TABLE)?;
		let ids: Vec<i64> = match root {
			None => nodes.iter()?.filter_map(|r| r.ok()).map(|(k, _)| k.value()).collect(),
			Some(r) => {
				let root_id = self.id_of(r)?;
				let by_anc = txn.open_table(CLOSURE_BY_ANCESTOR)?;
				by_anc
					.range(&edge_key(root_id, i64::MIN)[..]..=&edge_key(root_id, i64::MAX)[..])?
					.filter_map(|row| row.ok())
					.map(|(k, _)| {
						let b = k.value();
						i64::from_be_bytes(b[8..16].try_into().unwrap())
					})
					.collect()
			}
		};
		let mut out = Vec::with_capacity(ids.len());
		for id in ids {
			if let Some(rec) = Self::read_node(&nodes, id)? {
				out.push(Entry { path: rec.path, is_dir: rec.is_dir, payload: rec.payload });
			}
		}
		Ok(out)
	}

	/// Closure rows with `descendant = pih(path)`, ordered by
	/// increasing depth (path itself at depth 0, root last).
	pub fn ancestors(&self, path: &str) -> Result<Vec<(String, u32)>, PihError> {
		let id = self.id_of(path)?;
		let txn = self.db.begin_read()?;
		let by_desc = txn.open_table(CLOSURE_BY_DESCENDANT)?;
		let nodes = txn.open_table(NODES_TABLE)?;
		let mut rows: Vec<(i64, u32)> = by_desc
			.range(&edge_key(id, i64::MIN)[..]..=&edge_key(id, i64::MAX)[..])?
			.filter_map(|r| r.ok())
			.map(|(k, v)| {
				let b = k.value();
				(i64::from_be_bytes(b[8..16].try_into().unwrap()), v.value())
			})
			.collect();
		rows.sort_by_key(|(_, depth)| *depth);
		let mut out = Vec::with_capacity(rows.len());
		for (anc_id, depth) in rows {
			if let Some(rec) = Self::read_node(&nodes, anc_id)? {
				out.push((rec.path, depth));
			}
		}
		Ok(out)
	}

	/// The single node row for `path`, or `None`.
	pub fn get(&self, path: &str) -> Result<Option<(bool, P)>, PihError> {
		let id = self.id_of(path)?;
		let txn = self.db.begin_read()?;
		let nodes = txn.open_table(NODES_TABLE)?;
		Ok(Self::read_node(&nodes, id)?.map(|rec| (rec.is_dir, rec.payload)))
	}

	/// Overwrite the payload of an existing node without touching the
	/// closure structure.
	pub fn set_payload(&self, path: &str, payload: P) -> Result<(), PihError> {
		let id = self.id_of(path)?;
		let txn = self.db.begin_write()?;
		{
			let mut nodes = txn.open_table(NODES_TABLE)?;
			if let Some(mut rec) = Self::read_node(&nodes, id)? {
				rec.payload = payload;
				let bytes = bincode::serialize(&rec)?;
				nodes.insert(id, bytes.as_slice())?;
			}
		}
		txn.commit()?;
		Ok(())
	}

	/// The set of all known relative paths, used for collision-table
	/// garbage collection.
	pub fn all_paths(&self) -> Result<HashSet<String>, PihError> {
		let txn = self.db.begin_read()?;
		let nodes = txn.open_table(NODES_TABLE)?;
		let mut out = HashSet::new();
		for row in nodes.iter()? {
			let (_, v) = row?;
			let rec: NodeRecord<P> = bincode::deserialize(v.value())?;
			out.insert(rec.path);
		}
		Ok(out)
	}

	/// Direct access to the underlying database, for callers (LPDB)
	/// that need their own transactions spanning multiple CHS calls.
	pub fn database(&self) -> &redb::Database {
		&self.db
	}
}

fn desc_of(key: &[u8; 16]) -> i64 {
	i64::from_be_bytes(key[8..16].try_into().unwrap())
}


// vim: ts=4
