//! Exclude matcher (§4.5): glob patterns loaded from a file, matched
//! against a sync root with memoized results.

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ExcludeError;
use crate::scanner;

/// One parsed line from an exclude file: `anchored` means the pattern
/// had a leading `/` and is matched literal-separator against the path
/// relative to the sync root; otherwise it is implicitly `**/`-prefixed
/// (matches at any depth).
struct Pattern {
	anchored: bool,
	glob: Glob,
}

pub struct MatchResult {
	pub direct_matches: HashSet<PathBuf>,
	pub all_matches: HashSet<PathBuf>,
}

pub struct ExcludeMatcher {
	patterns: Vec<Pattern>,
	anchored_set: GlobSet,
	depth_set: GlobSet,
	cache: RefCell<HashMap<PathBuf, (HashSet<PathBuf>, HashSet<PathBuf>)>>,
}

impl ExcludeMatcher {
	/// Parse a newline-separated pattern file. Blank lines and lines
	/// whose first non-whitespace character is `#` are ignored.
	pub fn load(path: &Path) -> Result<Self, ExcludeError> {
		let contents = fs::read_to_string(path)?;
		Self::parse(&contents)
	}

	pub fn parse(contents: &str) -> Result<Self, ExcludeError> {
		let mut patterns = Vec::new();
		let mut anchored_builder = GlobSetBuilder::new();
		let mut depth_builder = GlobSetBuilder::new();

		for line in contents.lines() {
			let trimmed = line.trim();
			if trimmed.is_empty() || trimmed.starts_with('#') {
				continue;
			}
			let anchored = trimmed.starts_with('/');
			let stripped = if anchored { &trimmed[1..] } else { trimmed };

			let glob = if anchored {
				GlobBuilder::new(stripped)
					.literal_separator(true)
					.build()
					.map_err(|e| ExcludeError::InvalidPattern {
						pattern: trimmed.to_string(),
						message: e.to_string(),
					})?
			} else {
				let prefixed = format!("**/{}", stripped);
				Glob::new(&prefixed).map_err(|e| ExcludeError::InvalidPattern {
					pattern: trimmed.to_string(),
					message: e.to_string(),
				})?
			};

			if anchored {
				anchored_builder.add(glob.clone());
			} else {
				depth_builder.add(glob.clone());
			}
			patterns.push(Pattern { anchored, glob });
		}

		let anchored_set = anchored_builder
			.build()
			.map_err(|e| ExcludeError::InvalidPattern { pattern: String::new(), message: e.to_string() })?;
		let depth_set = depth_builder
			.build()
			.map_err(|e| ExcludeError::InvalidPattern { pattern: String::new(), message: e.to_string() })?;

		Ok(ExcludeMatcher { patterns, anchored_set, depth_set, cache: RefCell::new(HashMap::new()) })
	}

	pub fn is_empty(&self) -> bool {
		self.patterns.is_empty()
	}

	/// Direct test of a single relative path, with no descendant
	/// expansion or memoization. Used by the scanner and difference
	/// engine to test individual candidates.
	pub fn is_excluded(&self, rel_path: &Path) -> bool {
		self.anchored_set.is_match(rel_path) || self.depth_set.is_match(rel_path)
	}

	/// Evaluate every pattern under `root`, returning `direct_matches`
	/// (paths the glob expansion itself produced) and `all_matches`
	/// (direct matches plus every descendant). Memoized per `root`.
	pub fn matches(&self, root: &Path) -> Result<MatchResult, ExcludeError> {
		if let Some((direct, all)) = self.cache.borrow().get(root) {
			return Ok(MatchResult { direct_matches: direct.clone(), all_matches: all.clone() });
		}

		let mut direct_matches = HashSet::new();
		let entries = scanner::walk_all(root)?;
		for entry in &entries {
			if self.is_excluded(&entry.rel_path) {
				direct_matches.insert(entry.rel_path.clone());
			}
		}

		let mut all_matches = direct_matches.clone();
		for entry in &entries {
			for direct in &direct_matches {
				if entry.rel_path.starts_with(direct) {
					all_matches.insert(entry.rel_path.clone());
				}
			}
		}

		self.cache
			.borrow_mut()
			.insert(root.to_path_buf(), (direct_matches.clone(), all_matches.clone()));
		Ok(MatchResult { direct_matches, all_matches })
	}

	pub fn invalidate(&self, root: &Path) {
		self.cache.borrow_mut().remove(root);
	}
}


// vim: ts=4
