//! In-memory autocomplete index over roots and word surfaces

use crate::error::Result;
use crate::normalize::strip_marks;
use rusqlite::Connection;
use std::collections::{BTreeMap, BTreeSet, HashSet};

pub const MAX_SUGGESTIONS: usize = 10;
pub const MIN_PREFIX_LEN: usize = 2;

/// Built once from the corpus at startup, queried from memory only. Words
/// map their normalized surface to a root; homograph collisions keep the
/// last write (accepted lossy behavior, made reproducible by the ordered
/// build scan).
#[derive(Debug, Default)]
pub struct SuggestionIndex {
    roots: BTreeSet<String>,
    words: BTreeMap<String, String>,
}

impl SuggestionIndex {
    pub fn build(conn: &Connection) -> Result<Self> {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT token, root FROM token \
             WHERE root IS NOT NULL AND length(root) > 0 \
             ORDER BY token, root",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut index = Self::default();
        for row in rows {
            let (token, root) = row?;
            let word = strip_marks(&token);
            let root = strip_marks(&root);
            if word.is_empty() || root.is_empty() {
                continue;
            }
            index.words.insert(word, root.clone());
            index.roots.insert(root);
        }
        tracing::info!(
            words = index.words.len(),
            roots = index.roots.len(),
            "suggestion index built"
        );
        Ok(index)
    }

    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// Autocomplete for a partial query. Direct root matches rank before
    /// word-derived ones; results are distinct roots, at most
    /// [`MAX_SUGGESTIONS`], and prefixes shorter than [`MIN_PREFIX_LEN`]
    /// letters return nothing.
    pub fn query(&self, input: &str) -> Vec<String> {
        let prefix = strip_marks(input.trim());
        if prefix.chars().count() < MIN_PREFIX_LEN {
            return Vec::new();
        }

        let mut out: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for root in self.roots.range(prefix.clone()..) {
            if !root.starts_with(&prefix) {
                break;
            }
            if out.len() >= MAX_SUGGESTIONS {
                return out;
            }
            if seen.insert(root.clone()) {
                out.push(root.clone());
            }
        }

        for (word, root) in self.words.range(prefix.clone()..) {
            if !word.starts_with(&prefix) {
                break;
            }
            if out.len() >= MAX_SUGGESTIONS {
                break;
            }
            if seen.insert(root.clone()) {
                out.push(root.clone());
            }
        }

        out
    }
}
