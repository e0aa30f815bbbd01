//! Corpus data model: verses, tokens, enriched search results

use serde::{Deserialize, Serialize};

/// Roots shorter than this (marks stripped) are non-lexical particles and
/// excluded from co-occurrence analysis.
pub const MIN_ROOT_LETTERS: usize = 3;

/// Composite verse address, the corpus-wide primary key.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct VerseKey {
    pub surah_no: u32,
    pub ayah_no: u32,
}

impl VerseKey {
    pub fn new(surah_no: u32, ayah_no: u32) -> Self {
        Self { surah_no, ayah_no }
    }

    /// Text form used by the `token.ayah_id` column.
    pub fn as_id(&self) -> String {
        format!("{}:{}", self.surah_no, self.ayah_no)
    }

    /// Parse a `"surah:ayah"` id. `None` for malformed ids.
    pub fn parse(id: &str) -> Option<Self> {
        let (surah, ayah) = id.split_once(':')?;
        Some(Self {
            surah_no: surah.parse().ok()?,
            ayah_no: ayah.parse().ok()?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verse {
    pub global_id: u32,
    pub surah_no: u32,
    pub ayah_no: u32,
    pub text: String,
    pub page: u32,
    pub juz: u32,
}

impl Verse {
    pub fn key(&self) -> VerseKey {
        VerseKey::new(self.surah_no, self.ayah_no)
    }
}

/// One annotated word-unit within a verse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub position: u32,
    pub surface: String,
    pub surface_uthmani: String,
    /// Precomputed plain form from the `token_uthmani` view; keeps
    /// orthography but drops marks. Used for word-form bucketing.
    pub normalized_surface: String,
    pub root: Option<String>,
}

/// Verse plus per-query enrichment: occurrence count of the query root,
/// the tokens carrying it, and the distinct co-occurring roots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedVerse {
    pub id: u32,
    pub surah_no: u32,
    pub ayah_no: u32,
    pub surah_name: String,
    pub text: String,
    pub root_count: u64,
    pub target_tokens: Vec<Token>,
    pub all_tokens: Vec<Token>,
    /// Distinct roots other than the target with stripped length >= 3,
    /// in first-occurrence order.
    pub other_roots: Vec<String>,
    pub page: u32,
    pub juz: u32,
}

impl EnrichedVerse {
    pub fn key(&self) -> VerseKey {
        VerseKey::new(self.surah_no, self.ayah_no)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub root: String,
    pub verses: Vec<EnrichedVerse>,
    pub total_occurrences: u64,
}

impl SearchResult {
    /// Valid empty result: "no matches" is a value here, not an error.
    pub fn empty(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            verses: Vec::new(),
            total_occurrences: 0,
        }
    }
}
