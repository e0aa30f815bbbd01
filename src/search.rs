//! Root search over the corpus store
//!
//! The pipeline is resolver -> locator -> enricher: a raw query resolves to
//! a canonical root (directly, or inferred from a matching word surface),
//! the locator finds every verse carrying it in batched store queries, and
//! the enricher attaches full token detail per verse.

use crate::error::{JudhurError, Result};
use crate::metadata::SurahMetadata;
use crate::normalize::{letter_count, strip_marks, SQL_NORMALIZE_TOKEN};
use crate::stats::{
    GlobalStatistics, LengthBucket, LengthSummary, RootFrequency, RootsByLength, SurahRootCount,
};
use crate::tokens::{EnrichedVerse, SearchResult, Token, Verse, VerseKey, MIN_ROOT_LETTERS};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

/// Verse keys per detail-fetch batch. The store bounds both bound-parameter
/// count and boolean expression depth, so the OR-of-AND predicate is kept
/// this small.
pub const VERSE_BATCH_SIZE: usize = 50;

const VERSE_COLUMNS: &str = "global_ayah, surah_no, ayah_no, text_uthmani, page, juz";
const TOKEN_COLUMNS: &str = "ayah_id, pos, token, token_uthmani, root, token_plain_norm";

/// Single verse with its full token annotation, for direct verse lookup.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerseDetail {
    pub id: u32,
    pub surah_no: u32,
    pub ayah_no: u32,
    pub surah_name: String,
    pub text: String,
    pub tokens: Vec<Token>,
    pub page: u32,
    pub juz: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurahVerse {
    pub surah_no: u32,
    pub ayah_no: u32,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurahRootOccurrence {
    pub root: String,
    pub ayah_id: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurahProfile {
    pub number: u32,
    pub name: String,
    pub verses: Vec<SurahVerse>,
    pub roots: Vec<SurahRootOccurrence>,
    pub top_roots: Vec<RootFrequency>,
}

pub struct SearchEngine {
    db_path: PathBuf,
    metadata: Arc<SurahMetadata>,
}

impl SearchEngine {
    pub fn new(db_path: PathBuf, metadata: Arc<SurahMetadata>) -> Self {
        Self { db_path, metadata }
    }

    pub fn metadata(&self) -> &SurahMetadata {
        &self.metadata
    }

    /// Each operation opens its own connection; nothing is held across
    /// requests and the corpus is never written.
    fn connect(&self) -> Result<Connection> {
        Ok(Connection::open(&self.db_path)?)
    }

    /// Two-phase resolve. Phase 1 treats the input as a root; when that
    /// finds nothing, phase 2 normalizes the input, looks for a word whose
    /// plain surface equals or extends it, and reruns phase 1 with that
    /// word's root. A miss on both phases is a valid empty result.
    pub fn search_root(&self, raw: &str) -> Result<SearchResult> {
        let clean = raw.trim();
        if clean.is_empty() {
            return Err(JudhurError::InvalidInput("الجذر غير صالح".to_string()));
        }

        let conn = self.connect()?;

        let direct = self.perform_search(&conn, clean)?;
        if !direct.verses.is_empty() {
            return Ok(direct);
        }

        let normalized = strip_marks(clean);
        if !normalized.is_empty() {
            if let Some(root) = infer_root(&conn, &normalized)? {
                tracing::info!(word = %clean, root = %root, "inferred root from word match");
                return self.perform_search(&conn, &root);
            }
        }

        Ok(direct)
    }

    /// Locate + enrich + total for one canonical root.
    pub fn perform_search(&self, conn: &Connection, target_root: &str) -> Result<SearchResult> {
        let located = self.locate(conn, target_root)?;
        if located.is_empty() {
            return Ok(SearchResult::empty(target_root));
        }
        let verses = self.enrich(conn, located, target_root)?;
        let total_occurrences = verses.iter().map(|v| v.root_count).sum();
        Ok(SearchResult {
            root: target_root.to_string(),
            verses,
            total_occurrences,
        })
    }

    /// Find every verse containing `root`, with its occurrence count, in
    /// canonical `(surah, ayah)` order. Grouped counting hits only the
    /// token table; verse records are then fetched for exactly the matched
    /// keys in fixed-size batches.
    fn locate(&self, conn: &Connection, root: &str) -> Result<Vec<(Verse, u64)>> {
        let mut counts: HashMap<VerseKey, u64> = HashMap::new();
        let mut stmt =
            conn.prepare("SELECT ayah_id, COUNT(*) FROM token WHERE root = ?1 GROUP BY ayah_id")?;
        let rows = stmt.query_map([root], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        })?;
        for row in rows {
            let (id, count) = row?;
            match VerseKey::parse(&id) {
                Some(key) => {
                    counts.insert(key, count);
                }
                None => tracing::warn!(ayah_id = %id, "token row with malformed verse id skipped"),
            }
        }

        if counts.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<VerseKey> = counts.keys().copied().collect();
        let mut verses = fetch_verses_chunked(conn, &keys, VERSE_BATCH_SIZE)?;

        // Batch issuance order is immaterial: the concatenation is sorted
        // and de-duplicated before anything reaches the caller.
        verses.sort_by_key(Verse::key);
        verses.dedup_by_key(|v| v.key());

        if verses.len() < counts.len() {
            tracing::warn!(
                root = %root,
                expected = counts.len(),
                fetched = verses.len(),
                "token rows reference verse keys absent from the ayah table"
            );
        }

        Ok(verses
            .into_iter()
            .map(|verse| {
                let count = counts.get(&verse.key()).copied().unwrap_or(0);
                (verse, count)
            })
            .collect())
    }

    /// Attach token detail to located verses. All tokens for the verse set
    /// come back in one `IN`-list query keyed by the composite id; the
    /// locator's ordering is preserved.
    fn enrich(
        &self,
        conn: &Connection,
        located: Vec<(Verse, u64)>,
        target_root: &str,
    ) -> Result<Vec<EnrichedVerse>> {
        if located.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = located.iter().map(|(verse, _)| verse.key().as_id()).collect();
        let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT {} FROM token_uthmani WHERE ayah_id IN ({}) ORDER BY ayah_id, pos",
            TOKEN_COLUMNS, placeholders
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(ids.iter()), |row| {
            Ok((row.get::<_, String>(0)?, token_from_row(row)?))
        })?;

        let mut by_verse: HashMap<String, Vec<Token>> = HashMap::new();
        for row in rows {
            let (id, token) = row?;
            by_verse.entry(id).or_default().push(token);
        }

        Ok(located
            .into_iter()
            .map(|(verse, root_count)| {
                let tokens = by_verse.remove(&verse.key().as_id()).unwrap_or_default();

                let target_tokens: Vec<Token> = tokens
                    .iter()
                    .filter(|t| t.root.as_deref() == Some(target_root))
                    .cloned()
                    .collect();

                let mut other_roots: Vec<String> = Vec::new();
                let mut seen: HashSet<String> = HashSet::new();
                for token in &tokens {
                    let Some(root) = token.root.as_deref() else {
                        continue;
                    };
                    let root = root.trim();
                    if root == target_root || letter_count(root) < MIN_ROOT_LETTERS {
                        continue;
                    }
                    if seen.insert(root.to_string()) {
                        other_roots.push(root.to_string());
                    }
                }

                EnrichedVerse {
                    id: verse.global_id,
                    surah_no: verse.surah_no,
                    ayah_no: verse.ayah_no,
                    surah_name: self.metadata.name(verse.surah_no),
                    text: verse.text,
                    root_count,
                    target_tokens,
                    all_tokens: tokens,
                    other_roots,
                    page: verse.page,
                    juz: verse.juz,
                }
            })
            .collect())
    }

    /// Single verse by global id, with its tokens.
    pub fn verse_by_global_id(&self, global_id: u32) -> Result<Option<VerseDetail>> {
        let conn = self.connect()?;
        let sql = format!("SELECT {} FROM ayah WHERE global_ayah = ?1", VERSE_COLUMNS);
        let verse = conn
            .query_row(&sql, [global_id as i64], verse_from_row)
            .optional()?;

        let Some(verse) = verse else {
            return Ok(None);
        };

        let sql = format!(
            "SELECT {} FROM token_uthmani WHERE ayah_id = ?1 ORDER BY pos",
            TOKEN_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([verse.key().as_id()], token_from_row)?;
        let mut tokens = Vec::new();
        for row in rows {
            tokens.push(row?);
        }

        Ok(Some(VerseDetail {
            id: verse.global_id,
            surah_no: verse.surah_no,
            ayah_no: verse.ayah_no,
            surah_name: self.metadata.name(verse.surah_no),
            text: verse.text,
            tokens,
            page: verse.page,
            juz: verse.juz,
        }))
    }

    /// Full surah profile: its verses, the per-verse root occurrences, and
    /// the ten most frequent roots. Lexical roots only (stripped length
    /// >= 3).
    pub fn surah_profile(&self, surah_no: u32) -> Result<Option<SurahProfile>> {
        let conn = self.connect()?;

        let mut stmt = conn.prepare(
            "SELECT surah_no, ayah_no, text_uthmani FROM ayah WHERE surah_no = ?1 ORDER BY ayah_no",
        )?;
        let rows = stmt.query_map([surah_no as i64], |row| {
            Ok(SurahVerse {
                surah_no: row.get::<_, i64>(0)? as u32,
                ayah_no: row.get::<_, i64>(1)? as u32,
                text: row.get(2)?,
            })
        })?;
        let mut verses = Vec::new();
        for row in rows {
            verses.push(row?);
        }
        if verses.is_empty() {
            return Ok(None);
        }

        let mut stmt = conn.prepare(
            "SELECT root, ayah_id, COUNT(*) FROM token \
             WHERE ayah_id LIKE ?1 AND root IS NOT NULL AND root != '' \
             GROUP BY root, ayah_id",
        )?;
        let like = format!("{}:%", surah_no);
        let rows = stmt.query_map([like], |row| {
            Ok(SurahRootOccurrence {
                root: row.get(0)?,
                ayah_id: row.get(1)?,
                count: row.get::<_, i64>(2)? as u64,
            })
        })?;
        let mut roots = Vec::new();
        let mut frequency: HashMap<String, u64> = HashMap::new();
        for row in rows {
            let occurrence = row?;
            if letter_count(&occurrence.root) < MIN_ROOT_LETTERS {
                continue;
            }
            *frequency.entry(occurrence.root.clone()).or_insert(0) += occurrence.count;
            roots.push(occurrence);
        }

        let mut top_roots: Vec<RootFrequency> = frequency
            .into_iter()
            .map(|(root, count)| RootFrequency { root, count })
            .collect();
        top_roots.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.root.cmp(&b.root)));
        top_roots.truncate(10);

        Ok(Some(SurahProfile {
            number: surah_no,
            name: self.metadata.name(surah_no),
            verses,
            roots,
            top_roots,
        }))
    }

    /// Corpus-wide statistics snapshot. One grouped scan of the token table
    /// plus two count queries; root filtering happens here so the stripped
    /// length rule matches the rest of the engine.
    pub fn global_statistics(&self) -> Result<GlobalStatistics> {
        let conn = self.connect()?;

        let total_ayahs: i64 =
            conn.query_row("SELECT COUNT(*) FROM ayah", [], |row| row.get(0))?;
        let total_surahs: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT surah_no) FROM ayah",
            [],
            |row| row.get(0),
        )?;

        let lexical = lexical_root_frequencies(&conn)?;
        let total_roots = lexical.len() as u64;
        let total_words: u64 = lexical.iter().map(|r| r.count).sum();

        let mut top_roots = lexical.clone();
        top_roots.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.root.cmp(&b.root)));
        top_roots.truncate(10);

        let mut hapax_roots: Vec<RootFrequency> =
            lexical.iter().filter(|r| r.count == 1).cloned().collect();
        hapax_roots.sort_by(|a, b| a.root.cmp(&b.root));
        hapax_roots.truncate(50);

        let mut length_buckets: HashMap<usize, u64> = HashMap::new();
        for entry in &lexical {
            *length_buckets.entry(letter_count(&entry.root)).or_insert(0) += 1;
        }
        let mut root_length: Vec<LengthBucket> = length_buckets
            .into_iter()
            .map(|(length, count)| LengthBucket { length, count })
            .collect();
        root_length.sort_by_key(|bucket| bucket.length);

        Ok(GlobalStatistics {
            total_ayahs: total_ayahs as u64,
            total_surahs: total_surahs as u64,
            total_roots,
            total_words,
            top_roots,
            hapax_roots,
            root_length,
            roots_per_surah: roots_per_surah(&conn)?,
        })
    }

    /// Roots whose stripped letter count equals `target_length`, most
    /// frequent first. Length filtering must see through diacritics, so it
    /// runs here rather than in SQL.
    pub fn roots_by_length(&self, target_length: usize) -> Result<RootsByLength> {
        if target_length == 0 {
            return Err(JudhurError::InvalidInput("invalid root length".to_string()));
        }

        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT root, COUNT(*) FROM token \
             WHERE root IS NOT NULL AND root != '' GROUP BY root",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(RootFrequency {
                root: row.get(0)?,
                count: row.get::<_, i64>(1)? as u64,
            })
        })?;

        let mut roots = Vec::new();
        for row in rows {
            let entry = row?;
            if letter_count(&entry.root) == target_length {
                roots.push(entry);
            }
        }
        roots.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.root.cmp(&b.root)));

        let summary = LengthSummary {
            total_occurrences: roots.iter().map(|r| r.count).sum(),
            total_roots: roots.len() as u64,
        };
        Ok(RootsByLength { roots, summary })
    }
}

fn verse_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Verse> {
    Ok(Verse {
        global_id: row.get::<_, i64>(0)? as u32,
        surah_no: row.get::<_, i64>(1)? as u32,
        ayah_no: row.get::<_, i64>(2)? as u32,
        text: row.get(3)?,
        page: row.get::<_, i64>(4)? as u32,
        juz: row.get::<_, i64>(5)? as u32,
    })
}

/// Token columns as selected by [`TOKEN_COLUMNS`]; index 0 is the verse id,
/// consumed by callers that need it.
fn token_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        position: row.get::<_, i64>(1)? as u32,
        surface: row.get(2)?,
        surface_uthmani: row.get(3)?,
        root: row.get(4)?,
        normalized_surface: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
    })
}

/// Fetch verse records for exactly `keys`, in batches of `chunk_size`
/// OR-of-AND composite predicates. Output order is whatever the store
/// returns; callers sort.
fn fetch_verses_chunked(
    conn: &Connection,
    keys: &[VerseKey],
    chunk_size: usize,
) -> Result<Vec<Verse>> {
    let mut verses = Vec::with_capacity(keys.len());
    for chunk in keys.chunks(chunk_size.max(1)) {
        let predicate = chunk
            .iter()
            .map(|_| "(surah_no = ? AND ayah_no = ?)")
            .collect::<Vec<_>>()
            .join(" OR ");
        let sql = format!("SELECT {} FROM ayah WHERE {}", VERSE_COLUMNS, predicate);
        let mut stmt = conn.prepare(&sql)?;
        let params = rusqlite::params_from_iter(
            chunk
                .iter()
                .flat_map(|key| [key.surah_no as i64, key.ayah_no as i64]),
        );
        let rows = stmt.query_map(params, verse_from_row)?;
        for row in rows {
            verses.push(row?);
        }
    }
    Ok(verses)
}

/// Phase-2 inference: find a token whose plain surface equals the
/// normalized input, else one that starts with it, and adopt its root.
/// Exact match beats prefix match; within each class the first token by
/// `(ayah_id, pos)` wins, which keeps the rule deterministic.
fn infer_root(conn: &Connection, normalized: &str) -> Result<Option<String>> {
    let exact_sql = format!(
        "SELECT root FROM token WHERE root IS NOT NULL AND {} = ?1 \
         ORDER BY ayah_id, pos LIMIT 1",
        SQL_NORMALIZE_TOKEN
    );
    if let Some(root) = conn
        .query_row(&exact_sql, [normalized], |row| row.get::<_, String>(0))
        .optional()?
    {
        return Ok(Some(root));
    }

    let prefix_sql = format!(
        "SELECT root FROM token WHERE root IS NOT NULL AND {} LIKE ?1 \
         ORDER BY ayah_id, pos LIMIT 1",
        SQL_NORMALIZE_TOKEN
    );
    Ok(conn
        .query_row(&prefix_sql, [format!("{}%", normalized)], |row| {
            row.get::<_, String>(0)
        })
        .optional()?)
}

/// Distinct lexical roots (stripped length >= 3) with their corpus-wide
/// token frequencies.
fn lexical_root_frequencies(conn: &Connection) -> Result<Vec<RootFrequency>> {
    let mut stmt = conn.prepare(
        "SELECT root, COUNT(*) FROM token \
         WHERE root IS NOT NULL AND root != '' GROUP BY root",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(RootFrequency {
            root: row.get(0)?,
            count: row.get::<_, i64>(1)? as u64,
        })
    })?;

    let mut lexical = Vec::new();
    for row in rows {
        let entry = row?;
        if letter_count(&entry.root) >= MIN_ROOT_LETTERS {
            lexical.push(entry);
        }
    }
    Ok(lexical)
}

/// Top ten surahs by distinct lexical root count.
fn roots_per_surah(conn: &Connection) -> Result<Vec<SurahRootCount>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT ayah_id, root FROM token \
         WHERE root IS NOT NULL AND root != ''",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut per_surah: HashMap<u32, HashSet<String>> = HashMap::new();
    for row in rows {
        let (id, root) = row?;
        if letter_count(&root) < MIN_ROOT_LETTERS {
            continue;
        }
        let Some(key) = VerseKey::parse(&id) else {
            tracing::warn!(ayah_id = %id, "token row with malformed verse id skipped");
            continue;
        };
        per_surah.entry(key.surah_no).or_default().insert(root);
    }

    let mut counts: Vec<SurahRootCount> = per_surah
        .into_iter()
        .map(|(surah_no, roots)| SurahRootCount {
            surah_no,
            distinct_roots: roots.len() as u64,
        })
        .collect();
    counts.sort_by(|a, b| {
        b.distinct_roots
            .cmp(&a.distinct_roots)
            .then_with(|| a.surah_no.cmp(&b.surah_no))
    });
    counts.truncate(10);
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn fixture_db() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE ayah (global_ayah INTEGER, surah_no INTEGER, ayah_no INTEGER,
                                text_uthmani TEXT, page INTEGER, juz INTEGER);
             CREATE TABLE token (ayah_id TEXT, pos INTEGER, token TEXT,
                                 token_uthmani TEXT, root TEXT);
             CREATE VIEW token_uthmani AS
                 SELECT ayah_id, pos, token, token_uthmani, root,
                        token AS token_plain_norm
                 FROM token;
             CREATE TABLE surah (surah_no INTEGER, name TEXT,
                                 revelation_order INTEGER, type TEXT);",
        )
        .unwrap();
        (dir, path)
    }

    fn insert_verse(path: &Path, global: u32, surah: u32, ayah: u32) {
        let conn = Connection::open(path).unwrap();
        conn.execute(
            "INSERT INTO ayah VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                global as i64,
                surah as i64,
                ayah as i64,
                format!("نص {}:{}", surah, ayah),
                (global % 604 + 1) as i64,
                (global % 30 + 1) as i64,
            ],
        )
        .unwrap();
    }

    fn insert_token(
        path: &Path,
        surah: u32,
        ayah: u32,
        pos: u32,
        surface: &str,
        root: Option<&str>,
    ) {
        let conn = Connection::open(path).unwrap();
        conn.execute(
            "INSERT INTO token VALUES (?1, ?2, ?3, ?3, ?4)",
            rusqlite::params![format!("{}:{}", surah, ayah), pos as i64, surface, root],
        )
        .unwrap();
    }

    fn engine(path: &Path) -> SearchEngine {
        SearchEngine::new(path.to_path_buf(), Arc::new(SurahMetadata::default()))
    }

    #[test]
    fn blank_input_is_rejected() {
        let (_dir, path) = fixture_db();
        let err = engine(&path).search_root("   ").unwrap_err();
        assert!(matches!(err, JudhurError::InvalidInput(_)));
    }

    #[test]
    fn zero_matches_is_an_empty_result_not_an_error() {
        let (_dir, path) = fixture_db();
        let result = engine(&path).search_root("xyz123").unwrap();
        assert_eq!(result.root, "xyz123");
        assert!(result.verses.is_empty());
        assert_eq!(result.total_occurrences, 0);
    }

    #[test]
    fn direct_search_orders_verses_and_sums_counts() {
        let (_dir, path) = fixture_db();
        // Inserted out of canonical order on purpose.
        insert_verse(&path, 10, 2, 4);
        insert_verse(&path, 3, 1, 3);
        insert_verse(&path, 2, 1, 2);
        insert_token(&path, 2, 4, 0, "رحمة", Some("رحم"));
        insert_token(&path, 1, 3, 0, "الرحيم", Some("رحم"));
        insert_token(&path, 1, 3, 1, "الرحمن", Some("رحم"));
        insert_token(&path, 1, 2, 0, "رحيم", Some("رحم"));

        let result = engine(&path).search_root("رحم").unwrap();
        let keys: Vec<(u32, u32)> = result
            .verses
            .iter()
            .map(|v| (v.surah_no, v.ayah_no))
            .collect();
        assert_eq!(keys, vec![(1, 2), (1, 3), (2, 4)]);
        assert_eq!(result.verses[1].root_count, 2);
        assert_eq!(result.total_occurrences, 4);
        let summed: u64 = result.verses.iter().map(|v| v.root_count).sum();
        assert_eq!(summed, result.total_occurrences);
    }

    #[test]
    fn enrichment_separates_target_tokens_and_other_roots() {
        let (_dir, path) = fixture_db();
        insert_verse(&path, 1, 1, 1);
        insert_token(&path, 1, 1, 0, "الرحمن", Some("رحم"));
        insert_token(&path, 1, 1, 1, "كتاب", Some("كتب"));
        insert_token(&path, 1, 1, 2, "في", Some("في")); // two letters, dropped
        insert_token(&path, 1, 1, 3, "الكاتب", Some("كتب")); // duplicate root
        insert_token(&path, 1, 1, 4, "ذلك", None);

        let result = engine(&path).search_root("رحم").unwrap();
        let verse = &result.verses[0];
        assert_eq!(verse.all_tokens.len(), 5);
        assert_eq!(verse.target_tokens.len(), 1);
        assert!(verse
            .target_tokens
            .iter()
            .all(|t| t.root.as_deref() == Some("رحم")));
        assert_eq!(verse.other_roots, vec!["كتب"]);
    }

    #[test]
    fn word_with_diacritics_resolves_through_inference() {
        let (_dir, path) = fixture_db();
        insert_verse(&path, 1, 1, 1);
        insert_token(&path, 1, 1, 0, "الرَّحْمَٰنِ", Some("رحم"));

        let engine = engine(&path);
        // "الرحمن" is no root, but its plain surface matches the token.
        let inferred = engine.search_root("الرحمن").unwrap();
        let direct = engine.search_root("رحم").unwrap();
        assert_eq!(inferred.root, direct.root);
        assert_eq!(inferred.total_occurrences, direct.total_occurrences);
        assert_eq!(inferred.verses.len(), direct.verses.len());
    }

    #[test]
    fn direct_root_match_short_circuits_inference() {
        let (_dir, path) = fixture_db();
        insert_verse(&path, 1, 1, 1);
        insert_verse(&path, 2, 1, 2);
        insert_token(&path, 1, 1, 0, "رحمة", Some("رحم"));
        // A word surface starting with the query with a DIFFERENT root;
        // phase 2 would pick it up, but phase 1 must win outright.
        insert_token(&path, 1, 2, 0, "رحمن", Some("صدق"));

        let result = engine(&path).search_root("رحم").unwrap();
        assert_eq!(result.root, "رحم");
        assert_eq!(result.verses.len(), 1);
        assert_eq!(result.verses[0].ayah_no, 1);
    }

    #[test]
    fn inference_prefers_exact_surface_over_prefix() {
        let (_dir, path) = fixture_db();
        insert_verse(&path, 1, 1, 1);
        insert_verse(&path, 2, 1, 2);
        // "نور" is nobody's root here, so phase 1 finds nothing. The prefix
        // candidate "نورهم" appears first in (ayah_id, pos) order...
        insert_token(&path, 1, 1, 0, "نورهم", Some("قدم"));
        // ...but the exact surface match must still win the inference.
        insert_token(&path, 1, 2, 0, "نور", Some("نير"));

        let result = engine(&path).search_root("نور").unwrap();
        assert_eq!(result.root, "نير");
        assert_eq!(result.verses.len(), 1);
        assert_eq!(result.verses[0].ayah_no, 2);
    }

    #[test]
    fn orphan_token_keys_are_skipped_with_remaining_verses_kept() {
        let (_dir, path) = fixture_db();
        insert_verse(&path, 1, 1, 1);
        insert_token(&path, 1, 1, 0, "رحمة", Some("رحم"));
        // No ayah row for 9:9 and a malformed id: both skipped, not fatal.
        insert_token(&path, 9, 9, 0, "رحيم", Some("رحم"));
        let conn = Connection::open(&path).unwrap();
        conn.execute(
            "INSERT INTO token VALUES ('broken', 0, 'رحمن', 'رحمن', 'رحم')",
            [],
        )
        .unwrap();

        let result = engine(&path).search_root("رحم").unwrap();
        assert_eq!(result.verses.len(), 1);
        assert_eq!(result.verses[0].surah_no, 1);
        assert_eq!(result.total_occurrences, 1);
    }

    #[test]
    fn batching_is_invisible_around_the_boundary() {
        // 49, 50 and 51 matched verses straddle the default batch size.
        for verse_count in [49u32, 50, 51] {
            let (_dir, path) = fixture_db();
            for i in 0..verse_count {
                // Spread across surahs, inserted in reverse order.
                let surah = 1 + (verse_count - 1 - i) % 7;
                let ayah = 1 + (verse_count - 1 - i);
                insert_verse(&path, verse_count - i, surah, ayah);
                insert_token(&path, surah, ayah, 0, "كلمة", Some("جذر"));
            }

            let result = engine(&path).search_root("جذر").unwrap();
            assert_eq!(result.verses.len(), verse_count as usize);
            assert_eq!(result.total_occurrences, verse_count as u64);
            for pair in result.verses.windows(2) {
                assert!(pair[0].key() < pair[1].key());
            }

            // Same content and order for any batch size.
            let conn = Connection::open(&path).unwrap();
            let keys: Vec<VerseKey> = result.verses.iter().map(|v| v.key()).collect();
            for chunk_size in [1usize, 7, VERSE_BATCH_SIZE, 500] {
                let mut verses = fetch_verses_chunked(&conn, &keys, chunk_size).unwrap();
                verses.sort_by_key(Verse::key);
                verses.dedup_by_key(|v| v.key());
                let fetched: Vec<VerseKey> = verses.iter().map(Verse::key).collect();
                assert_eq!(fetched, keys);
            }
        }
    }

    #[test]
    fn verse_by_global_id_returns_tokens_in_position_order() {
        let (_dir, path) = fixture_db();
        insert_verse(&path, 7, 1, 7);
        insert_token(&path, 1, 7, 1, "الضالين", Some("ضلل"));
        insert_token(&path, 1, 7, 0, "صراط", Some("صرط"));

        let detail = engine(&path).verse_by_global_id(7).unwrap().unwrap();
        assert_eq!(detail.surah_no, 1);
        assert_eq!(detail.tokens.len(), 2);
        assert_eq!(detail.tokens[0].position, 0);
        assert!(engine(&path).verse_by_global_id(9999).unwrap().is_none());
    }

    #[test]
    fn surah_profile_filters_short_roots_and_ranks_frequencies() {
        let (_dir, path) = fixture_db();
        insert_verse(&path, 1, 1, 1);
        insert_verse(&path, 2, 1, 2);
        insert_verse(&path, 3, 12, 1);
        insert_token(&path, 1, 1, 0, "كتاب", Some("كتب"));
        insert_token(&path, 1, 1, 1, "في", Some("في"));
        insert_token(&path, 1, 2, 0, "كتب", Some("كتب"));
        insert_token(&path, 1, 2, 1, "قال", Some("قول"));
        // Surah 12 must not bleed into surah 1 via the id prefix.
        insert_token(&path, 12, 1, 0, "يوسف", Some("يسف"));

        let profile = engine(&path).surah_profile(1).unwrap().unwrap();
        assert_eq!(profile.number, 1);
        assert_eq!(profile.verses.len(), 2);
        assert!(profile
            .roots
            .iter()
            .all(|r| r.root != "في" && r.root != "يسف"));
        assert_eq!(profile.top_roots[0].root, "كتب");
        assert_eq!(profile.top_roots[0].count, 2);
        assert!(engine(&path).surah_profile(90).unwrap().is_none());
    }

    #[test]
    fn global_statistics_respect_the_stripped_length_rule() {
        let (_dir, path) = fixture_db();
        insert_verse(&path, 1, 1, 1);
        insert_verse(&path, 2, 2, 1);
        insert_token(&path, 1, 1, 0, "كتاب", Some("كتب"));
        insert_token(&path, 1, 1, 1, "كاتب", Some("كتب"));
        insert_token(&path, 1, 1, 2, "في", Some("في"));
        insert_token(&path, 2, 1, 0, "استغفر", Some("غفر"));

        let stats = engine(&path).global_statistics().unwrap();
        assert_eq!(stats.total_ayahs, 2);
        assert_eq!(stats.total_surahs, 2);
        assert_eq!(stats.total_roots, 2); // كتب and غفر; في is too short
        assert_eq!(stats.total_words, 3);
        assert_eq!(stats.top_roots[0].root, "كتب");
        assert_eq!(
            stats.hapax_roots,
            vec![RootFrequency {
                root: "غفر".to_string(),
                count: 1
            }]
        );
        assert_eq!(
            stats.root_length,
            vec![LengthBucket {
                length: 3,
                count: 2
            }]
        );
        assert_eq!(stats.roots_per_surah[0].distinct_roots, 1);
    }

    #[test]
    fn roots_by_length_measures_stripped_letters() {
        let (_dir, path) = fixture_db();
        insert_verse(&path, 1, 1, 1);
        // Root stored with a mark: one visible char more than its stripped
        // letter count.
        insert_token(&path, 1, 1, 0, "قال", Some("قَول"));
        insert_token(&path, 1, 1, 1, "استغفر", Some("غفر"));
        insert_token(&path, 1, 1, 2, "في", Some("في"));

        let by_three = engine(&path).roots_by_length(3).unwrap();
        let names: Vec<&str> = by_three.roots.iter().map(|r| r.root.as_str()).collect();
        assert_eq!(names, vec!["غفر", "قَول"]);
        assert_eq!(by_three.summary.total_roots, 2);
        assert_eq!(by_three.summary.total_occurrences, 2);

        let by_two = engine(&path).roots_by_length(2).unwrap();
        assert_eq!(by_two.roots.len(), 1);
        assert!(matches!(
            engine(&path).roots_by_length(0),
            Err(JudhurError::InvalidInput(_))
        ));
    }
}
