//! Surah metadata lookup, loaded once from the corpus store

use crate::error::Result;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RevelationType {
    Meccan,
    Medinan,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurahInfo {
    pub name: String,
    pub revelation_order: u32,
    #[serde(rename = "type")]
    pub revelation_type: RevelationType,
}

/// Read-only `surah_no -> {name, revelation order, type}` table with the
/// reverse revelation-order index. Injected into the engine and aggregator
/// rather than looked up globally.
#[derive(Debug, Default)]
pub struct SurahMetadata {
    by_surah: HashMap<u32, SurahInfo>,
    by_order: HashMap<u32, u32>,
}

impl SurahMetadata {
    pub fn from_entries(entries: impl IntoIterator<Item = (u32, SurahInfo)>) -> Self {
        let mut meta = Self::default();
        for (surah_no, info) in entries {
            meta.by_order.insert(info.revelation_order, surah_no);
            meta.by_surah.insert(surah_no, info);
        }
        meta
    }

    /// Load the 114-entry `surah` table. A corpus without it degrades to an
    /// empty provider; the aggregator then skips timeline and era splits.
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut stmt = match conn.prepare(
            "SELECT surah_no, name, revelation_order, type FROM surah",
        ) {
            Ok(stmt) => stmt,
            Err(_) => {
                tracing::warn!("surah table missing; timeline and era statistics disabled");
                return Ok(Self::default());
            }
        };

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)? as u32,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)? as u32,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut meta = Self::default();
        for row in rows {
            let (surah_no, name, revelation_order, kind) = row?;
            let revelation_type = match kind.as_str() {
                "Meccan" => RevelationType::Meccan,
                "Medinan" => RevelationType::Medinan,
                other => {
                    tracing::warn!(surah_no, kind = %other, "unknown revelation type skipped");
                    continue;
                }
            };
            meta.by_order.insert(revelation_order, surah_no);
            meta.by_surah.insert(
                surah_no,
                SurahInfo {
                    name,
                    revelation_order,
                    revelation_type,
                },
            );
        }
        Ok(meta)
    }

    pub fn get(&self, surah_no: u32) -> Option<&SurahInfo> {
        self.by_surah.get(&surah_no)
    }

    pub fn surah_for_order(&self, order: u32) -> Option<u32> {
        self.by_order.get(&order).copied()
    }

    /// Display name with the conventional fallback for unknown surahs.
    pub fn name(&self, surah_no: u32) -> String {
        match self.by_surah.get(&surah_no) {
            Some(info) => info.name.clone(),
            None => format!("سورة {}", surah_no),
        }
    }

    pub fn len(&self) -> usize {
        self.by_surah.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_surah.is_empty()
    }
}
