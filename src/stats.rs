//! Statistics aggregation over a search result

use crate::metadata::{RevelationType, SurahMetadata};
use crate::normalize::letter_count;
use crate::tokens::{SearchResult, MIN_ROOT_LETTERS};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Word forms retained after frequency ranking.
pub const MAX_FORMS: usize = 20;
/// Co-occurring roots retained for the network graph.
pub const NETWORK_ROOTS: usize = 15;
/// Co-occurring roots joining the target in the matrix.
pub const MATRIX_ROOTS: usize = 6;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FormCount {
    pub form: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePoint {
    /// Revelation order, 1..=114.
    pub order: u32,
    /// Standard Quranic order of the same surah.
    pub surah_no: u32,
    pub surah: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct EraSplit {
    pub meccan: u64,
    pub medinan: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkNode {
    pub id: String,
    pub group: u32,
    pub radius: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkLink {
    pub source: String,
    pub target: String,
    pub value: u64,
}

/// Star topology: the target root at the center, one satellite and one
/// link per retained co-occurring root.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Network {
    pub nodes: Vec<NetworkNode>,
    pub links: Vec<NetworkLink>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatrixCell {
    pub x: String,
    pub y: String,
    pub value: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_occurrences: u64,
    pub total_ayahs: usize,
    pub unique_surahs: usize,
    /// Per-surah sum of `rootCount`.
    pub surah_distribution: BTreeMap<String, u64>,
    /// Top co-occurring roots as `(root, verse-presence count)`.
    pub top_accompanying_roots: Vec<(String, u64)>,
    /// Per-juz and per-page VERSE counts: one per matching verse, not
    /// weighted by `rootCount`.
    pub juz_distribution: BTreeMap<String, u64>,
    pub page_distribution: BTreeMap<String, u64>,
    pub average_occurrences_per_ayah: String,
    pub forms: Vec<FormCount>,
    pub timeline: Vec<TimelinePoint>,
    pub era: EraSplit,
    pub network: Network,
    pub matrix: Vec<MatrixCell>,
}

/// Aggregate a search result. `None` when the result holds no verses;
/// downstream renders that as the "no matches" state. Missing surah
/// metadata skips the affected verse's timeline/era contribution and
/// nothing else.
pub fn compute(result: &SearchResult, metadata: &SurahMetadata) -> Option<Statistics> {
    if result.verses.is_empty() {
        return None;
    }

    let target = result.root.as_str();
    // Recomputed from per-verse counts so the aggregate satisfies
    // total = sum(rootCount) whatever the caller supplied.
    let total_occurrences: u64 = result.verses.iter().map(|v| v.root_count).sum();

    let mut surah_distribution: BTreeMap<String, u64> = BTreeMap::new();
    let mut juz_distribution: BTreeMap<String, u64> = BTreeMap::new();
    let mut page_distribution: BTreeMap<String, u64> = BTreeMap::new();
    let mut timeline_counts: BTreeMap<u32, u64> = BTreeMap::new();
    let mut era = EraSplit::default();

    // Insertion order is kept on the side so descending stable sorts break
    // frequency ties by first appearance.
    let mut form_order: Vec<String> = Vec::new();
    let mut form_counts: HashMap<String, u64> = HashMap::new();
    let mut accomp_order: Vec<String> = Vec::new();
    let mut accomp_counts: HashMap<String, u64> = HashMap::new();

    for verse in &result.verses {
        *surah_distribution
            .entry(verse.surah_name.clone())
            .or_insert(0) += verse.root_count;

        if let Some(meta) = metadata.get(verse.surah_no) {
            *timeline_counts.entry(meta.revelation_order).or_insert(0) += verse.root_count;
            match meta.revelation_type {
                RevelationType::Meccan => era.meccan += verse.root_count,
                RevelationType::Medinan => era.medinan += verse.root_count,
            }
        }

        for token in &verse.target_tokens {
            let form = if token.normalized_surface.is_empty() {
                token.surface_uthmani.clone()
            } else {
                token.normalized_surface.clone()
            };
            match form_counts.get_mut(&form) {
                Some(count) => *count += 1,
                None => {
                    form_counts.insert(form.clone(), 1);
                    form_order.push(form);
                }
            }
        }

        // other_roots is already distinct per verse, so each bump below is
        // a verse-presence count rather than a token frequency.
        for other in &verse.other_roots {
            let other = other.trim();
            if letter_count(other) < MIN_ROOT_LETTERS {
                continue;
            }
            match accomp_counts.get_mut(other) {
                Some(count) => *count += 1,
                None => {
                    accomp_counts.insert(other.to_string(), 1);
                    accomp_order.push(other.to_string());
                }
            }
        }

        *juz_distribution
            .entry(format!("الجزء {}", verse.juz))
            .or_insert(0) += 1;
        *page_distribution
            .entry(format!("صفحة {}", verse.page))
            .or_insert(0) += 1;
    }

    let mut forms: Vec<FormCount> = form_order
        .into_iter()
        .map(|form| {
            let count = form_counts[&form];
            FormCount { form, count }
        })
        .collect();
    forms.sort_by(|a, b| b.count.cmp(&a.count));
    forms.truncate(MAX_FORMS);

    let timeline: Vec<TimelinePoint> = timeline_counts
        .into_iter()
        .map(|(order, count)| {
            let surah_no = metadata.surah_for_order(order).unwrap_or(0);
            let surah = if surah_no == 0 {
                format!("Surah {}", order)
            } else {
                metadata.name(surah_no)
            };
            TimelinePoint {
                order,
                surah_no,
                surah,
                count,
            }
        })
        .collect();

    let mut accompanying: Vec<(String, u64)> = accomp_order
        .into_iter()
        .map(|root| {
            let count = accomp_counts[&root];
            (root, count)
        })
        .collect();
    accompanying.sort_by(|a, b| b.1.cmp(&a.1));
    accompanying.truncate(NETWORK_ROOTS);

    let mut nodes = vec![NetworkNode {
        id: target.to_string(),
        group: 1,
        radius: 20.0 + total_occurrences as f64 / 5.0,
    }];
    for (root, count) in &accompanying {
        nodes.push(NetworkNode {
            id: root.clone(),
            group: 2,
            radius: 10.0 + *count as f64 / 2.0,
        });
    }
    let links: Vec<NetworkLink> = accompanying
        .iter()
        .map(|(root, count)| NetworkLink {
            source: target.to_string(),
            target: root.clone(),
            value: *count,
        })
        .collect();

    let matrix = build_matrix(result, target, &accompanying);

    let total_ayahs = result.verses.len();
    let average = if total_ayahs > 0 {
        format!("{:.2}", total_occurrences as f64 / total_ayahs as f64)
    } else {
        "0.00".to_string()
    };

    Some(Statistics {
        total_occurrences,
        total_ayahs,
        unique_surahs: surah_distribution.len(),
        surah_distribution,
        top_accompanying_roots: accompanying,
        juz_distribution,
        page_distribution,
        average_occurrences_per_ayah: average,
        forms,
        timeline,
        era,
        network: Network { nodes, links },
        matrix,
    })
}

/// Ordered-pair matrix over the target plus its top co-occurring roots.
/// Diagonal cells count the result-verses containing the root; off-diagonal
/// cells intersect the two roots' verse-id sets, restricted to this result
/// set. Symmetric off the diagonal by construction.
fn build_matrix(
    result: &SearchResult,
    target: &str,
    accompanying: &[(String, u64)],
) -> Vec<MatrixCell> {
    let mut matrix_roots: Vec<&str> = Vec::with_capacity(1 + MATRIX_ROOTS);
    matrix_roots.push(target);
    matrix_roots.extend(
        accompanying
            .iter()
            .take(MATRIX_ROOTS)
            .map(|(root, _)| root.as_str()),
    );

    let mut verse_sets: HashMap<&str, HashSet<u32>> =
        matrix_roots.iter().map(|root| (*root, HashSet::new())).collect();

    for verse in &result.verses {
        verse_sets.entry(target).or_default().insert(verse.id);
        for other in &verse.other_roots {
            if let Some(set) = verse_sets.get_mut(other.trim()) {
                set.insert(verse.id);
            }
        }
    }

    let mut matrix = Vec::with_capacity(matrix_roots.len() * matrix_roots.len());
    for a in &matrix_roots {
        for b in &matrix_roots {
            let value = if a == b {
                verse_sets[a].len() as u64
            } else {
                verse_sets[a].intersection(&verse_sets[b]).count() as u64
            };
            matrix.push(MatrixCell {
                x: a.to_string(),
                y: b.to_string(),
                value,
            });
        }
    }
    matrix
}

// ===== Global corpus statistics (corpus-wide, not per-root) =====

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RootFrequency {
    pub root: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LengthBucket {
    pub length: usize,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurahRootCount {
    pub surah_no: u32,
    pub distinct_roots: u64,
}

/// Corpus-wide snapshot. Root filtering uses stripped length >= 3
/// throughout, matching the per-root engine rule.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStatistics {
    pub total_ayahs: u64,
    pub total_surahs: u64,
    pub total_roots: u64,
    pub total_words: u64,
    pub top_roots: Vec<RootFrequency>,
    pub hapax_roots: Vec<RootFrequency>,
    pub root_length: Vec<LengthBucket>,
    pub roots_per_surah: Vec<SurahRootCount>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LengthSummary {
    pub total_occurrences: u64,
    pub total_roots: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RootsByLength {
    pub roots: Vec<RootFrequency>,
    pub summary: LengthSummary,
}
