//! Arabic text normalization: diacritic stripping for comparison

/// Remove tashkeel and elongation from Arabic text: tanwin, harakat, shadda,
/// sukun and the related combining marks (U+064B..U+065F), the superscript
/// alef (U+0670) and tatweel (U+0640). Orthography is otherwise preserved;
/// letter variants are NOT folded because the corpus stores exact spelling.
pub fn strip_marks(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '\u{064B}'..='\u{065F}' | '\u{0670}' | '\u{0640}'))
        .collect()
}

/// Letter count of `text` with marks stripped. Roots are measured with this
/// before the minimum-length cut for co-occurrence analysis.
pub fn letter_count(text: &str) -> usize {
    text.chars()
        .filter(|c| !matches!(c, '\u{064B}'..='\u{065F}' | '\u{0670}' | '\u{0640}'))
        .count()
}

/// SQL expression mirroring [`strip_marks`] for the stored `token` column.
/// The store exposes no custom functions, so comparisons replicate the nine
/// marks the corpus was annotated with inline.
pub const SQL_NORMALIZE_TOKEN: &str = "REPLACE(REPLACE(REPLACE(REPLACE(REPLACE(REPLACE(REPLACE(REPLACE(REPLACE(\
    token, 'ً', ''), 'ٌ', ''), 'ٍ', ''), 'َ', ''), 'ُ', ''), 'ِ', ''), 'ّ', ''), 'ْ', ''), 'ٰ', '')";
