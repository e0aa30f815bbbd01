//! Root search and corpus analytics over a pre-annotated Quran corpus.
//!
//! The corpus is read-only SQLite: an `ayah` table, a `token` table keyed by
//! the composite `"surah:ayah"` id, and a `token_uthmani` view that carries a
//! precomputed plain surface form. Everything here is request-scoped and
//! stateless apart from the startup-built suggestion index and metadata.

pub mod cache;
pub mod error;
pub mod metadata;
pub mod normalize;
pub mod search;
pub mod stats;
pub mod suggest;
pub mod tokens;

pub use error::JudhurError;
pub use search::SearchEngine;
