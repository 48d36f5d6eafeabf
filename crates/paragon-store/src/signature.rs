//! Deterministic query signatures
//!
//! A signature encodes the cached relation plus the canonical JSON of the
//! parameters that affect the result. Same logical query, same signature,
//! across runs and processes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hash;

/// Which cached relation a record belongs to.
///
/// One directory per relation, so unrelated lookups never collide and the
/// store can be inspected or cleared per relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// Author snapshots (light or full view; the view is in the params).
    Authors,
    /// Author IDs publishing in a source set during one year.
    SourceYear,
    /// Citation counts up to a year with an exclusion list.
    Citations,
    /// The static source reference table.
    SourceTable,
}

impl Relation {
    /// Directory name under the store base.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Authors => "authors",
            Self::SourceYear => "source_year",
            Self::Citations => "citations",
            Self::SourceTable => "source_table",
        }
    }

    pub fn all() -> [Relation; 4] {
        [
            Self::Authors,
            Self::SourceYear,
            Self::Citations,
            Self::SourceTable,
        ]
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Stable key for one cached lookup.
///
/// Vec-valued params must be sorted by the caller before signing; struct
/// field order (via serde) keeps the JSON canonical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySignature {
    pub relation: Relation,
    /// Canonical JSON of the content-affecting parameters.
    pub params_json: String,
}

impl QuerySignature {
    /// Compute the blake3 hash over relation and parameters.
    pub fn hash(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.relation.dir_name().as_bytes());
        hasher.update(b"\x00");
        hasher.update(self.params_json.as_bytes());
        hasher.finalize()
    }

    /// Short (16-char hex) key used as the record filename.
    pub fn key(&self) -> String {
        hash::short_hash(&self.hash())
    }
}

/// Build a signature from typed parameters.
pub fn make_signature<P: Serialize>(relation: Relation, params: &P) -> QuerySignature {
    let params_json =
        serde_json::to_string(params).expect("signature params serialization should never fail");
    QuerySignature {
        relation,
        params_json,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct AuthorParams {
        id: u64,
        view: &'static str,
    }

    #[test]
    fn signature_deterministic() {
        let p = AuthorParams {
            id: 55,
            view: "full",
        };
        let s1 = make_signature(Relation::Authors, &p);
        let s2 = make_signature(Relation::Authors, &p);
        assert_eq!(s1.key(), s2.key());
    }

    #[test]
    fn signature_changes_with_params() {
        let s1 = make_signature(
            Relation::Authors,
            &AuthorParams {
                id: 55,
                view: "full",
            },
        );
        let s2 = make_signature(
            Relation::Authors,
            &AuthorParams {
                id: 55,
                view: "light",
            },
        );
        assert_ne!(s1.key(), s2.key());
    }

    #[test]
    fn signature_changes_with_relation() {
        let p = AuthorParams {
            id: 55,
            view: "full",
        };
        let s1 = make_signature(Relation::Authors, &p);
        let s2 = make_signature(Relation::Citations, &p);
        assert_ne!(s1.key(), s2.key());
    }

    #[test]
    fn key_is_16_hex() {
        let s = make_signature(Relation::SourceYear, &(1u64, 2015u16));
        assert_eq!(s.key().len(), 16);
        assert!(s.key().chars().all(|c| c.is_ascii_hexdigit()));
    }
}
