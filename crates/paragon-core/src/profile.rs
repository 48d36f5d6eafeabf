//! Author, publication, and source value types
//!
//! Counts "as of a year" are always derived from the publication list rather
//! than cached as standalone scalars, so a refreshed profile can never
//! disagree with its own counts.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::discipline::{discipline_of, FieldCode};

pub type AuthorId = u64;
pub type SourceId = u64;
pub type AffiliationId = u64;

/// Document type codes as used by the upstream index.
///
/// Only research types count toward publication and citation tallies;
/// letters, editorials, errata and retraction notices never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    #[serde(rename = "ar")]
    Article,
    #[serde(rename = "bk")]
    Book,
    #[serde(rename = "ch")]
    Chapter,
    #[serde(rename = "cp")]
    ConferencePaper,
    #[serde(rename = "cr")]
    ConferenceReview,
    #[serde(rename = "no")]
    Note,
    #[serde(rename = "re")]
    Review,
    #[serde(rename = "sh")]
    ShortSurvey,
    #[serde(rename = "le")]
    Letter,
    #[serde(rename = "ed")]
    Editorial,
    #[serde(rename = "er")]
    Erratum,
    #[serde(rename = "tb")]
    Retracted,
    #[serde(other, rename = "xx")]
    Other,
}

impl DocumentType {
    pub fn from_code(code: &str) -> Self {
        match code {
            "ar" => Self::Article,
            "bk" => Self::Book,
            "ch" => Self::Chapter,
            "cp" => Self::ConferencePaper,
            "cr" => Self::ConferenceReview,
            "no" => Self::Note,
            "re" => Self::Review,
            "sh" => Self::ShortSurvey,
            "le" => Self::Letter,
            "ed" => Self::Editorial,
            "er" => Self::Erratum,
            "tb" => Self::Retracted,
            _ => Self::Other,
        }
    }

    pub fn is_research(self) -> bool {
        matches!(
            self,
            Self::Article
                | Self::Book
                | Self::Chapter
                | Self::ConferencePaper
                | Self::ConferenceReview
                | Self::Note
                | Self::Review
                | Self::ShortSurvey
        )
    }
}

/// A single indexed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Publication {
    pub id: u64,
    pub year: u16,
    pub source_id: SourceId,
    pub doc_type: DocumentType,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub author_ids: Vec<AuthorId>,
    #[serde(default)]
    pub affiliation_ids: Vec<AffiliationId>,
    #[serde(default)]
    pub cited_refs: Vec<u64>,
}

/// Source kind from the static reference table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Journal,
    ConferenceProceedings,
    Book,
    BookSeries,
    TradeJournal,
}

/// Immutable reference data about a publication venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: SourceId,
    pub title: String,
    pub source_type: SourceType,
    pub fields: Vec<FieldCode>,
}

/// Snapshot of an author as returned by the search API.
///
/// `indexed_documents` is the upstream index's total document count (all
/// types, all years) and is only used as a cheap pre-filter; every precise
/// count is derived from `publications`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorProfile {
    pub id: AuthorId,
    pub first_year: u16,
    pub main_field: FieldCode,
    #[serde(default)]
    pub fields: Vec<FieldCode>,
    #[serde(default)]
    pub indexed_documents: u32,
    #[serde(default)]
    pub publications: Vec<Publication>,
}

impl AuthorProfile {
    /// Two-digit discipline of the main field.
    pub fn primary_discipline(&self) -> u16 {
        discipline_of(self.main_field)
    }

    /// Research publications up to and including `year`.
    pub fn research_publications(&self, up_to: u16) -> impl Iterator<Item = &Publication> {
        self.publications
            .iter()
            .filter(move |p| p.doc_type.is_research() && p.year <= up_to)
    }

    /// Number of research publications as of `up_to`.
    pub fn publication_count(&self, up_to: u16) -> u32 {
        self.research_publications(up_to).count() as u32
    }

    /// Distinct co-authors on research publications as of `up_to`,
    /// excluding the author themselves.
    pub fn coauthors(&self, up_to: u16) -> FxHashSet<AuthorId> {
        let mut set: FxHashSet<AuthorId> = self
            .research_publications(up_to)
            .flat_map(|p| p.author_ids.iter().copied())
            .collect();
        set.remove(&self.id);
        set
    }

    /// Affiliation listed on the most recent research publication as of
    /// `up_to` that carries one.
    pub fn latest_affiliation(&self, up_to: u16) -> Option<AffiliationId> {
        self.research_publications(up_to)
            .filter(|p| !p.affiliation_ids.is_empty())
            .max_by_key(|p| p.year)
            .and_then(|p| p.affiliation_ids.first().copied())
    }

    /// Distinct source IDs the author published in as of `up_to`.
    pub fn source_ids(&self, up_to: u16) -> FxHashSet<SourceId> {
        self.research_publications(up_to)
            .map(|p| p.source_id)
            .collect()
    }

    // Overrides produce new values; profiles are never mutated in place
    // once constructed (manual corrections, e.g. a mis-indexed main field,
    // go through these).

    pub fn with_main_field(mut self, field: FieldCode) -> Self {
        self.main_field = field;
        self
    }

    pub fn with_first_year(mut self, year: u16) -> Self {
        self.first_year = year;
        self
    }

    pub fn with_fields(mut self, fields: Vec<FieldCode>) -> Self {
        self.fields = fields;
        self
    }
}

/// A candidate that survived every active filter stage.
///
/// Immutable once produced; comparison fields are snapshotted at pipeline
/// time so the result can be reported without re-deriving anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: AuthorId,
    pub first_year: u16,
    pub publications: u32,
    pub coauthors: u32,
    /// `None` when the citation stage was not configured.
    pub citations: Option<u64>,
    pub same_discipline: bool,
    pub affiliation: Option<AffiliationId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pub_(id: u64, year: u16, doc_type: DocumentType, authors: &[AuthorId]) -> Publication {
        Publication {
            id,
            year,
            source_id: 100,
            doc_type,
            language: None,
            author_ids: authors.to_vec(),
            affiliation_ids: vec![],
            cited_refs: vec![],
        }
    }

    fn profile() -> AuthorProfile {
        AuthorProfile {
            id: 1,
            first_year: 2010,
            main_field: 2002,
            fields: vec![2002, 2003],
            indexed_documents: 4,
            publications: vec![
                pub_(10, 2010, DocumentType::Article, &[1, 2]),
                pub_(11, 2012, DocumentType::Article, &[1, 2, 3]),
                pub_(12, 2014, DocumentType::Letter, &[1, 4]),
                pub_(13, 2016, DocumentType::Review, &[1, 5]),
            ],
        }
    }

    #[test]
    fn counts_only_research_types() {
        let p = profile();
        // the 2014 letter never counts
        assert_eq!(p.publication_count(2020), 3);
        assert_eq!(p.publication_count(2012), 2);
        assert_eq!(p.publication_count(2009), 0);
    }

    #[test]
    fn coauthors_exclude_self_and_non_research() {
        let p = profile();
        let set = p.coauthors(2020);
        assert!(!set.contains(&1));
        assert!(!set.contains(&4), "letter co-author must not count");
        assert_eq!(set.len(), 3); // 2, 3, 5
    }

    #[test]
    fn coauthors_respect_cutoff() {
        let p = profile();
        let set = p.coauthors(2012);
        assert_eq!(set.len(), 2); // 2, 3
    }

    #[test]
    fn latest_affiliation_prefers_recent() {
        let mut p = profile();
        p.publications[0].affiliation_ids = vec![900];
        p.publications[3].affiliation_ids = vec![901];
        assert_eq!(p.latest_affiliation(2020), Some(901));
        assert_eq!(p.latest_affiliation(2012), Some(900));
        assert_eq!(p.latest_affiliation(2009), None);
    }

    #[test]
    fn overrides_build_new_values() {
        let p = profile().with_main_field(1701).with_first_year(2008);
        assert_eq!(p.primary_discipline(), 17);
        assert_eq!(p.first_year, 2008);
    }

    #[test]
    fn doc_type_codes_round_trip() {
        for code in ["ar", "bk", "ch", "cp", "cr", "no", "re", "sh"] {
            assert!(DocumentType::from_code(code).is_research(), "{code}");
        }
        for code in ["le", "ed", "er", "tb", "??"] {
            assert!(!DocumentType::from_code(code).is_research(), "{code}");
        }
    }
}
