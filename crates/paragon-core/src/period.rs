//! Year-range chunking for the publication-regularity test
//!
//! Candidates must publish in the search sources at least once in *every*
//! chunk, so chunk boundaries decide how strict the regularity test is.
//! Undersized trailing chunks are merged backward to avoid a spuriously
//! lenient final window.

use std::ops::RangeInclusive;

/// A contiguous, inclusive span of years.
pub type YearRange = RangeInclusive<u16>;

/// Split `years` into consecutive chunks of `target` years each, walking
/// forward from the start. A trailing remainder of at most half the target
/// is merged into the previous chunk instead of standing alone.
pub fn chunk_years(years: YearRange, target: u16) -> Vec<YearRange> {
    assert!(target > 0, "chunk target must be positive");
    let (start, end) = (*years.start(), *years.end());
    if start > end {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut lo = start;
    while lo <= end {
        let hi = end.min(lo + target - 1);
        chunks.push(lo..=hi);
        if hi == end {
            break;
        }
        lo = hi + 1;
    }

    if chunks.len() >= 2 {
        let last_len = range_len(chunks.last().expect("non-empty"));
        if 2 * last_len <= u32::from(target) {
            let last = chunks.pop().expect("non-empty");
            let prev = chunks.pop().expect("len >= 2");
            chunks.push(*prev.start()..=*last.end());
        }
    }
    chunks
}

/// Chunk the window over which a candidate must publish regularly.
///
/// The first chunk spans `[first_year - lead_in, first_year]`, absorbing the
/// margin window around the true first-publication year (it may exceed the
/// target length). Remaining years `(first_year, end]` are chunked by
/// [`chunk_years`].
///
/// `lead_in` must not exceed `target`: a wider lead-in than the chunk size
/// would let candidates skip more years at the start than anywhere else.
pub fn chunk_periods(
    first_year: u16,
    end: u16,
    target: u16,
    lead_in: u16,
) -> Result<Vec<YearRange>, ChunkError> {
    if lead_in > target {
        return Err(ChunkError::LeadInExceedsTarget { lead_in, target });
    }
    if first_year > end {
        return Err(ChunkError::EmptySpan { first_year, end });
    }

    let mut chunks = vec![first_year.saturating_sub(lead_in)..=first_year];
    if first_year < end {
        chunks.extend(chunk_years(first_year + 1..=end, target));
    }
    Ok(chunks)
}

fn range_len(r: &YearRange) -> u32 {
    u32::from(*r.end()) - u32::from(*r.start()) + 1
}

#[derive(Debug, PartialEq, Eq)]
pub enum ChunkError {
    LeadInExceedsTarget { lead_in: u16, target: u16 },
    EmptySpan { first_year: u16, end: u16 },
}

impl std::fmt::Display for ChunkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LeadInExceedsTarget { lead_in, target } => write!(
                f,
                "lead-in of {lead_in} years exceeds the chunk size of {target}"
            ),
            Self::EmptySpan { first_year, end } => {
                write!(f, "first year {first_year} lies after the end year {end}")
            }
        }
    }
}

impl std::error::Error for ChunkError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(chunks: &[YearRange]) -> Vec<Vec<u16>> {
        chunks.iter().map(|c| c.clone().collect()).collect()
    }

    #[test]
    fn exact_multiple() {
        let chunks = chunk_years(1999..=2007, 3);
        assert_eq!(
            flat(&chunks),
            vec![
                vec![1999, 2000, 2001],
                vec![2002, 2003, 2004],
                vec![2005, 2006, 2007]
            ]
        );
    }

    #[test]
    fn large_remainder_stands_alone() {
        let chunks = chunk_years(1999..=2006, 3);
        assert_eq!(
            flat(&chunks),
            vec![
                vec![1999, 2000, 2001],
                vec![2002, 2003, 2004],
                vec![2005, 2006]
            ]
        );
    }

    #[test]
    fn small_remainder_merges_backward() {
        let chunks = chunk_years(1999..=2005, 3);
        assert_eq!(
            flat(&chunks),
            vec![vec![1999, 2000, 2001], vec![2002, 2003, 2004, 2005]]
        );
    }

    #[test]
    fn single_chunk_shorter_than_target() {
        let chunks = chunk_years(2003..=2004, 5);
        assert_eq!(flat(&chunks), vec![vec![2003, 2004]]);
    }

    #[test]
    fn chunks_partition_the_span() {
        for (start, end, target) in [(1990u16, 2020u16, 4u16), (2000, 2001, 2), (1999, 2005, 3)] {
            let chunks = chunk_years(start..=end, target);
            let all: Vec<u16> = chunks.iter().flat_map(|c| c.clone()).collect();
            let expected: Vec<u16> = (start..=end).collect();
            assert_eq!(all, expected, "({start}, {end}, {target})");
            // contiguous and disjoint
            for pair in chunks.windows(2) {
                assert_eq!(*pair[0].end() + 1, *pair[1].start());
            }
            // only first/last may deviate from the target
            if chunks.len() > 2 {
                for c in &chunks[1..chunks.len() - 1] {
                    assert_eq!(range_len(c), u32::from(target));
                }
            }
        }
    }

    #[test]
    fn periods_with_lead_in() {
        let chunks = chunk_periods(2012, 2017, 2, 2).unwrap();
        assert_eq!(
            flat(&chunks),
            vec![
                vec![2010, 2011, 2012],
                vec![2013, 2014],
                vec![2015, 2016, 2017]
            ]
        );
    }

    #[test]
    fn periods_lead_in_too_wide() {
        let err = chunk_periods(2012, 2017, 2, 3).unwrap_err();
        assert_eq!(
            err,
            ChunkError::LeadInExceedsTarget {
                lead_in: 3,
                target: 2
            }
        );
    }

    #[test]
    fn periods_match_year_equals_first_year() {
        let chunks = chunk_periods(2012, 2012, 2, 1).unwrap();
        assert_eq!(flat(&chunks), vec![vec![2011, 2012]]);
    }
}
