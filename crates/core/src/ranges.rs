//! Range-compressed sets of serial IDs.
//!
//! Proxies report which serial IDs they hold as a list of closed intervals
//! so the registry diff request stays small even with millions of modules.

use crate::coordinate::SerialId;
use crate::error::Error;
use serde::{Deserialize, Serialize};

/// A closed interval `[low, high]` of serial IDs. Serialized as a two
/// element array; `low > high` is rejected on the way in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "(SerialId, SerialId)", into = "(SerialId, SerialId)")]
pub struct RangeId {
    low: SerialId,
    high: SerialId,
}

impl RangeId {
    pub fn new(low: SerialId, high: SerialId) -> crate::Result<Self> {
        if low > high {
            return Err(Error::InvalidRange(format!("[{low}, {high}]")));
        }
        Ok(Self { low, high })
    }

    fn single(id: SerialId) -> Self {
        Self { low: id, high: id }
    }

    pub fn low(&self) -> SerialId {
        self.low
    }

    pub fn high(&self) -> SerialId {
        self.high
    }

    pub fn contains(&self, id: SerialId) -> bool {
        self.low <= id && id <= self.high
    }
}

impl TryFrom<(SerialId, SerialId)> for RangeId {
    type Error = Error;

    fn try_from((low, high): (SerialId, SerialId)) -> crate::Result<Self> {
        Self::new(low, high)
    }
}

impl From<RangeId> for (SerialId, SerialId) {
    fn from(range: RangeId) -> Self {
        (range.low, range.high)
    }
}

/// Ascending, non-overlapping, gap-separated intervals.
///
/// For any two adjacent ranges `[a, b]` and `[c, d]`, `c > b + 1`. Decoded
/// lists are brought back into this shape, so peers may send ranges in any
/// order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<RangeId>", into = "Vec<RangeId>")]
pub struct RangeIds(Vec<RangeId>);

impl RangeIds {
    /// Build the canonical range list from an arbitrary set of IDs.
    pub fn compress(ids: impl IntoIterator<Item = SerialId>) -> Self {
        let mut ids: Vec<SerialId> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();

        let mut ranges: Vec<RangeId> = Vec::new();
        for id in ids {
            match ranges.last_mut() {
                Some(last) if last.high.checked_add(1) == Some(id) => last.high = id,
                _ => ranges.push(RangeId::single(id)),
            }
        }
        Self(ranges)
    }

    /// Canonicalize arbitrary ranges: sort by start, then merge overlapping
    /// and touching neighbours.
    pub fn from_ranges(mut ranges: Vec<RangeId>) -> Self {
        ranges.sort_unstable_by_key(|r| (r.low, r.high));

        let mut merged: Vec<RangeId> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if range.low <= last.high.saturating_add(1) => {
                    last.high = last.high.max(range.high);
                }
                _ => merged.push(range),
            }
        }
        Self(merged)
    }

    /// Whether `id` falls inside any range.
    pub fn contains(&self, id: SerialId) -> bool {
        let idx = self.0.partition_point(|r| r.high < id);
        self.0.get(idx).is_some_and(|r| r.contains(id))
    }

    /// Iterate every ID covered by the ranges, ascending.
    pub fn expand(&self) -> impl Iterator<Item = SerialId> + '_ {
        self.0.iter().flat_map(|r| r.low..=r.high)
    }

    pub fn ranges(&self) -> &[RangeId] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of IDs covered, not the number of ranges.
    pub fn count(&self) -> u64 {
        self.0.iter().map(|r| r.high.abs_diff(r.low) + 1).sum()
    }
}

impl From<Vec<RangeId>> for RangeIds {
    fn from(ranges: Vec<RangeId>) -> Self {
        Self::from_ranges(ranges)
    }
}

impl From<RangeIds> for Vec<RangeId> {
    fn from(ids: RangeIds) -> Self {
        ids.0
    }
}

impl FromIterator<SerialId> for RangeIds {
    fn from_iter<T: IntoIterator<Item = SerialId>>(iter: T) -> Self {
        Self::compress(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn range(low: SerialId, high: SerialId) -> RangeId {
        RangeId::new(low, high).unwrap()
    }

    #[test]
    fn test_compress_runs() {
        let ranges = RangeIds::compress([1, 2, 3, 4, 5, 10, 11, 12, 20]);
        assert_eq!(
            ranges.ranges(),
            &[range(1, 5), range(10, 12), range(20, 20)]
        );
        assert_eq!(ranges.count(), 9);
    }

    #[test]
    fn test_compress_unsorted_with_duplicates() {
        let ranges = RangeIds::compress([7, 3, 4, 3, 8, 1]);
        assert_eq!(
            ranges.ranges(),
            &[range(1, 1), range(3, 4), range(7, 8)]
        );
    }

    #[test]
    fn test_compress_empty() {
        let ranges = RangeIds::compress(Vec::new());
        assert!(ranges.is_empty());
        assert!(!ranges.contains(0));
    }

    #[test]
    fn test_contains() {
        let ranges = RangeIds::compress([1, 2, 3, 10, 20, 21]);
        for id in [1, 2, 3, 10, 20, 21] {
            assert!(ranges.contains(id), "{id} should be contained");
        }
        for id in [0, 4, 9, 11, 19, 22] {
            assert!(!ranges.contains(id), "{id} should not be contained");
        }
    }

    #[test]
    fn test_wire_format() {
        let ranges = RangeIds::compress([1, 2, 3, 7]);
        let json = serde_json::to_string(&ranges).unwrap();
        assert_eq!(json, "[[1,3],[7,7]]");

        let decoded: RangeIds = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, ranges);
    }

    #[test]
    fn test_decode_unsorted_ranges() {
        let held: RangeIds = serde_json::from_str("[[10,12],[1,5]]").unwrap();
        assert!(held.contains(3));
        assert!(held.contains(11));
        assert!(!held.contains(7));
        assert_eq!(held.ranges(), &[range(1, 5), range(10, 12)]);
    }

    #[test]
    fn test_decode_merges_overlapping_and_touching() {
        let held: RangeIds =
            serde_json::from_str("[[4,9],[1,5],[10,10],[20,20],[20,21]]").unwrap();
        assert_eq!(held.ranges(), &[range(1, 10), range(20, 21)]);
        assert_eq!(held.count(), 12);
    }

    #[test]
    fn test_decode_rejects_inverted_range() {
        assert!(serde_json::from_str::<RangeIds>("[[5,1]]").is_err());
        assert!(RangeId::new(5, 1).is_err());
        assert!(RangeId::new(3, 3).is_ok());
    }

    proptest! {
        #[test]
        fn prop_compress_covers_exactly_the_input(ids in proptest::collection::vec(0i64..500, 0..200)) {
            let ranges = RangeIds::compress(ids.iter().copied());
            let expected: BTreeSet<SerialId> = ids.into_iter().collect();
            let expanded: Vec<SerialId> = ranges.expand().collect();
            prop_assert_eq!(expanded, expected.into_iter().collect::<Vec<_>>());
        }

        #[test]
        fn prop_shuffled_ranges_canonicalize(ids in proptest::collection::vec(0i64..500, 0..200)) {
            let canonical = RangeIds::compress(ids);
            let mut reversed = canonical.ranges().to_vec();
            reversed.reverse();
            prop_assert_eq!(RangeIds::from_ranges(reversed), canonical);
        }

        #[test]
        fn prop_ranges_are_gap_separated(ids in proptest::collection::vec(-50i64..500, 0..200)) {
            let ranges = RangeIds::compress(ids);
            for r in ranges.ranges() {
                prop_assert!(r.low() <= r.high());
            }
            for pair in ranges.ranges().windows(2) {
                prop_assert!(pair[1].low() > pair[0].high() + 1);
            }
        }
    }
}
