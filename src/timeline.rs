use crate::models::Timestamp;

/// Signed seconds from `from` to `to`.
pub fn seconds_between(from: Timestamp, to: Timestamp) -> f64 {
    let delta = to.signed_duration_since(from);
    match delta.num_nanoseconds() {
        Some(nanos) => nanos as f64 / 1e9,
        None => delta.num_milliseconds() as f64 / 1e3,
    }
}

/// Acceptance rule for a nearest-neighbour match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tolerance {
    /// `|dt| <= seconds`
    AtMost(f64),
    /// `|dt| < seconds`
    Below(f64),
}

impl Tolerance {
    pub fn accepts(self, gap_secs: f64) -> bool {
        match self {
            Tolerance::AtMost(limit) => gap_secs <= limit,
            Tolerance::Below(limit) => gap_secs < limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest {
    /// Position in the sequence the index was built from.
    pub index: usize,
    /// Absolute time difference in seconds.
    pub gap_secs: f64,
}

/// Sorted view over a timestamp sequence for nearest-neighbour lookups.
///
/// Lookups are `O(log n)`. When two samples are equally close the one that
/// appears first in the original sequence wins, so results match a linear
/// scan that keeps the first minimum.
#[derive(Debug, Clone)]
pub struct TimeIndex {
    entries: Vec<(Timestamp, usize)>,
}

impl TimeIndex {
    pub fn new<I>(timestamps: I) -> Self
    where
        I: IntoIterator<Item = Timestamp>,
    {
        let mut entries: Vec<(Timestamp, usize)> = timestamps
            .into_iter()
            .enumerate()
            .map(|(index, ts)| (ts, index))
            .collect();
        entries.sort();
        Self { entries }
    }

    pub fn nearest(&self, target: Timestamp) -> Option<Nearest> {
        let split = self.entries.partition_point(|(ts, _)| *ts < target);

        let after = self.entries.get(split).map(|&(ts, index)| Nearest {
            index,
            gap_secs: seconds_between(target, ts),
        });
        let before = split.checked_sub(1).map(|prev| {
            // first of any run of equal timestamps
            let ts = self.entries[prev].0;
            let first = self.entries.partition_point(|(t, _)| *t < ts);
            Nearest {
                index: self.entries[first].1,
                gap_secs: seconds_between(ts, target),
            }
        });

        match (before, after) {
            (Some(b), Some(a)) => {
                if b.gap_secs < a.gap_secs || (b.gap_secs == a.gap_secs && b.index < a.index) {
                    Some(b)
                } else {
                    Some(a)
                }
            }
            (b, a) => b.or(a),
        }
    }

    pub fn nearest_within(&self, target: Timestamp, tolerance: Tolerance) -> Option<Nearest> {
        self.nearest(target)
            .filter(|found| tolerance.accepts(found.gap_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn at(millis: i64) -> Timestamp {
        FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .timestamp_millis_opt(millis)
            .unwrap()
    }

    fn linear_nearest(times: &[Timestamp], target: Timestamp) -> Option<Nearest> {
        let mut best: Option<Nearest> = None;
        for (index, ts) in times.iter().enumerate() {
            let gap_secs = seconds_between(*ts, target).abs();
            if best.map_or(true, |b| gap_secs < b.gap_secs) {
                best = Some(Nearest { index, gap_secs });
            }
        }
        best
    }

    #[test]
    fn finds_closest_on_either_side() {
        let index = TimeIndex::new([at(0), at(1_000), at(2_000)]);
        assert_eq!(index.nearest(at(1_400)).unwrap().index, 1);
        assert_eq!(index.nearest(at(1_600)).unwrap().index, 2);
        assert_eq!(index.nearest(at(-5_000)).unwrap().index, 0);
        assert_eq!(index.nearest(at(9_000)).unwrap().index, 2);
        assert!((index.nearest(at(9_000)).unwrap().gap_secs - 7.0).abs() < 1e-9);
    }

    #[test]
    fn ties_prefer_the_earlier_sample() {
        let index = TimeIndex::new([at(0), at(1_000)]);
        assert_eq!(index.nearest(at(500)).unwrap().index, 0);

        let duplicates = TimeIndex::new([at(0), at(1_000), at(1_000)]);
        assert_eq!(duplicates.nearest(at(1_200)).unwrap().index, 1);
    }

    #[test]
    fn agrees_with_linear_scan() {
        let times: Vec<Timestamp> = [0, 130, 130, 420, 1_000, 1_010, 2_500, 2_750]
            .into_iter()
            .map(at)
            .collect();
        let index = TimeIndex::new(times.clone());
        for target in (-200..3_000).step_by(15) {
            let fast = index.nearest(at(target)).unwrap();
            let slow = linear_nearest(&times, at(target)).unwrap();
            assert_eq!(fast.index, slow.index, "target {target}");
            assert!((fast.gap_secs - slow.gap_secs).abs() < 1e-12);
        }
    }

    #[test]
    fn unsorted_input_reports_original_positions() {
        let index = TimeIndex::new([at(2_000), at(0), at(1_000)]);
        assert_eq!(index.nearest(at(100)).unwrap().index, 1);
        assert_eq!(index.nearest(at(1_900)).unwrap().index, 0);
    }

    #[test]
    fn tolerance_bounds() {
        let index = TimeIndex::new([at(0)]);
        assert!(index.nearest_within(at(1_000), Tolerance::AtMost(1.0)).is_some());
        assert!(index.nearest_within(at(1_000), Tolerance::Below(1.0)).is_none());
        assert!(TimeIndex::new(Vec::new()).nearest(at(0)).is_none());
    }
}
