use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::{DatasetStreams, Role, Timestamp, Timestamped};

/// The time span every aligned stream lies within.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWindow {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl AnalysisWindow {
    pub fn contains(&self, ts: Timestamp) -> bool {
        self.start <= ts && ts <= self.end
    }

    pub fn duration_secs(&self) -> f64 {
        crate::timeline::seconds_between(self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlap {
    /// No stream had any data.
    NoData,
    /// The streams do not share any instant; every stream is now empty.
    Empty,
    Window(AnalysisWindow),
}

impl Overlap {
    pub fn window(&self) -> Option<AnalysisWindow> {
        match self {
            Overlap::Window(window) => Some(*window),
            _ => None,
        }
    }
}

/// Intersection of the time ranges of every non-empty stream.
pub fn overlap(streams: &DatasetStreams) -> Overlap {
    let ranges = streams.ranges();
    let Some(start) = ranges.iter().map(|(lo, _)| *lo).max() else {
        return Overlap::NoData;
    };
    let Some(end) = ranges.iter().map(|(_, hi)| *hi).min() else {
        return Overlap::NoData;
    };
    if start > end {
        Overlap::Empty
    } else {
        Overlap::Window(AnalysisWindow { start, end })
    }
}

/// Trims every stream to the intersection of all non-empty streams' ranges.
///
/// When the ranges share no instant every stream is emptied and
/// [`Overlap::Empty`] is returned.
pub fn align(mut streams: DatasetStreams) -> (DatasetStreams, Overlap) {
    let outcome = overlap(&streams);
    match outcome {
        Overlap::NoData => debug!("no stream has data; skipping alignment"),
        Overlap::Empty => {
            warn!("stream time ranges do not intersect; nothing left to analyze");
            streams = DatasetStreams::default();
        }
        Overlap::Window(window) => {
            let removed = apply_window(&mut streams, &window);
            info!(
                "analysis window {} .. {} ({:.1} s), {removed} points outside dropped",
                window.start,
                window.end,
                window.duration_secs()
            );
        }
    }
    (streams, outcome)
}

/// Drops every point outside `window`, returning how many were removed.
pub fn apply_window(streams: &mut DatasetStreams, window: &AnalysisWindow) -> usize {
    let before = streams.total_points();
    retain(&mut streams.udp_sender, window);
    retain(&mut streams.udp_receiver, window);
    for role in Role::ALL {
        retain(streams.nexfi.get_mut(role), window);
        retain(streams.gps.get_mut(role), window);
    }
    before - streams.total_points()
}

fn retain<T: Timestamped>(points: &mut Vec<T>, window: &AnalysisWindow) {
    points.retain(|point| window.contains(point.timestamp()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GpsFix, NexfiStatus, UdpSend};
    use chrono::{FixedOffset, TimeZone};

    fn at(secs: i64) -> Timestamp {
        FixedOffset::east_opt(8 * 3600).unwrap().timestamp_opt(secs, 0).unwrap()
    }

    fn sends(times: &[i64]) -> Vec<UdpSend> {
        times
            .iter()
            .enumerate()
            .map(|(seq, &t)| UdpSend {
                timestamp: at(t),
                seq_num: seq as i64,
                packet_size: 1000,
            })
            .collect()
    }

    fn fixes(times: &[i64]) -> Vec<GpsFix> {
        times
            .iter()
            .map(|&t| GpsFix {
                timestamp: at(t),
                latitude: 30.0,
                longitude: 120.0,
                altitude: 50.0,
                local_x: 0.0,
                local_y: 0.0,
                local_z: 0.0,
            })
            .collect()
    }

    fn status(times: &[i64]) -> Vec<NexfiStatus> {
        times
            .iter()
            .map(|&t| NexfiStatus {
                timestamp: at(t),
                avg_rssi: -60.0,
                avg_snr: 25.0,
                throughput: 10.0,
                link_quality: 90.0,
            })
            .collect()
    }

    #[test]
    fn window_is_the_intersection() {
        let mut streams = DatasetStreams::default();
        streams.udp_sender = sends(&[0, 10, 20, 30, 40]);
        streams.gps.sender = fixes(&[5, 15, 25, 35]);
        streams.nexfi.receiver = status(&[10, 20, 30]);

        let (aligned, outcome) = align(streams);
        let window = outcome.window().unwrap();
        assert_eq!(window.start, at(10));
        assert_eq!(window.end, at(30));
        assert_eq!(aligned.udp_sender.len(), 3);
        assert_eq!(aligned.gps.sender.len(), 2);
        assert_eq!(aligned.nexfi.receiver.len(), 3);
        for (lo, hi) in aligned.ranges() {
            assert!(window.contains(lo) && window.contains(hi));
        }
    }

    #[test]
    fn reapplying_the_window_is_a_no_op() {
        let mut streams = DatasetStreams::default();
        streams.udp_sender = sends(&[0, 5, 10]);
        streams.gps.receiver = fixes(&[3, 10]);

        let (mut once, outcome) = align(streams);
        let window = outcome.window().unwrap();
        assert_eq!(once.udp_sender.len(), 2);
        assert_eq!(once.gps.receiver.len(), 2);

        let snapshot = once.clone();
        assert_eq!(apply_window(&mut once, &window), 0);
        assert_eq!(once, snapshot);
    }

    #[test]
    fn phase_shifted_streams_keep_their_samples() {
        let mut streams = DatasetStreams::default();
        streams.udp_sender = sends(&[0, 2, 4, 6, 8, 10]);
        streams.gps.sender = fixes(&[1, 3, 5, 7, 9, 11]);

        let (aligned, outcome) = align(streams);
        let window = outcome.window().unwrap();
        assert_eq!((window.start, window.end), (at(1), at(10)));
        assert_eq!(aligned.udp_sender.len(), 5);
        assert_eq!(aligned.gps.sender.len(), 5);
    }

    #[test]
    fn disjoint_ranges_empty_everything() {
        let mut streams = DatasetStreams::default();
        streams.udp_sender = sends(&[0, 1, 2]);
        streams.gps.sender = fixes(&[10, 11]);

        let (aligned, outcome) = align(streams);
        assert_eq!(outcome, Overlap::Empty);
        assert!(aligned.is_empty());
    }

    #[test]
    fn empty_input_is_left_alone() {
        let (aligned, outcome) = align(DatasetStreams::default());
        assert_eq!(outcome, Overlap::NoData);
        assert!(aligned.is_empty());
    }

    #[test]
    fn empty_streams_do_not_constrain_the_window() {
        let mut streams = DatasetStreams::default();
        streams.udp_sender = sends(&[0, 1, 2]);
        let (aligned, outcome) = align(streams);
        assert_eq!(aligned.udp_sender.len(), 3);
        assert_eq!(outcome.window().unwrap().end, at(2));
    }
}
