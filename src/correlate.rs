use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::geodesy::DistanceSummary;
use crate::models::{NexfiStatus, PerRole, Role, Timestamp, UdpReceive};
use crate::stats;
use crate::timeline::{TimeIndex, Tolerance};

pub const DELAY_DISTANCE: &str = "delay_distance";

pub const DELAY_TOLERANCE: Tolerance = Tolerance::Below(5.0);
pub const RSSI_TOLERANCE: Tolerance = Tolerance::Below(10.0);
pub const MIN_DELAY_PAIRS: usize = 10;
pub const MIN_RSSI_PAIRS: usize = 5;
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

pub fn rssi_distance_key(role: Role) -> String {
    format!("rssi_distance_{role}")
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationEntry {
    pub correlation: f64,
    pub p_value: f64,
    pub significant: bool,
    pub sample_size: usize,
}

pub type Correlations = BTreeMap<String, CorrelationEntry>;

/// Distance series with a time index, joined against each metric stream.
pub struct DistanceJoin<'a> {
    distances: &'a DistanceSummary,
    index: TimeIndex,
}

impl<'a> DistanceJoin<'a> {
    pub fn new(distances: &'a DistanceSummary) -> Self {
        Self {
            index: TimeIndex::new(distances.timestamps()),
            distances,
        }
    }

    /// `(distance_3d, value)` pairs for every observation whose nearest distance
    /// sample lies within `tolerance`.
    pub fn pairs<I>(&self, observations: I, tolerance: Tolerance) -> (Vec<f64>, Vec<f64>)
    where
        I: IntoIterator<Item = (Timestamp, f64)>,
    {
        observations
            .into_iter()
            .filter_map(|(ts, value)| {
                self.index
                    .nearest_within(ts, tolerance)
                    .map(|found| (self.distances.samples[found.index].distance_3d_m, value))
            })
            .unzip()
    }
}

/// Pearson entry for the pairs, or `None` when fewer than `min_pairs` matched
/// or r is undefined.
pub fn correlation_entry(
    distance: &[f64],
    metric: &[f64],
    min_pairs: usize,
) -> Option<CorrelationEntry> {
    if distance.len() < min_pairs {
        return None;
    }
    let result = stats::pearson(distance, metric)?;
    Some(CorrelationEntry {
        correlation: result.r,
        p_value: result.p_value,
        significant: result.p_value < SIGNIFICANCE_LEVEL,
        sample_size: result.n,
    })
}

/// Correlates UDP delay and per-role RSSI against inter-drone distance.
pub fn correlate(
    distances: &DistanceSummary,
    udp_receiver: &[UdpReceive],
    nexfi: &PerRole<Vec<NexfiStatus>>,
) -> Correlations {
    let join = DistanceJoin::new(distances);
    let mut correlations = Correlations::new();

    let (distance, delay_ms) = join.pairs(
        udp_receiver
            .iter()
            .map(|p| (p.recv_timestamp, p.delay * 1000.0)),
        DELAY_TOLERANCE,
    );
    record(&mut correlations, DELAY_DISTANCE.to_string(), &distance, &delay_ms, MIN_DELAY_PAIRS);

    for role in Role::ALL {
        let (distance, rssi) = join.pairs(
            nexfi.get(role).iter().map(|s| (s.timestamp, s.avg_rssi)),
            RSSI_TOLERANCE,
        );
        record(&mut correlations, rssi_distance_key(role), &distance, &rssi, MIN_RSSI_PAIRS);
    }

    correlations
}

fn record(
    correlations: &mut Correlations,
    key: String,
    distance: &[f64],
    metric: &[f64],
    min_pairs: usize,
) {
    match correlation_entry(distance, metric, min_pairs) {
        Some(entry) => {
            info!(
                "{key}: r={:.3}, p={:.3} ({}) over {} pairs",
                entry.correlation,
                entry.p_value,
                if entry.significant { "significant" } else { "not significant" },
                entry.sample_size
            );
            correlations.insert(key, entry);
        }
        None => debug!("{key}: {} matched pairs, not reported", distance.len()),
    }
}
