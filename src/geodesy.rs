// Inter-drone distance from paired GPS fixes.
//
// Horizontal separation uses the haversine great-circle formula on a
// spherical Earth; vertical separation is the altitude difference.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::{GpsFix, Timestamp};
use crate::stats::MetricStats;
use crate::timeline::{TimeIndex, Tolerance};

/// Mean Earth radius for the spherical approximation, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A receiver fix further than this from the sender fix is not paired.
pub const GPS_PAIRING_TOLERANCE: Tolerance = Tolerance::AtMost(1.0);

/// Great-circle distance in meters between two lat/lon points in degrees.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceSample {
    /// Time of the sender fix.
    pub timestamp: Timestamp,
    pub horizontal_distance_m: f64,
    pub vertical_distance_m: f64,
    pub distance_3d_m: f64,
}

impl DistanceSample {
    pub fn between(sender: &GpsFix, receiver: &GpsFix) -> Self {
        let horizontal =
            haversine_m(sender.latitude, sender.longitude, receiver.latitude, receiver.longitude);
        let vertical = (receiver.altitude - sender.altitude).abs();
        Self {
            timestamp: sender.timestamp,
            horizontal_distance_m: horizontal,
            vertical_distance_m: vertical,
            distance_3d_m: horizontal.hypot(vertical),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceSummary {
    pub samples: Vec<DistanceSample>,
    /// Sender fixes that found a receiver fix within tolerance.
    pub matched: usize,
    /// Sender fixes dropped for lack of a close receiver fix.
    pub unmatched: usize,
    pub horizontal: MetricStats,
    pub vertical: MetricStats,
    pub distance_3d: MetricStats,
}

impl DistanceSummary {
    pub fn timestamps(&self) -> impl Iterator<Item = Timestamp> + '_ {
        self.samples.iter().map(|s| s.timestamp)
    }

    pub fn distances_3d(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.distance_3d_m).collect()
    }
}

/// Pairs every sender fix with the nearest receiver fix and measures their separation.
///
/// Sender fixes without a receiver fix within [`GPS_PAIRING_TOLERANCE`] are
/// dropped. Returns `None` when no pair could be formed.
pub fn inter_drone_distance(sender: &[GpsFix], receiver: &[GpsFix]) -> Option<DistanceSummary> {
    if sender.is_empty() || receiver.is_empty() {
        debug!("gps track missing for one drone; inter-drone distance unavailable");
        return None;
    }

    let index = TimeIndex::new(receiver.iter().map(|fix| fix.timestamp));
    let samples: Vec<DistanceSample> = sender
        .iter()
        .filter_map(|fix| {
            index
                .nearest_within(fix.timestamp, GPS_PAIRING_TOLERANCE)
                .map(|found| DistanceSample::between(fix, &receiver[found.index]))
        })
        .collect();

    let unmatched = sender.len() - samples.len();
    if samples.is_empty() {
        info!("no sender fix had a receiver fix within 1 s; inter-drone distance unavailable");
        return None;
    }

    let horizontal: Vec<f64> = samples.iter().map(|s| s.horizontal_distance_m).collect();
    let vertical: Vec<f64> = samples.iter().map(|s| s.vertical_distance_m).collect();
    let distance_3d: Vec<f64> = samples.iter().map(|s| s.distance_3d_m).collect();

    let summary = DistanceSummary {
        matched: samples.len(),
        unmatched,
        horizontal: MetricStats::population(&horizontal),
        vertical: MetricStats::population(&vertical),
        distance_3d: MetricStats::population(&distance_3d),
        samples,
    };
    info!(
        "inter-drone distance: {} pairs ({} dropped), mean {:.2} m, max {:.2} m",
        summary.matched, summary.unmatched, summary.distance_3d.mean, summary.distance_3d.max
    );
    Some(summary)
}
