use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::{time_range, GpsFix, NexfiStatus, PerRole, Role, UdpReceive, UdpSend};
use crate::stats::{self, MetricStats};
use crate::timeline::seconds_between;

/// Delay distribution in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DelayStats {
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub p95: f64,
    pub p99: f64,
}

impl DelayStats {
    pub fn from_millis(delays_ms: &[f64]) -> Self {
        let spread = MetricStats::sample(delays_ms);
        Self {
            mean: spread.mean,
            median: stats::median(delays_ms),
            std: spread.std,
            min: spread.min,
            max: spread.max,
            p95: stats::percentile(delays_ms, 0.95),
            p99: stats::percentile(delays_ms, 0.99),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UdpSummary {
    pub total_sent: usize,
    pub total_received: usize,
    /// Percentage of sent packets never logged by the receiver.
    pub packet_loss_rate: f64,
    pub delay_stats: DelayStats,
    /// Seconds between the first and last sent packet.
    pub test_duration: f64,
    pub first_packet_size: u64,
    pub throughput_kbps: f64,
}

pub fn packet_loss_rate(sent: usize, received: usize) -> f64 {
    if sent == 0 {
        return 0.0;
    }
    let rate = (sent as f64 - received as f64) / sent as f64 * 100.0;
    rate.clamp(0.0, 100.0)
}

/// Throughput derived from the received count and the first packet's size.
pub fn throughput_kbps(received: usize, packet_size: u64, duration_secs: f64) -> f64 {
    if duration_secs <= 0.0 {
        return 0.0;
    }
    (received as f64 * packet_size as f64 * 8.0) / (duration_secs * 1000.0)
}

pub fn summarize_udp(sender: &[UdpSend], receiver: &[UdpReceive]) -> Option<UdpSummary> {
    if sender.is_empty() && receiver.is_empty() {
        debug!("no UDP data; skipping UDP summary");
        return None;
    }

    let total_sent = sender.len();
    let total_received = receiver.len();
    let delays_ms: Vec<f64> = receiver.iter().map(|p| p.delay * 1000.0).collect();

    let test_duration = time_range(sender)
        .map(|(first, last)| seconds_between(first, last))
        .unwrap_or(0.0);
    let first_packet_size = sender
        .iter()
        .min_by_key(|p| p.timestamp)
        .map(|p| p.packet_size)
        .unwrap_or(0);

    let summary = UdpSummary {
        total_sent,
        total_received,
        packet_loss_rate: packet_loss_rate(total_sent, total_received),
        delay_stats: DelayStats::from_millis(&delays_ms),
        test_duration,
        first_packet_size,
        throughput_kbps: throughput_kbps(total_received, first_packet_size, test_duration),
    };
    info!(
        "udp: sent {}, received {}, loss {:.2}%, mean delay {:.2} ms, p95 {:.2} ms, {:.2} kbps",
        summary.total_sent,
        summary.total_received,
        summary.packet_loss_rate,
        summary.delay_stats.mean,
        summary.delay_stats.p95,
        summary.throughput_kbps
    );
    Some(summary)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NexfiSummary {
    pub samples: usize,
    pub rssi: MetricStats,
    pub snr: MetricStats,
    pub throughput: MetricStats,
    pub link_quality: MetricStats,
}

impl NexfiSummary {
    pub fn from_status(status: &[NexfiStatus]) -> Option<Self> {
        if status.is_empty() {
            return None;
        }
        let column = |f: fn(&NexfiStatus) -> f64| -> MetricStats {
            let values: Vec<f64> = status.iter().map(f).collect();
            MetricStats::sample(&values)
        };
        Some(Self {
            samples: status.len(),
            rssi: column(|s| s.avg_rssi),
            snr: column(|s| s.avg_snr),
            throughput: column(|s| s.throughput),
            link_quality: column(|s| s.link_quality),
        })
    }
}

/// Per-role radio statistics. Roles without data get no entry; `None` if neither has data.
pub fn summarize_nexfi(nexfi: &PerRole<Vec<NexfiStatus>>) -> Option<BTreeMap<Role, NexfiSummary>> {
    let summaries: BTreeMap<Role, NexfiSummary> = Role::ALL
        .into_iter()
        .filter_map(|role| NexfiSummary::from_status(nexfi.get(role)).map(|s| (role, s)))
        .collect();

    for (role, s) in &summaries {
        info!(
            "nexfi {role}: rssi {:.1} dBm, snr {:.1} dB, throughput {:.2} Mbps, link quality {:.1}",
            s.rssi.mean, s.snr.mean, s.throughput.mean, s.link_quality.mean
        );
    }
    (!summaries.is_empty()).then_some(summaries)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsSummary {
    pub data_points: usize,
    /// Path length in the device-local frame, meters.
    pub total_distance: f64,
    pub max_altitude: f64,
    pub min_altitude: f64,
    pub altitude_change: f64,
    /// Ground speed between consecutive fixes, m/s.
    pub speed: MetricStats,
    pub flight_time: f64,
}

impl GpsSummary {
    pub fn from_track(track: &[GpsFix]) -> Option<Self> {
        if track.is_empty() {
            return None;
        }

        let mut total_distance = 0.0;
        let mut speeds = Vec::with_capacity(track.len().saturating_sub(1));
        for pair in track.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            let step = ((next.local_x - prev.local_x).powi(2)
                + (next.local_y - prev.local_y).powi(2)
                + (next.local_z - prev.local_z).powi(2))
            .sqrt();
            total_distance += step;

            let dt = seconds_between(prev.timestamp, next.timestamp);
            if dt > 0.0 {
                speeds.push(step / dt);
            }
        }

        let altitudes: Vec<f64> = track.iter().map(|f| f.altitude).collect();
        let altitude = MetricStats::sample(&altitudes);
        let flight_time = time_range(track)
            .map(|(first, last)| seconds_between(first, last))
            .unwrap_or(0.0);

        Some(Self {
            data_points: track.len(),
            total_distance,
            max_altitude: altitude.max,
            min_altitude: altitude.min,
            altitude_change: altitude.max - altitude.min,
            speed: MetricStats::sample(&speeds),
            flight_time,
        })
    }
}

pub fn summarize_gps(gps: &PerRole<Vec<GpsFix>>) -> Option<BTreeMap<Role, GpsSummary>> {
    let summaries: BTreeMap<Role, GpsSummary> = Role::ALL
        .into_iter()
        .filter_map(|role| GpsSummary::from_track(gps.get(role)).map(|s| (role, s)))
        .collect();

    for (role, s) in &summaries {
        info!(
            "gps {role}: path {:.2} m, altitude change {:.2} m, max speed {:.2} m/s, \
             flight time {:.1} s",
            s.total_distance,
            s.altitude_change,
            s.speed.max,
            s.flight_time
        );
    }
    (!summaries.is_empty()).then_some(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Timestamp;
    use chrono::{FixedOffset, TimeZone};

    fn at(secs: f64) -> Timestamp {
        FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .timestamp_millis_opt((secs * 1000.0).round() as i64)
            .unwrap()
    }

    fn udp_run(sent: usize, received: usize, delay: f64) -> (Vec<UdpSend>, Vec<UdpReceive>) {
        let sender = (0..sent)
            .map(|i| UdpSend {
                timestamp: at(i as f64),
                seq_num: i as i64,
                packet_size: 1000,
            })
            .collect();
        let receiver = (0..received)
            .map(|i| UdpReceive {
                send_timestamp: at(i as f64),
                recv_timestamp: at(i as f64 + delay),
                seq_num: i as i64,
                delay,
            })
            .collect();
        (sender, receiver)
    }

    #[test]
    fn one_hertz_probe_run() {
        let (sender, receiver) = udp_run(100, 95, 0.05);
        let summary = summarize_udp(&sender, &receiver).unwrap();
        assert_eq!(summary.total_sent, 100);
        assert_eq!(summary.total_received, 95);
        assert!((summary.packet_loss_rate - 5.0).abs() < 1e-9);
        assert!((summary.delay_stats.mean - 50.0).abs() < 1e-9);
        assert!((summary.test_duration - 99.0).abs() < 1e-9);
        assert!((summary.throughput_kbps - 7.6768).abs() < 1e-3);
        assert_eq!(summary.first_packet_size, 1000);
    }

    #[test]
    fn loss_rate_stays_within_bounds() {
        assert_eq!(packet_loss_rate(0, 0), 0.0);
        assert_eq!(packet_loss_rate(10, 10), 0.0);
        assert_eq!(packet_loss_rate(10, 0), 100.0);
        assert_eq!(packet_loss_rate(10, 12), 0.0);
        for received in 0..=20 {
            let rate = packet_loss_rate(20, received);
            assert!((0.0..=100.0).contains(&rate));
            assert_eq!(rate == 0.0, received == 20);
        }
    }

    #[test]
    fn single_packet_has_no_throughput() {
        let (sender, receiver) = udp_run(1, 1, 0.01);
        let summary = summarize_udp(&sender, &receiver).unwrap();
        assert_eq!(summary.test_duration, 0.0);
        assert_eq!(summary.throughput_kbps, 0.0);
        assert!(summarize_udp(&[], &[]).is_none());
    }

    #[test]
    fn receiver_only_udp_still_reports_delay() {
        let (_, receiver) = udp_run(0, 4, 0.02);
        let summary = summarize_udp(&[], &receiver).unwrap();
        assert_eq!(summary.total_sent, 0);
        assert_eq!(summary.packet_loss_rate, 0.0);
        assert!((summary.delay_stats.median - 20.0).abs() < 1e-9);
    }

    #[test]
    fn empty_nexfi_role_has_no_entry() {
        let mut nexfi = PerRole::<Vec<NexfiStatus>>::default();
        assert!(summarize_nexfi(&nexfi).is_none());

        nexfi.sender = vec![
            NexfiStatus {
                timestamp: at(0.0),
                avg_rssi: -60.0,
                avg_snr: 20.0,
                throughput: 10.0,
                link_quality: 80.0,
            },
            NexfiStatus {
                timestamp: at(1.0),
                avg_rssi: -70.0,
                avg_snr: 10.0,
                throughput: 6.0,
                link_quality: 60.0,
            },
        ];
        let summaries = summarize_nexfi(&nexfi).unwrap();
        assert!(summaries.contains_key(&Role::Sender));
        assert!(!summaries.contains_key(&Role::Receiver));
        let sender = &summaries[&Role::Sender];
        assert_eq!(sender.rssi.mean, -65.0);
        assert_eq!(sender.rssi.min, -70.0);
        assert!((sender.snr.std - 50.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn gps_track_path_and_speed() {
        let steps = [
            (0.0, 0.0, 10.0),
            (2.0, 3.0, 14.0),
            (2.0, 3.0, 14.0),
            (4.0, 6.0, 14.0),
        ];
        let track: Vec<GpsFix> = steps
            .iter()
            .enumerate()
            .map(|(i, &(t, x, z))| GpsFix {
                timestamp: at(t),
                latitude: 30.0,
                longitude: 114.0,
                altitude: 100.0 + i as f64,
                local_x: x,
                local_y: 0.0,
                local_z: z,
            })
            .collect();

        let summary = GpsSummary::from_track(&track).unwrap();
        assert_eq!(summary.data_points, 4);
        assert!((summary.total_distance - 8.0).abs() < 1e-9);
        assert_eq!(summary.altitude_change, 3.0);
        assert_eq!(summary.flight_time, 4.0);
        // the duplicate-time step contributes distance but no speed sample
        assert!((summary.speed.mean - 2.0).abs() < 1e-9);
        assert!((summary.speed.max - 2.5).abs() < 1e-9);
        assert!((summary.speed.min - 1.5).abs() < 1e-9);
    }
}
