use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Serialize;

use crate::models::Role;
use crate::result::AnalysisResult;

fn round(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UdpDigest {
    pub total_sent: usize,
    pub total_received: usize,
    pub packet_loss_rate: f64,
    pub avg_delay: f64,
    pub p95_delay: f64,
    pub throughput: f64,
    pub test_duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NexfiDigest {
    pub avg_rssi: f64,
    pub avg_snr: f64,
    pub avg_throughput: f64,
    pub avg_link_quality: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpsDigest {
    pub total_distance: f64,
    pub altitude_change: f64,
    pub max_speed: f64,
    pub flight_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceDigest {
    pub mean_distance: f64,
    pub max_distance: f64,
    pub min_distance: f64,
    pub std_distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationDigest {
    pub correlation: f64,
    pub p_value: f64,
    pub significant: bool,
}

/// Rounded headline figures for dashboards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Digest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub udp: Option<UdpDigest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nexfi: Option<BTreeMap<Role, NexfiDigest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps: Option<BTreeMap<Role, GpsDigest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<DistanceDigest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlations: Option<BTreeMap<String, CorrelationDigest>>,
}

pub fn digest(result: &AnalysisResult) -> Digest {
    Digest {
        udp: result.udp.as_ref().map(|udp| UdpDigest {
            total_sent: udp.total_sent,
            total_received: udp.total_received,
            packet_loss_rate: round(udp.packet_loss_rate, 2),
            avg_delay: round(udp.delay_stats.mean, 2),
            p95_delay: round(udp.delay_stats.p95, 2),
            throughput: round(udp.throughput_kbps, 2),
            test_duration: round(udp.test_duration, 1),
        }),
        nexfi: result.nexfi.as_ref().map(|roles| {
            roles
                .iter()
                .map(|(role, s)| {
                    let digest = NexfiDigest {
                        avg_rssi: round(s.rssi.mean, 1),
                        avg_snr: round(s.snr.mean, 1),
                        avg_throughput: round(s.throughput.mean, 2),
                        avg_link_quality: round(s.link_quality.mean, 1),
                    };
                    (*role, digest)
                })
                .collect()
        }),
        gps: result.gps.as_ref().map(|roles| {
            roles
                .iter()
                .map(|(role, s)| {
                    let digest = GpsDigest {
                        total_distance: round(s.total_distance, 2),
                        altitude_change: round(s.altitude_change, 2),
                        max_speed: round(s.speed.max, 2),
                        flight_time: round(s.flight_time, 1),
                    };
                    (*role, digest)
                })
                .collect()
        }),
        distance: result.inter_drone_distance.as_ref().map(|d| DistanceDigest {
            mean_distance: round(d.distance_3d.mean, 2),
            max_distance: round(d.distance_3d.max, 2),
            min_distance: round(d.distance_3d.min, 2),
            std_distance: round(d.distance_3d.std, 2),
        }),
        correlations: result.correlations.as_ref().map(|entries| {
            entries
                .iter()
                .map(|(key, c)| {
                    let digest = CorrelationDigest {
                        correlation: round(c.correlation, 3),
                        p_value: round(c.p_value, 3),
                        significant: c.significant,
                    };
                    (key.clone(), digest)
                })
                .collect()
        }),
    }
}

pub fn build_report(dataset: &str, result: &AnalysisResult) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Drone Link Analysis Report");
    let _ = writeln!(output, "Dataset: {dataset}");
    match &result.window {
        Some(window) => {
            let _ = writeln!(
                output,
                "Analysis window: {} to {} ({:.1} s)",
                window.start,
                window.end,
                window.duration_secs()
            );
        }
        None => {
            let _ = writeln!(output, "Analysis window: no overlapping data");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## UDP Performance");
    match &result.udp {
        Some(udp) => {
            let _ = writeln!(output, "- Packets sent: {}", udp.total_sent);
            let _ = writeln!(output, "- Packets received: {}", udp.total_received);
            let _ = writeln!(output, "- Packet loss: {:.2}%", udp.packet_loss_rate);
            let _ = writeln!(
                output,
                "- Delay: mean {:.2} ms, median {:.2} ms, std {:.2} ms, p95 {:.2} ms, p99 {:.2} ms",
                udp.delay_stats.mean,
                udp.delay_stats.median,
                udp.delay_stats.std,
                udp.delay_stats.p95,
                udp.delay_stats.p99
            );
            let _ = writeln!(output, "- Throughput: {:.2} kbps", udp.throughput_kbps);
            let _ = writeln!(output, "- Test duration: {:.1} s", udp.test_duration);
        }
        None => {
            let _ = writeln!(output, "UDP data not available.");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## NEXFI Link Quality");
    match &result.nexfi {
        Some(roles) => {
            for (role, s) in roles {
                let _ = writeln!(
                    output,
                    "- {}: RSSI {:.1} dBm, SNR {:.1} dB, throughput {:.2} Mbps, \
                     link quality {:.1} ({} samples)",
                    role,
                    s.rssi.mean,
                    s.snr.mean,
                    s.throughput.mean,
                    s.link_quality.mean,
                    s.samples
                );
            }
        }
        None => {
            let _ = writeln!(output, "NEXFI data not available.");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## GPS Tracks");
    match &result.gps {
        Some(roles) => {
            for (role, s) in roles {
                let _ = writeln!(
                    output,
                    "- {}: path {:.2} m, altitude {:.2}..{:.2} m, max speed {:.2} m/s, \
                     avg speed {:.2} m/s, flight time {:.1} s",
                    role,
                    s.total_distance,
                    s.min_altitude,
                    s.max_altitude,
                    s.speed.max,
                    s.speed.mean,
                    s.flight_time
                );
            }
        }
        None => {
            let _ = writeln!(output, "GPS data not available.");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Inter-Drone Distance");
    match &result.inter_drone_distance {
        Some(d) => {
            let _ = writeln!(
                output,
                "- 3D: mean {:.2} m, min {:.2} m, max {:.2} m, std {:.2} m",
                d.distance_3d.mean, d.distance_3d.min, d.distance_3d.max, d.distance_3d.std
            );
            let _ = writeln!(
                output,
                "- Horizontal mean {:.2} m, vertical mean {:.2} m",
                d.horizontal.mean, d.vertical.mean
            );
            let _ = writeln!(
                output,
                "- {} paired fixes, {} without a receiver fix within 1 s",
                d.matched, d.unmatched
            );
        }
        None => {
            let _ = writeln!(output, "Inter-drone distance not available.");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Correlation With Distance");
    match &result.correlations {
        Some(entries) if !entries.is_empty() => {
            for (key, c) in entries {
                let _ = writeln!(
                    output,
                    "- {}: r={:.3}, p={:.3} ({}, n={})",
                    key,
                    c.correlation,
                    c.p_value,
                    if c.significant { "significant" } else { "not significant" },
                    c.sample_size
                );
            }
        }
        Some(_) => {
            let _ = writeln!(output, "Too few matched samples for any correlation.");
        }
        None => {
            let _ = writeln!(output, "Correlation not available without inter-drone distance.");
        }
    }

    if !result.diagnostics.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Diagnostics");
        for diagnostic in &result.diagnostics {
            let _ = writeln!(output, "- {}: {}", diagnostic.stream, diagnostic.message);
        }
    }

    output
}
