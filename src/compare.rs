use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::AnalysisConfig;
use crate::models::Role;
use crate::pipeline::run_analysis;
use crate::result::AnalysisResult;

/// Headline numbers used to compare flight tests side by side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packet_loss_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_delay_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throughput_kbps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_distance_m: Option<f64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub avg_rssi: BTreeMap<Role, f64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub avg_snr: BTreeMap<Role, f64>,
}

impl From<&AnalysisResult> for ComparisonMetrics {
    fn from(result: &AnalysisResult) -> Self {
        let mut metrics = ComparisonMetrics::default();
        if let Some(udp) = &result.udp {
            metrics.packet_loss_rate = Some(udp.packet_loss_rate);
            metrics.avg_delay_ms = Some(udp.delay_stats.mean);
            metrics.throughput_kbps = Some(udp.throughput_kbps);
        }
        if let Some(distance) = &result.inter_drone_distance {
            metrics.avg_distance_m = Some(distance.distance_3d.mean);
        }
        for (role, summary) in result.nexfi.iter().flatten() {
            metrics.avg_rssi.insert(*role, summary.rssi.mean);
            metrics.avg_snr.insert(*role, summary.snr.mean);
        }
        metrics
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DatasetComparison {
    Failed { error: String },
    Metrics(ComparisonMetrics),
}

/// Analyzes each dataset independently and collects its headline metrics,
/// keyed by the dataset's directory name. A dataset that fails to load is
/// reported as such without aborting the others.
pub fn compare_datasets(
    datasets: &[PathBuf],
    config: &AnalysisConfig,
) -> anyhow::Result<BTreeMap<String, DatasetComparison>> {
    if datasets.len() < 2 {
        anyhow::bail!("at least two datasets are needed for a comparison");
    }

    let mut comparison = BTreeMap::new();
    for path in datasets {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let entry = match run_analysis(path, config) {
            Ok(analysis) => DatasetComparison::Metrics(analysis.result().into()),
            Err(err) => {
                warn!("{name}: {err}");
                DatasetComparison::Failed {
                    error: err.to_string(),
                }
            }
        };
        comparison.insert(name, entry);
    }
    Ok(comparison)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::MetricStats;
    use crate::summary::NexfiSummary;

    #[test]
    fn metrics_follow_available_categories() {
        let mut result = AnalysisResult::default();
        assert_eq!(ComparisonMetrics::from(&result), ComparisonMetrics::default());

        let stats = |mean: f64| MetricStats {
            mean,
            ..MetricStats::default()
        };
        result.nexfi = Some(BTreeMap::from([(
            Role::Receiver,
            NexfiSummary {
                samples: 3,
                rssi: stats(-72.5),
                snr: stats(18.0),
                throughput: stats(4.0),
                link_quality: stats(60.0),
            },
        )]));
        let metrics = ComparisonMetrics::from(&result);
        assert_eq!(metrics.avg_rssi.get(&Role::Receiver), Some(&-72.5));
        assert!(metrics.avg_rssi.get(&Role::Sender).is_none());
        assert!(metrics.packet_loss_rate.is_none());
    }

    #[test]
    fn needs_two_datasets_and_survives_failures() {
        let config = AnalysisConfig::default();
        assert!(compare_datasets(&[PathBuf::from("one")], &config).is_err());

        let empty = tempfile::tempdir().unwrap();
        let datasets = vec![empty.path().to_path_buf(), empty.path().join("missing")];
        let comparison = compare_datasets(&datasets, &config).unwrap();
        assert_eq!(comparison.len(), 2);
        assert!(matches!(comparison["missing"], DatasetComparison::Failed { .. }));
    }
}
