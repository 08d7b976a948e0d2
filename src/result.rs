use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::align::AnalysisWindow;
use crate::correlate::Correlations;
use crate::geodesy::DistanceSummary;
use crate::ingest::StreamDiagnostic;
use crate::models::Role;
use crate::summary::{GpsSummary, NexfiSummary, UdpSummary};

/// Everything one analysis run produced. Categories whose inputs were missing
/// are `None` and are left out of the JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub udp: Option<UdpSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nexfi: Option<BTreeMap<Role, NexfiSummary>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps: Option<BTreeMap<Role, GpsSummary>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inter_drone_distance: Option<DistanceSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlations: Option<Correlations>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<AnalysisWindow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<StreamDiagnostic>,
}

impl AnalysisResult {
    /// Names of the populated result categories.
    pub fn categories(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.udp.is_some() {
            names.push("udp");
        }
        if self.nexfi.is_some() {
            names.push("nexfi");
        }
        if self.gps.is_some() {
            names.push("gps");
        }
        if self.inter_drone_distance.is_some() {
            names.push("inter_drone_distance");
        }
        if self.correlations.is_some() {
            names.push("correlations");
        }
        names
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let text = self.to_json().context("failed to serialize analysis result")?;
        std::fs::write(path, text)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("{} is not an analysis result", path.display()))
    }
}
