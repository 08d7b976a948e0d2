use std::path::Path;

use tracing::info;

use crate::align::{align, Overlap};
use crate::config::AnalysisConfig;
use crate::correlate::correlate;
use crate::error::IngestError;
use crate::geodesy::inter_drone_distance;
use crate::ingest::{load_dataset, load_dataset_strict, LoadedDataset, StreamDiagnostic};
use crate::models::DatasetStreams;
use crate::result::AnalysisResult;
use crate::summary::{summarize_gps, summarize_nexfi, summarize_udp};

/// Aligned streams together with the result computed from them.
#[derive(Debug, Clone)]
pub struct Analysis {
    streams: DatasetStreams,
    overlap: Overlap,
    result: AnalysisResult,
}

impl Analysis {
    pub fn streams(&self) -> &DatasetStreams {
        &self.streams
    }

    pub fn overlap(&self) -> Overlap {
        self.overlap
    }

    pub fn result(&self) -> &AnalysisResult {
        &self.result
    }

    pub fn into_result(self) -> AnalysisResult {
        self.result
    }
}

/// Sorts and aligns raw streams, then runs every analysis stage over them.
pub fn analyze_streams(
    mut streams: DatasetStreams,
    diagnostics: Vec<StreamDiagnostic>,
) -> Analysis {
    streams.sort_by_time();
    let (streams, overlap) = align(streams);

    let udp = summarize_udp(&streams.udp_sender, &streams.udp_receiver);
    let nexfi = summarize_nexfi(&streams.nexfi);
    let gps = summarize_gps(&streams.gps);
    let inter_drone_distance = inter_drone_distance(&streams.gps.sender, &streams.gps.receiver);
    let correlations = inter_drone_distance
        .as_ref()
        .map(|distances| correlate(distances, &streams.udp_receiver, &streams.nexfi));

    let result = AnalysisResult {
        udp,
        nexfi,
        gps,
        inter_drone_distance,
        correlations,
        window: overlap.window(),
        diagnostics,
    };
    info!("analysis complete: {}", result.categories().join(", "));

    Analysis {
        streams,
        overlap,
        result,
    }
}

fn analyze_loaded(loaded: LoadedDataset) -> Analysis {
    analyze_streams(loaded.streams, loaded.diagnostics)
}

/// Loads the dataset at `root` and analyzes it. Unreadable streams degrade to
/// diagnostics on the result.
pub fn run_analysis(root: &Path, config: &AnalysisConfig) -> Result<Analysis, IngestError> {
    load_dataset(root, config).map(analyze_loaded)
}

/// Like [`run_analysis`], but any stream failure fails the run.
pub fn run_analysis_strict(root: &Path, config: &AnalysisConfig) -> Result<Analysis, IngestError> {
    load_dataset_strict(root, config).map(analyze_loaded)
}
