//! Post-flight analysis of drone-to-drone link quality.
//!
//! Loads the UDP probe, NEXFI radio status and GPS logs captured on a
//! sender/receiver drone pair, aligns them on a common time window and
//! relates delay and signal strength to the distance between the drones.

pub mod align;
pub mod compare;
pub mod config;
pub mod correlate;
pub mod discover;
pub mod error;
pub mod geodesy;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod result;
pub mod session;
pub mod stats;
pub mod summary;
pub mod timeline;

pub use config::{AnalysisConfig, FileMatchPolicy};
pub use error::IngestError;
pub use pipeline::{analyze_streams, run_analysis, run_analysis_strict, Analysis};
pub use result::AnalysisResult;
