use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{AnalysisConfig, FileMatchPolicy};
use crate::error::{DiagnosticKind, IngestError};
use crate::models::{
    sort_by_time, DatasetStreams, GpsFix, NexfiStatus, Role, Timestamp, Timestamped, UdpReceive,
    UdpSend,
};

pub const UDP_SENDER_PATTERN: &str = "udp_sender_*.csv";
pub const UDP_RECEIVER_PATTERN: &str = "udp_receiver_*.csv";
pub const NEXFI_PATTERN: &str = "nexfi_status_*.csv";
pub const GPS_PATTERN: &str = "gps_logger_*_*.csv";

/// A stream that could not be loaded. The stream is left empty and the run continues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDiagnostic {
    pub stream: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub root: PathBuf,
    pub streams: DatasetStreams,
    pub diagnostics: Vec<StreamDiagnostic>,
}

/// Loads every stream under `root`, recording per-stream failures as diagnostics.
pub fn load_dataset(root: &Path, config: &AnalysisConfig) -> Result<LoadedDataset, IngestError> {
    load(root, config, false)
}

/// Like [`load_dataset`], but the first stream failure aborts the whole load.
pub fn load_dataset_strict(
    root: &Path,
    config: &AnalysisConfig,
) -> Result<LoadedDataset, IngestError> {
    load(root, config, true)
}

fn load(root: &Path, config: &AnalysisConfig, strict: bool) -> Result<LoadedDataset, IngestError> {
    if !root.is_dir() {
        return Err(IngestError::MissingDirectory(root.to_path_buf()));
    }

    let mut loader = Loader {
        root,
        offset: config.offset()?,
        policy: config.on_multiple_files,
        strict,
        diagnostics: Vec::new(),
    };

    for role in Role::ALL {
        let dir = root.join(role.as_str());
        if !dir.is_dir() {
            warn!("{} has no {}/ folder; its streams will be empty", root.display(), role);
        }
    }

    let mut streams = DatasetStreams {
        udp_sender: loader.stream::<UdpSendRow>("udp_sender", Role::Sender, UDP_SENDER_PATTERN)?,
        udp_receiver: loader.stream::<UdpReceiveRow>(
            "udp_receiver",
            Role::Receiver,
            UDP_RECEIVER_PATTERN,
        )?,
        ..DatasetStreams::default()
    };
    for role in Role::ALL {
        *streams.nexfi.get_mut(role) =
            loader.stream::<NexfiRow>(&format!("nexfi_status[{role}]"), role, NEXFI_PATTERN)?;
        *streams.gps.get_mut(role) =
            loader.stream::<GpsRow>(&format!("gps_track[{role}]"), role, GPS_PATTERN)?;
    }

    info!(
        "loaded {}: udp sender {} / receiver {}, nexfi sender {} / receiver {}, \
         gps sender {} / receiver {}",
        root.display(),
        streams.udp_sender.len(),
        streams.udp_receiver.len(),
        streams.nexfi.sender.len(),
        streams.nexfi.receiver.len(),
        streams.gps.sender.len(),
        streams.gps.receiver.len(),
    );

    Ok(LoadedDataset {
        root: root.to_path_buf(),
        streams,
        diagnostics: loader.diagnostics,
    })
}

struct Loader<'a> {
    root: &'a Path,
    offset: FixedOffset,
    policy: FileMatchPolicy,
    strict: bool,
    diagnostics: Vec<StreamDiagnostic>,
}

impl Loader<'_> {
    fn stream<R: LogRecord>(
        &mut self,
        name: &str,
        role: Role,
        pattern: &str,
    ) -> Result<Vec<R::Point>, IngestError> {
        let dir = self.root.join(role.as_str());
        match load_stream::<R>(&dir, pattern, self.policy, self.offset) {
            Ok(points) => Ok(points),
            Err(err) if !self.strict => {
                warn!("{name} unavailable: {err}");
                self.diagnostics.push(StreamDiagnostic {
                    stream: name.to_string(),
                    kind: err.kind(),
                    message: err.to_string(),
                });
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }
}

/// Reads the stream matching `pattern` inside `dir`. No match yields an empty stream.
pub fn load_stream<R: LogRecord>(
    dir: &Path,
    pattern: &str,
    policy: FileMatchPolicy,
    offset: FixedOffset,
) -> Result<Vec<R::Point>, IngestError> {
    let files = matching_files(dir, pattern)?;
    let selected = match (files.len(), policy) {
        (0, _) => {
            debug!("no file matches {pattern} in {}", dir.display());
            return Ok(Vec::new());
        }
        (1, _) | (_, FileMatchPolicy::Merge) => files,
        (count, FileMatchPolicy::First) => {
            warn!(
                "{count} files match {pattern} in {}; using {} and ignoring {:?}",
                dir.display(),
                files[0].display(),
                &files[1..]
            );
            files.into_iter().take(1).collect()
        }
        (count, FileMatchPolicy::Error) => {
            return Err(IngestError::AmbiguousFiles {
                dir: dir.to_path_buf(),
                pattern: pattern.to_string(),
                count,
                files: files
                    .iter()
                    .filter_map(|p| p.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
                    .collect(),
            });
        }
    };

    let mut points = Vec::new();
    for path in &selected {
        read_csv::<R>(path, offset, &mut points)?;
    }
    sort_by_time(&mut points);
    Ok(points)
}

/// Files directly inside `dir` whose names match `pattern`, sorted by name.
pub fn matching_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, IngestError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let io_err = |source| IngestError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        let name = entry.file_name();
        if path.is_file() && matches_pattern(pattern, &name.to_string_lossy()) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Shell-style matching where `*` stands for any run of characters.
pub fn matches_pattern(pattern: &str, name: &str) -> bool {
    let mut parts = pattern.split('*');
    let head = parts.next().unwrap_or_default();
    let Some(mut rest) = name.strip_prefix(head) else {
        return false;
    };

    let tail: Vec<&str> = parts.collect();
    let Some((last, middle)) = tail.split_last() else {
        return rest.is_empty();
    };
    for part in middle {
        match rest.find(*part) {
            Some(at) => rest = &rest[at + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(*last)
}

/// Converts Unix epoch seconds into an instant displayed at `offset`.
pub fn epoch_to_timestamp(secs: f64, offset: &FixedOffset) -> Option<Timestamp> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let mut nanos = ((secs - whole) * 1e9).round() as u32;
    let mut whole = whole as i64;
    if nanos >= 1_000_000_000 {
        whole = whole.checked_add(1)?;
        nanos -= 1_000_000_000;
    }
    DateTime::from_timestamp(whole, nanos).map(|utc| utc.with_timezone(offset))
}

fn read_csv<R: LogRecord>(
    path: &Path,
    offset: FixedOffset,
    points: &mut Vec<R::Point>,
) -> Result<(), IngestError> {
    let csv_err = |source: csv::Error| IngestError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;

    let headers = reader.headers().map_err(csv_err)?.clone();
    for column in R::COLUMNS {
        if !headers.iter().any(|header| header == *column) {
            return Err(IngestError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            });
        }
    }

    let mut loaded = 0usize;
    let mut skipped = 0usize;
    for (index, result) in reader.deserialize::<R>().enumerate() {
        let record = result.map_err(csv_err)?;
        match record.into_point(&offset) {
            Row::Point(point) => {
                points.push(point);
                loaded += 1;
            }
            Row::Incomplete => skipped += 1,
            Row::BadTimestamp(value) => {
                return Err(IngestError::InvalidTimestamp {
                    path: path.to_path_buf(),
                    row: index + 2,
                    value,
                });
            }
        }
    }

    if skipped > 0 {
        warn!("{}: skipped {skipped} rows with blank or non-finite values", path.display());
    }
    debug!("{}: {loaded} rows", path.display());
    Ok(())
}

pub enum Row<P> {
    Point(P),
    /// A required field is blank or not finite.
    Incomplete,
    BadTimestamp(f64),
}

/// One CSV row of a log file, before timestamp normalization.
pub trait LogRecord: DeserializeOwned {
    type Point: Timestamped;
    const COLUMNS: &'static [&'static str];

    fn into_point(self, offset: &FixedOffset) -> Row<Self::Point>;
}

fn finite(values: &[Option<f64>]) -> Option<Vec<f64>> {
    values
        .iter()
        .map(|value| value.filter(|v| v.is_finite()))
        .collect()
}

fn stamp(secs: f64, offset: &FixedOffset) -> Result<Timestamp, f64> {
    epoch_to_timestamp(secs, offset).ok_or(secs)
}

#[derive(Debug, Deserialize)]
pub struct UdpSendRow {
    timestamp: Option<f64>,
    seq_num: Option<i64>,
    packet_size: Option<u64>,
}

impl LogRecord for UdpSendRow {
    type Point = UdpSend;
    const COLUMNS: &'static [&'static str] = &["timestamp", "seq_num", "packet_size"];

    fn into_point(self, offset: &FixedOffset) -> Row<UdpSend> {
        let (Some(ts), Some(seq_num), Some(packet_size)) = (
            self.timestamp.filter(|v| v.is_finite()),
            self.seq_num,
            self.packet_size,
        ) else {
            return Row::Incomplete;
        };
        match stamp(ts, offset) {
            Ok(timestamp) => Row::Point(UdpSend {
                timestamp,
                seq_num,
                packet_size,
            }),
            Err(value) => Row::BadTimestamp(value),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UdpReceiveRow {
    send_timestamp: Option<f64>,
    recv_timestamp: Option<f64>,
    seq_num: Option<i64>,
    delay: Option<f64>,
}

impl LogRecord for UdpReceiveRow {
    type Point = UdpReceive;
    const COLUMNS: &'static [&'static str] =
        &["send_timestamp", "recv_timestamp", "seq_num", "delay"];

    fn into_point(self, offset: &FixedOffset) -> Row<UdpReceive> {
        let (Some(values), Some(seq_num)) = (
            finite(&[self.send_timestamp, self.recv_timestamp, self.delay]),
            self.seq_num,
        ) else {
            return Row::Incomplete;
        };
        let (send_timestamp, recv_timestamp) =
            match (stamp(values[0], offset), stamp(values[1], offset)) {
                (Ok(send), Ok(recv)) => (send, recv),
                (Err(value), _) | (_, Err(value)) => return Row::BadTimestamp(value),
            };
        Row::Point(UdpReceive {
            send_timestamp,
            recv_timestamp,
            seq_num,
            delay: values[2],
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct NexfiRow {
    timestamp: Option<f64>,
    avg_rssi: Option<f64>,
    avg_snr: Option<f64>,
    throughput: Option<f64>,
    link_quality: Option<f64>,
}

impl LogRecord for NexfiRow {
    type Point = NexfiStatus;
    const COLUMNS: &'static [&'static str] =
        &["timestamp", "avg_rssi", "avg_snr", "throughput", "link_quality"];

    fn into_point(self, offset: &FixedOffset) -> Row<NexfiStatus> {
        let Some(values) = finite(&[
            self.timestamp,
            self.avg_rssi,
            self.avg_snr,
            self.throughput,
            self.link_quality,
        ]) else {
            return Row::Incomplete;
        };
        match stamp(values[0], offset) {
            Ok(timestamp) => Row::Point(NexfiStatus {
                timestamp,
                avg_rssi: values[1],
                avg_snr: values[2],
                throughput: values[3],
                link_quality: values[4],
            }),
            Err(value) => Row::BadTimestamp(value),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GpsRow {
    timestamp: Option<f64>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    altitude: Option<f64>,
    local_x: Option<f64>,
    local_y: Option<f64>,
    local_z: Option<f64>,
}

impl LogRecord for GpsRow {
    type Point = GpsFix;
    const COLUMNS: &'static [&'static str] = &[
        "timestamp",
        "latitude",
        "longitude",
        "altitude",
        "local_x",
        "local_y",
        "local_z",
    ];

    fn into_point(self, offset: &FixedOffset) -> Row<GpsFix> {
        let Some(values) = finite(&[
            self.timestamp,
            self.latitude,
            self.longitude,
            self.altitude,
            self.local_x,
            self.local_y,
            self.local_z,
        ]) else {
            return Row::Incomplete;
        };
        match stamp(values[0], offset) {
            Ok(timestamp) => Row::Point(GpsFix {
                timestamp,
                latitude: values[1],
                longitude: values[2],
                altitude: values[3],
                local_x: values[4],
                local_y: values[5],
                local_z: values[6],
            }),
            Err(value) => Row::BadTimestamp(value),
        }
    }
}
