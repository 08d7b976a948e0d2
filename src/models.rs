use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

pub type Timestamp = DateTime<FixedOffset>;

/// Which drone a log was captured on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Sender,
    Receiver,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Sender, Role::Receiver];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Sender => "sender",
            Role::Receiver => "receiver",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sample that can be placed on the shared analysis time axis.
pub trait Timestamped {
    fn timestamp(&self) -> Timestamp;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UdpSend {
    pub timestamp: Timestamp,
    pub seq_num: i64,
    pub packet_size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UdpReceive {
    pub send_timestamp: Timestamp,
    pub recv_timestamp: Timestamp,
    pub seq_num: i64,
    /// One-way delay in seconds.
    pub delay: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NexfiStatus {
    pub timestamp: Timestamp,
    pub avg_rssi: f64,
    pub avg_snr: f64,
    pub throughput: f64,
    pub link_quality: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    pub timestamp: Timestamp,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub local_x: f64,
    pub local_y: f64,
    pub local_z: f64,
}

impl Timestamped for UdpSend {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

/// Received packets are placed on the timeline by their send time, the
/// instant they share with the sender log.
impl Timestamped for UdpReceive {
    fn timestamp(&self) -> Timestamp {
        self.send_timestamp
    }
}

impl Timestamped for NexfiStatus {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

impl Timestamped for GpsFix {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerRole<T> {
    pub sender: T,
    pub receiver: T,
}

impl<T> PerRole<T> {
    pub fn get(&self, role: Role) -> &T {
        match role {
            Role::Sender => &self.sender,
            Role::Receiver => &self.receiver,
        }
    }

    pub fn get_mut(&mut self, role: Role) -> &mut T {
        match role {
            Role::Sender => &mut self.sender,
            Role::Receiver => &mut self.receiver,
        }
    }
}

/// The six log streams of one flight test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetStreams {
    pub udp_sender: Vec<UdpSend>,
    pub udp_receiver: Vec<UdpReceive>,
    pub nexfi: PerRole<Vec<NexfiStatus>>,
    pub gps: PerRole<Vec<GpsFix>>,
}

impl DatasetStreams {
    /// `(earliest, latest)` of every non-empty stream.
    pub fn ranges(&self) -> Vec<(Timestamp, Timestamp)> {
        let mut ranges = Vec::with_capacity(6);
        ranges.extend(time_range(&self.udp_sender));
        ranges.extend(time_range(&self.udp_receiver));
        for role in Role::ALL {
            ranges.extend(time_range(self.nexfi.get(role)));
            ranges.extend(time_range(self.gps.get(role)));
        }
        ranges
    }

    pub fn total_points(&self) -> usize {
        self.udp_sender.len()
            + self.udp_receiver.len()
            + self.nexfi.sender.len()
            + self.nexfi.receiver.len()
            + self.gps.sender.len()
            + self.gps.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_points() == 0
    }

    /// Puts every stream in ascending time order.
    pub fn sort_by_time(&mut self) {
        sort_by_time(&mut self.udp_sender);
        sort_by_time(&mut self.udp_receiver);
        for role in Role::ALL {
            sort_by_time(self.nexfi.get_mut(role));
            sort_by_time(self.gps.get_mut(role));
        }
    }
}

pub fn time_range<T: Timestamped>(points: &[T]) -> Option<(Timestamp, Timestamp)> {
    let mut iter = points.iter().map(Timestamped::timestamp);
    let first = iter.next()?;
    Some(iter.fold((first, first), |(lo, hi), ts| (lo.min(ts), hi.max(ts))))
}

pub fn sort_by_time<T: Timestamped>(points: &mut [T]) {
    points.sort_by_key(Timestamped::timestamp);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fix(secs: i64) -> GpsFix {
        GpsFix {
            timestamp: FixedOffset::east_opt(0).unwrap().timestamp_opt(secs, 0).unwrap(),
            latitude: 0.0,
            longitude: 0.0,
            altitude: 0.0,
            local_x: 0.0,
            local_y: 0.0,
            local_z: 0.0,
        }
    }

    #[test]
    fn time_range_does_not_assume_order() {
        let points = vec![fix(5), fix(1), fix(9), fix(3)];
        let (lo, hi) = time_range(&points).unwrap();
        assert_eq!(lo.timestamp(), 1);
        assert_eq!(hi.timestamp(), 9);
        assert!(time_range::<GpsFix>(&[]).is_none());
    }

    #[test]
    fn ranges_skip_empty_streams() {
        let mut streams = DatasetStreams::default();
        streams.gps.receiver = vec![fix(2), fix(4)];
        assert_eq!(streams.ranges().len(), 1);
        assert_eq!(streams.total_points(), 2);
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Receiver).unwrap(), "\"receiver\"");
        assert_eq!(Role::Sender.to_string(), "sender");
    }
}
