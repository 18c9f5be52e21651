//! Bottleneck classifier (C8): labels a run as read-bound, write-bound or
//! balanced from accumulated read/write timings.

use std::fmt;

const THRESHOLD: f64 = 0.60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bottleneck {
    #[default]
    Unknown,
    Source,
    Destination,
    Balanced,
}

impl fmt::Display for Bottleneck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Bottleneck::Unknown => "unknown",
            Bottleneck::Source => "source",
            Bottleneck::Destination => "destination",
            Bottleneck::Balanced => "balanced",
        };
        f.write_str(s)
    }
}

/// Classifies which side of a copy is the bottleneck from accumulated read
/// and write time. Source-bound when reads account for >= 60% of total
/// time, destination-bound when writes do; otherwise balanced.
pub fn classify(total_read_nanos: u64, total_write_nanos: u64) -> Bottleneck {
    let total = total_read_nanos + total_write_nanos;
    if total == 0 {
        return Bottleneck::Unknown;
    }
    let read_ratio = total_read_nanos as f64 / total as f64;
    let write_ratio = total_write_nanos as f64 / total as f64;
    if read_ratio >= THRESHOLD {
        Bottleneck::Source
    } else if write_ratio >= THRESHOLD {
        Bottleneck::Destination
    } else {
        Bottleneck::Balanced
    }
}
