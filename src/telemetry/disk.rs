// BLOCK DEVICE SNAPSHOTS (/proc/diskstats)
// THROUGHPUT SUMS WHOLE DISKS (BYTES ADD ACROSS DEVICES).
// UTILIZATION TAKES THE BUSIEST DISK (THE BOTTLENECK, NOT AN AVERAGE).
// PARTITIONS ARE DROPPED SO THEIR SECTORS ARE NOT COUNTED TWICE.

use std::collections::BTreeMap;
use std::time::Duration;

use super::{decode, ArtifactReader, Cell, SystemMetrics, TelemetrySource};
use crate::error::ParseError;

const SECTOR_BYTES: u64 = 512;
const MIN_COLUMNS: usize = 13;
const COL_NAME: usize = 2;
const COL_SECTORS_READ: usize = 5;
const COL_IO_TIME_MS: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskDeviceSample {
    pub device: String,
    pub sectors_read: u64,
    pub io_time_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DiskThroughput {
    pub read_mb_sec: f64,
    pub utilization_percent: f64,
}

fn is_virtual(name: &str) -> bool {
    name.starts_with("loop") || name.starts_with("ram")
}

/// nvme0n1 -> disk, nvme0n1p1 -> partition, sda -> disk, sda1 -> partition.
pub fn is_partition(name: &str) -> bool {
    match name.strip_prefix("nvme") {
        Some(rest) => rest.contains('p'),
        None => name.chars().last().is_some_and(|c| c.is_ascii_digit()),
    }
}

/// Whole physical disks in one snapshot, keyed by name.
pub fn parse_diskstats(text: &str) -> Result<BTreeMap<String, DiskDeviceSample>, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    let mut devices = BTreeMap::new();
    for line in text.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < MIN_COLUMNS {
            continue;
        }
        let name = parts[COL_NAME];
        if is_virtual(name) || is_partition(name) {
            continue;
        }
        let (Ok(sectors_read), Ok(io_time_ms)) = (
            parts[COL_SECTORS_READ].parse::<u64>(),
            parts[COL_IO_TIME_MS].parse::<u64>(),
        ) else {
            continue;
        };
        devices.insert(
            name.to_string(),
            DiskDeviceSample {
                device: name.to_string(),
                sectors_read,
                io_time_ms,
            },
        );
    }
    Ok(devices)
}

/// Aggregate two snapshots over a window. Devices missing from either side are skipped.
pub fn throughput(
    start: &BTreeMap<String, DiskDeviceSample>,
    end: &BTreeMap<String, DiskDeviceSample>,
    window: Duration,
) -> DiskThroughput {
    let secs = window.as_secs_f64();
    if secs <= 0.0 {
        return DiskThroughput::default();
    }

    let mut sectors = 0u64;
    let mut max_io_ms = 0u64;
    for (name, a) in start {
        let Some(b) = end.get(name) else {
            continue;
        };
        // COUNTER RESET ON ONE DEVICE CONTRIBUTES NOTHING
        sectors += b.sectors_read.saturating_sub(a.sectors_read);
        max_io_ms = max_io_ms.max(b.io_time_ms.saturating_sub(a.io_time_ms));
    }

    DiskThroughput {
        read_mb_sec: (sectors * SECTOR_BYTES) as f64 / secs / (1024.0 * 1024.0),
        utilization_percent: max_io_ms as f64 / (secs * 1000.0) * 100.0,
    }
}

/// `{prefix}_disk_start.txt` / `{prefix}_disk_end.txt`
pub struct DiskStats;

impl TelemetrySource for DiskStats {
    fn name(&self) -> &'static str {
        "diskstats"
    }

    fn collect(&self, artifacts: &dyn ArtifactReader, cell: &Cell<'_>, out: &mut SystemMetrics) {
        let start = decode(artifacts, &cell.artifact("disk_start.txt"), parse_diskstats);
        let end = decode(artifacts, &cell.artifact("disk_end.txt"), parse_diskstats);
        if let (Some(a), Some(b)) = (start, end) {
            out.disk = Some(throughput(&a, &b, cell.duration));
        }
    }
}
