// BENCHRIG RUN RECORD
// ONE FLAT ROW PER CELL. EVERY NUMERIC COLUMN HAS A DEFAULT SO THE ROW IS
// ALWAYS COMPLETE, EVEN WHEN EVERY TELEMETRY SOURCE WAS UNAVAILABLE.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::RunKey;
use crate::telemetry::{LoadResult, SystemMetrics};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    pub config: String,
    pub connections: u32,
    pub throughput_req_sec: f64,
    pub throughput_bandwidth_mb_sec: f64,
    pub latency_avg_ms: f64,
    pub errors: String,
    pub llc_misses: u64,
    pub longest_lat_cache_miss: u64,
    pub context_switches: i64,
    pub softirqs: i64,
    pub disk_read_mb_sec: f64,
    pub disk_utilization_percent: f64,
    pub cpu0_user_percent: f64,
    pub cpu0_system_percent: f64,
    pub cpu0_softirq_percent: f64,
    pub cpu0_iowait_percent: f64,
    pub cpu0_idle_percent: f64,
    pub memory_read_mb_sec_pcm: f64,
    pub memory_reads_perf: u64,
}

impl RunRecord {
    // MUST MATCH FIELD ORDER ABOVE
    pub const COLUMNS: [&'static str; 19] = [
        "config",
        "connections",
        "throughput_req_sec",
        "throughput_bandwidth_mb_sec",
        "latency_avg_ms",
        "errors",
        "llc_misses",
        "longest_lat_cache_miss",
        "context_switches",
        "softirqs",
        "disk_read_mb_sec",
        "disk_utilization_percent",
        "cpu0_user_percent",
        "cpu0_system_percent",
        "cpu0_softirq_percent",
        "cpu0_iowait_percent",
        "cpu0_idle_percent",
        "memory_read_mb_sec_pcm",
        "memory_reads_perf",
    ];

    /// Merge load and system telemetry for one cell. Absent values become 0.
    pub fn normalize(key: &RunKey, load: &LoadResult, sys: &SystemMetrics) -> Self {
        let cpu = sys.cpu.unwrap_or_default();
        let disk = sys.disk.unwrap_or_default();
        Self {
            config: key.config.name.clone(),
            connections: key.concurrency,
            throughput_req_sec: load.throughput_req_sec.unwrap_or(0.0),
            throughput_bandwidth_mb_sec: load.throughput_bandwidth_mb_sec.unwrap_or(0.0),
            latency_avg_ms: load.latency_avg_ms.unwrap_or(0.0),
            errors: load.errors.clone(),
            llc_misses: sys.llc_misses.unwrap_or(0),
            longest_lat_cache_miss: sys.longest_lat_cache_miss.unwrap_or(0),
            context_switches: sys.context_switches.unwrap_or(0),
            softirqs: sys.softirqs.unwrap_or(0),
            disk_read_mb_sec: disk.read_mb_sec,
            disk_utilization_percent: disk.utilization_percent,
            cpu0_user_percent: cpu.user,
            cpu0_system_percent: cpu.system,
            cpu0_softirq_percent: cpu.softirq,
            cpu0_iowait_percent: cpu.iowait,
            cpu0_idle_percent: cpu.idle,
            memory_read_mb_sec_pcm: sys.memory_read_mb_sec_pcm.unwrap_or(0.0),
            memory_reads_perf: sys.memory_reads_perf.unwrap_or(0),
        }
    }
}

/// Where finished records go. Each append must be durable before returning.
pub trait RecordSink {
    fn append(&mut self, record: &RunRecord) -> Result<()>;
}

pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvSink<File> {
    /// Truncate `path` and write the header.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        Self::new(file)
    }
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(inner);
        writer
            .write_record(RunRecord::COLUMNS)
            .context("failed to write results header")?;
        writer.flush().context("failed to flush results header")?;
        Ok(Self { writer })
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("failed to flush results: {}", e.error()))
    }
}

impl<W: Write> RecordSink for CsvSink<W> {
    fn append(&mut self, record: &RunRecord) -> Result<()> {
        self.writer
            .serialize(record)
            .context("failed to write result row")?;
        self.writer.flush().context("failed to flush result row")?;
        Ok(())
    }
}

impl RecordSink for Vec<RunRecord> {
    fn append(&mut self, record: &RunRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}
