// BENCHRIG TELEMETRY
// ONE DECODER PER RAW FORMAT. EACH IS A PURE FUNCTION &str -> Result<T, ParseError>.
// SOURCES WRAP DECODERS, FETCH THEIR ARTIFACTS, AND FILL SystemMetrics.
// A FAILED DECODE LEAVES ITS FIELDS None. NOTHING HERE CAN ABORT A CELL.

pub mod disk;
pub mod load;
pub mod pcm;
pub mod perf;
pub mod procstat;
pub mod softirq;

use std::time::Duration;

use tracing::debug;

use crate::config::BenchConfig;
use crate::error::ParseError;
use crate::remote::RemoteExec;

pub use load::LoadResult;

/// Read access to the artifacts a collector left behind.
pub trait ArtifactReader {
    /// `None` when the file is missing, empty or unreachable.
    fn read(&self, file: &str) -> Option<String>;
}

/// Artifacts on the remote host, fetched with `cat`.
pub struct RemoteArtifacts<'a, G: RemoteExec> {
    gateway: &'a G,
    config: &'a BenchConfig,
}

impl<'a, G: RemoteExec> RemoteArtifacts<'a, G> {
    pub fn new(gateway: &'a G, config: &'a BenchConfig) -> Self {
        Self { gateway, config }
    }
}

impl<G: RemoteExec> ArtifactReader for RemoteArtifacts<'_, G> {
    fn read(&self, file: &str) -> Option<String> {
        let out = self
            .gateway
            .execute(&format!("cat {}", self.config.remote_path(file)));
        if out.stdout.trim().is_empty() {
            None
        } else {
            Some(out.stdout)
        }
    }
}

/// What a source needs to know about the cell it decodes.
#[derive(Debug, Clone)]
pub struct Cell<'a> {
    pub prefix: &'a str,
    pub duration: Duration,
    pub core: u32,
}

impl Cell<'_> {
    pub fn artifact(&self, suffix: &str) -> String {
        format!("{}_{}", self.prefix, suffix)
    }
}

/// Every system-level field a record can carry. `None` = source unavailable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemMetrics {
    pub llc_misses: Option<u64>,
    pub longest_lat_cache_miss: Option<u64>,
    pub memory_reads_perf: Option<u64>,
    pub context_switches: Option<i64>,
    pub cpu: Option<procstat::CpuPercent>,
    pub softirqs: Option<i64>,
    pub disk: Option<disk::DiskThroughput>,
    pub memory_read_mb_sec_pcm: Option<f64>,
}

pub trait TelemetrySource {
    fn name(&self) -> &'static str;

    fn collect(&self, artifacts: &dyn ArtifactReader, cell: &Cell<'_>, out: &mut SystemMetrics);
}

pub fn default_sources() -> Vec<Box<dyn TelemetrySource>> {
    vec![
        Box::new(perf::PerfStat),
        Box::new(procstat::ProcStat),
        Box::new(softirq::SoftIrqs),
        Box::new(disk::DiskStats),
        Box::new(pcm::PcmMemory),
    ]
}

pub fn collect_all(
    sources: &[Box<dyn TelemetrySource>],
    artifacts: &dyn ArtifactReader,
    cell: &Cell<'_>,
) -> SystemMetrics {
    let mut metrics = SystemMetrics::default();
    for source in sources {
        debug!(source = source.name(), prefix = cell.prefix, "decoding");
        source.collect(artifacts, cell, &mut metrics);
    }
    metrics
}

// FETCH + DECODE ONE ARTIFACT, LOGGING (NOT RAISING) WHY IT FAILED
pub(crate) fn decode<T>(
    artifacts: &dyn ArtifactReader,
    file: &str,
    parse: impl FnOnce(&str) -> Result<T, ParseError>,
) -> Option<T> {
    let result = match artifacts.read(file) {
        Some(text) => parse(&text),
        None => Err(ParseError::Empty),
    };
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            debug!(file, error = %e, "telemetry unavailable");
            None
        }
    }
}

// "1,234,567" -> 1234567
pub(crate) fn parse_grouped(field: &'static str, raw: &str) -> Result<u64, ParseError> {
    raw.replace(',', "")
        .parse()
        .map_err(|_| ParseError::bad_number(field, raw))
}
