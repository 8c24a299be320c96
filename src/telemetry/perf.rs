// HARDWARE COUNTER DUMP (perf stat)
// LINES LOOK LIKE "   1,234,567      LLC-load-misses   # ..."

use std::sync::LazyLock;

use regex::Regex;

use super::{decode, parse_grouped, ArtifactReader, Cell, SystemMetrics, TelemetrySource};
use crate::error::ParseError;

pub const LLC_LOAD_MISSES: &str = "LLC-load-misses";
pub const LONGEST_LAT_CACHE_MISS: &str = "longest_lat_cache.miss";
pub const NODE_LOADS: &str = "node-loads";
pub const LLC_LOADS: &str = "LLC-loads";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerfCounters {
    pub llc_misses: Option<u64>,
    pub longest_lat_cache_miss: Option<u64>,
    pub memory_reads: Option<u64>,
}

// NAME MUST END AT WHITESPACE OR EOL: "LLC-loads" MUST NOT HIT "LLC-load-misses"
static COUNTER_PATTERNS: LazyLock<[(&str, Regex); 4]> = LazyLock::new(|| {
    [LLC_LOAD_MISSES, LONGEST_LAT_CACHE_MISS, NODE_LOADS, LLC_LOADS].map(|name| {
        let re = format!(r"(\d[\d,]*)\s+{}(?:\s|$)", regex::escape(name));
        (name, Regex::new(&re).unwrap())
    })
});

/// Value of one named counter line. Only the counters above are known.
pub fn counter(text: &str, name: &'static str) -> Result<u64, ParseError> {
    let re = COUNTER_PATTERNS
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, re)| re)
        .ok_or(ParseError::MissingLine(name))?;
    let caps = re.captures(text).ok_or(ParseError::MissingLine(name))?;
    parse_grouped(name, &caps[1])
}

pub fn parse_perf(text: &str) -> Result<PerfCounters, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    let memory_reads = counter(text, NODE_LOADS)
        .or_else(|_| counter(text, LLC_LOADS))
        .ok();
    Ok(PerfCounters {
        llc_misses: counter(text, LLC_LOAD_MISSES).ok(),
        longest_lat_cache_miss: counter(text, LONGEST_LAT_CACHE_MISS).ok(),
        memory_reads,
    })
}

/// `{prefix}_perf.txt`
pub struct PerfStat;

impl TelemetrySource for PerfStat {
    fn name(&self) -> &'static str {
        "perf"
    }

    fn collect(&self, artifacts: &dyn ArtifactReader, cell: &Cell<'_>, out: &mut SystemMetrics) {
        if let Some(c) = decode(artifacts, &cell.artifact("perf.txt"), parse_perf) {
            out.llc_misses = c.llc_misses;
            out.longest_lat_cache_miss = c.longest_lat_cache_miss;
            out.memory_reads_perf = c.memory_reads;
        }
    }
}
