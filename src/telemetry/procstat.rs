// KERNEL ACCOUNTING SNAPSHOTS (/proc/stat)
// BEFORE/AFTER PAIR -> CONTEXT-SWITCH DELTA + PER-FIELD TICK SHARE OF ONE CORE.

use super::{decode, ArtifactReader, Cell, SystemMetrics, TelemetrySource};
use crate::error::ParseError;

/// Cumulative tick counters of one logical core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuSample {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    // SUM OF EVERY COLUMN ON THE LINE, GUEST COLUMNS INCLUDED
    pub total: u64,
}

/// Share of the window's ticks per field, 0..=100.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuPercent {
    pub user: f64,
    pub system: f64,
    pub softirq: f64,
    pub iowait: f64,
    pub idle: f64,
}

impl CpuSample {
    /// Parse the numeric tail of a `cpuN ...` line.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let fields = line
            .split_whitespace()
            .skip(1)
            .map(|s| s.parse::<u64>().map_err(|_| ParseError::bad_number("cpu ticks", s)))
            .collect::<Result<Vec<u64>, _>>()?;
        if fields.len() < 7 {
            return Err(ParseError::MissingLine("cpu tick columns"));
        }
        Ok(Self {
            user: fields[0],
            nice: fields[1],
            system: fields[2],
            idle: fields[3],
            iowait: fields[4],
            irq: fields[5],
            softirq: fields[6],
            steal: fields.get(7).copied().unwrap_or(0),
            total: fields.iter().sum(),
        })
    }

    /// Percentages over `self -> end`. A non-positive tick window gives all zeros.
    pub fn percent_until(&self, end: &CpuSample) -> CpuPercent {
        let diff_total = end.total as i128 - self.total as i128;
        if diff_total <= 0 {
            return CpuPercent::default();
        }
        let pct = |a: u64, b: u64| b.saturating_sub(a) as f64 / diff_total as f64 * 100.0;
        CpuPercent {
            user: pct(self.user, end.user),
            system: pct(self.system, end.system),
            softirq: pct(self.softirq, end.softirq),
            iowait: pct(self.iowait, end.iowait),
            idle: pct(self.idle, end.idle),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcStatSnapshot {
    pub ctxt: Option<u64>,
    pub cpu: Option<CpuSample>,
}

pub fn parse_proc_stat(text: &str, core: u32) -> Result<ProcStatSnapshot, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    let cpu_label = format!("cpu{} ", core);
    let mut snap = ProcStatSnapshot::default();
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("ctxt ") {
            snap.ctxt = rest.trim().parse().ok();
        }
        if line.starts_with(&cpu_label) {
            snap.cpu = CpuSample::parse(line).ok();
        }
    }
    Ok(snap)
}

/// `{prefix}_stat_start.txt` / `{prefix}_stat_end.txt`
pub struct ProcStat;

impl TelemetrySource for ProcStat {
    fn name(&self) -> &'static str {
        "procstat"
    }

    fn collect(&self, artifacts: &dyn ArtifactReader, cell: &Cell<'_>, out: &mut SystemMetrics) {
        let parse = |t: &str| parse_proc_stat(t, cell.core);
        let start = decode(artifacts, &cell.artifact("stat_start.txt"), parse);
        let end = decode(artifacts, &cell.artifact("stat_end.txt"), parse);
        let (Some(start), Some(end)) = (start, end) else {
            return;
        };

        if let (Some(a), Some(b)) = (start.ctxt, end.ctxt) {
            out.context_switches = Some(b as i64 - a as i64);
        }
        if let (Some(a), Some(b)) = (start.cpu, end.cpu) {
            out.cpu = Some(a.percent_until(&b));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::fixtures::MapArtifacts;
    use std::time::Duration;

    const STAT_START: &str = "\
cpu  4705 356 584 3699176 23060 0 277 0 0 0
cpu0 1393 280 170 912066 6144 0 112 0 0 0
cpu1 1100 20 130 929000 5000 0 50 0 0 0
intr 114930548 113199788 3 0 5 263 0 4 [... lots more numbers ...]
ctxt 1990473
btime 1062191376
processes 2915
";

    const STAT_END: &str = "\
cpu  5705 356 884 3700176 23160 0 577 0 0 0
cpu0 2093 280 370 912266 6244 0 412 0 0 0
cpu1 1400 20 230 929500 5000 0 50 0 0 0
ctxt 1995473
";

    #[test]
    fn snapshot_fields() {
        let s = parse_proc_stat(STAT_START, 0).unwrap();
        assert_eq!(s.ctxt, Some(1_990_473));
        let cpu = s.cpu.unwrap();
        assert_eq!(cpu.user, 1393);
        assert_eq!(cpu.softirq, 112);
        assert_eq!(cpu.steal, 0);
        assert_eq!(cpu.total, 1393 + 280 + 170 + 912066 + 6144 + 112);
    }

    #[test]
    fn other_core_selected() {
        let s = parse_proc_stat(STAT_START, 1).unwrap();
        assert_eq!(s.cpu.unwrap().user, 1100);
        // "cpu1" MUST NOT MATCH "cpu10"
        let s = parse_proc_stat("cpu10 1 1 1 1 1 1 1 1\n", 1).unwrap();
        assert_eq!(s.cpu, None);
    }

    #[test]
    fn percentages_over_window() {
        let a = parse_proc_stat(STAT_START, 0).unwrap().cpu.unwrap();
        let b = parse_proc_stat(STAT_END, 0).unwrap().cpu.unwrap();
        // DELTAS: user 700, system 200, idle 200, iowait 100, softirq 300 -> 1500
        let p = a.percent_until(&b);
        assert!((p.user - 700.0 / 15.0).abs() < 1e-9);
        assert!((p.system - 200.0 / 15.0).abs() < 1e-9);
        assert!((p.idle - 200.0 / 15.0).abs() < 1e-9);
        assert!((p.iowait - 100.0 / 15.0).abs() < 1e-9);
        assert!((p.softirq - 20.0).abs() < 1e-9);
        let sum = p.user + p.system + p.idle + p.iowait + p.softirq;
        assert!(sum <= 100.0 + 1e-9);
    }

    #[test]
    fn percentages_bounded_for_monotonic_samples() {
        let a = CpuSample::parse("cpu0 10 5 10 100 3 1 2 4").unwrap();
        for step in [1u64, 7, 50, 1000] {
            let b = CpuSample::parse(&format!(
                "cpu0 {} {} {} {} {} {} {} {}",
                10 + step, 5 + step / 2, 10 + step * 3, 100 + step, 3, 1 + step, 2 + step, 4
            ))
            .unwrap();
            let p = a.percent_until(&b);
            for v in [p.user, p.system, p.softirq, p.iowait, p.idle] {
                assert!((0.0..=100.0).contains(&v));
            }
            assert!(p.user + p.system + p.softirq + p.iowait + p.idle <= 100.0 + 1e-9);
        }
    }

    #[test]
    fn counter_reset_zeroes_percentages() {
        let a = CpuSample::parse("cpu0 100 0 100 1000 0 0 0 0").unwrap();
        let b = CpuSample::parse("cpu0 10 0 10 100 0 0 0 0").unwrap();
        assert_eq!(a.percent_until(&b), CpuPercent::default());
        // EQUAL TOTALS TOO
        assert_eq!(a.percent_until(&a), CpuPercent::default());
    }

    #[test]
    fn short_or_bad_lines_rejected() {
        assert!(CpuSample::parse("cpu0 1 2 3").is_err());
        assert!(CpuSample::parse("cpu0 1 2 3 x 5 6 7").is_err());
        // OLD KERNELS: NO STEAL COLUMN
        assert_eq!(CpuSample::parse("cpu0 1 2 3 4 5 6 7").unwrap().steal, 0);
    }

    #[test]
    fn source_fills_metrics() {
        let artifacts = MapArtifacts::default()
            .with("p_stat_start.txt", STAT_START)
            .with("p_stat_end.txt", STAT_END);
        let cell = Cell { prefix: "p", duration: Duration::from_secs(20), core: 0 };
        let mut m = SystemMetrics::default();
        ProcStat.collect(&artifacts, &cell, &mut m);
        assert_eq!(m.context_switches, Some(5000));
        assert!((m.cpu.unwrap().softirq - 20.0).abs() < 1e-9);
    }

    #[test]
    fn missing_end_snapshot() {
        let artifacts = MapArtifacts::default().with("p_stat_start.txt", STAT_START);
        let cell = Cell { prefix: "p", duration: Duration::from_secs(20), core: 0 };
        let mut m = SystemMetrics::default();
        ProcStat.collect(&artifacts, &cell, &mut m);
        assert_eq!(m.context_switches, None);
        assert_eq!(m.cpu, None);
    }
}
