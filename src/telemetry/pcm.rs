// MEMORY BANDWIDTH TRACE (pcm-memory CSV)
// OPTIONAL ARTIFACT: ONLY PRESENT WHEN PCM RAN ON THE HOST.

use super::{decode, ArtifactReader, Cell, SystemMetrics, TelemetrySource};
use crate::error::ParseError;

pub const SYSTEM_READ: &str = "System Read";

/// Mean of the first column whose header contains "System Read".
pub fn parse_pcm_memory(text: &str) -> Result<f64, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    // ROWS CAN BE SHORT WHEN PCM IS KILLED MID-WRITE
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    let idx = reader
        .headers()
        .map_err(|_| ParseError::MissingColumn(SYSTEM_READ))?
        .iter()
        .position(|col| col.contains(SYSTEM_READ))
        .ok_or(ParseError::MissingColumn(SYSTEM_READ))?;

    let (sum, count) = reader
        .records()
        .filter_map(|record| record.ok())
        .filter_map(|record| record.get(idx).and_then(|v| v.trim().parse::<f64>().ok()))
        .fold((0.0, 0u64), |(s, n), v| (s + v, n + 1));

    if count == 0 {
        return Err(ParseError::NoRows(SYSTEM_READ));
    }
    Ok(sum / count as f64)
}

/// `{prefix}_pcm_memory.csv`
pub struct PcmMemory;

impl TelemetrySource for PcmMemory {
    fn name(&self) -> &'static str {
        "pcm-memory"
    }

    fn collect(&self, artifacts: &dyn ArtifactReader, cell: &Cell<'_>, out: &mut SystemMetrics) {
        out.memory_read_mb_sec_pcm =
            decode(artifacts, &cell.artifact("pcm_memory.csv"), parse_pcm_memory);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_system_read_column() {
        let csv = "\
Date,Time,SKT0 Mem Read (MB/s),SKT0 Mem Write (MB/s),\
System Read Throughput(MB/s),System Write Throughput(MB/s)
2026-01-01,10:00:00.1,100.0,50.0,1000.5,400.0
2026-01-01,10:00:01.1,120.0,60.0,2000.5,500.0
2026-01-01,10:00:02.1,110.0,55.0,N/A,450.0
";
        assert_eq!(parse_pcm_memory(csv), Ok(1500.5));
    }

    #[test]
    fn missing_column() {
        assert_eq!(
            parse_pcm_memory("Time,Read\n1,2\n"),
            Err(ParseError::MissingColumn(SYSTEM_READ))
        );
    }

    #[test]
    fn header_only_or_empty() {
        assert_eq!(parse_pcm_memory(""), Err(ParseError::Empty));
        assert_eq!(
            parse_pcm_memory("System Read\n"),
            Err(ParseError::NoRows(SYSTEM_READ))
        );
    }

    #[test]
    fn short_rows_skipped() {
        assert_eq!(parse_pcm_memory("a,System Read\n1\n2,30\n3,50\n"), Ok(40.0));
    }

    #[test]
    fn quoted_fields() {
        let csv = "\"Time\",\"System Read Throughput(MB/s)\"\n\"1\",\"300\"\n\"2\",\"500\"\n";
        assert_eq!(parse_pcm_memory(csv), Ok(400.0));
    }

    #[test]
    fn quoted_comma_does_not_shift_columns() {
        let csv = "\
\"Date, local\",System Read Throughput(MB/s)
\"2026-01-01, 10:00\",100
\"2026-01-01, 10:01\",300
";
        assert_eq!(parse_pcm_memory(csv), Ok(200.0));
    }
}
