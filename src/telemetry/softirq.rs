// SOFT-INTERRUPT SNAPSHOTS (/proc/softirqs)
// EVERY COUNTER OF EVERY TYPE ON EVERY CORE SUMMED INTO ONE NUMBER PER SNAPSHOT.

use super::{decode, ArtifactReader, Cell, SystemMetrics, TelemetrySource};
use crate::error::ParseError;

pub fn parse_softirqs(text: &str) -> Result<u64, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    let total = text
        .lines()
        // HEADER ROW IS THE ONE NAMING THE CORES
        .filter(|line| line.contains(':') && !line.contains("CPU0"))
        .flat_map(|line| line.split_whitespace().skip(1))
        .filter(|tok| !tok.is_empty() && tok.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|tok| tok.parse::<u64>().ok())
        .sum();
    Ok(total)
}

/// `{prefix}_softirqs_start.txt` / `{prefix}_softirqs_end.txt`
pub struct SoftIrqs;

impl TelemetrySource for SoftIrqs {
    fn name(&self) -> &'static str {
        "softirqs"
    }

    fn collect(&self, artifacts: &dyn ArtifactReader, cell: &Cell<'_>, out: &mut SystemMetrics) {
        let start = decode(artifacts, &cell.artifact("softirqs_start.txt"), parse_softirqs);
        let end = decode(artifacts, &cell.artifact("softirqs_end.txt"), parse_softirqs);
        if let (Some(a), Some(b)) = (start, end) {
            out.softirqs = Some(b as i64 - a as i64);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOFTIRQS: &str = "\
                    CPU0       CPU1
          HI:          1          0
       TIMER:     100000      90000
      NET_TX:         12          3
      NET_RX:       5000       4000
       BLOCK:        700        300
    IRQ_POLL:          0          0
     TASKLET:         42          8
       SCHED:      80000      70000
     HRTIMER:          0          0
         RCU:      60000      50000
";

    #[test]
    fn sums_all_rows_and_columns() {
        let expected = 1 + 100000 + 90000 + 12 + 3 + 5000 + 4000 + 700 + 300 + 42 + 8
            + 80000 + 70000 + 60000 + 50000;
        assert_eq!(parse_softirqs(SOFTIRQS), Ok(expected));
    }

    #[test]
    fn header_with_colon_is_skipped() {
        assert_eq!(parse_softirqs("CPU0: 999 999\nNET_RX: 1 2\n"), Ok(3));
    }

    #[test]
    fn garbage_tokens_ignored() {
        assert_eq!(parse_softirqs("NET_RX: 10 n/a -5 20\n"), Ok(30));
        assert_eq!(parse_softirqs("no counters here\n"), Ok(0));
    }

    #[test]
    fn empty_is_error() {
        assert_eq!(parse_softirqs(""), Err(ParseError::Empty));
    }
}
