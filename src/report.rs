// BENCHRIG END-OF-RUN TABLE
// FIXED-WIDTH DUMP OF EVERY COMPLETED CELL. NO AGGREGATION: THE CSV IS THE DATA.

use crate::record::RunRecord;

pub fn render(records: &[RunRecord]) -> Vec<String> {
    let mut out = Vec::with_capacity(records.len() + 4);
    if records.is_empty() {
        out.push("NO CELLS COMPLETED".to_string());
        return out;
    }

    let width = records
        .iter()
        .map(|r| r.config.len())
        .max()
        .unwrap_or(0)
        .max("CONFIG".len());

    out.push(format!(
        "{:<width$} {:>6} {:>12} {:>10} {:>10} {:>8} {:>8}  {}",
        "CONFIG", "CONNS", "REQ/S", "MB/S", "LAT_MS", "CPU_SYS", "DISK%", "ERRORS",
    ));
    out.push("-".repeat(width + 70));
    for r in records {
        out.push(format!(
            "{:<width$} {:>6} {:>12.2} {:>10.2} {:>10.3} {:>7.1}% {:>7.1}%  {}",
            r.config,
            r.connections,
            r.throughput_req_sec,
            r.throughput_bandwidth_mb_sec,
            r.latency_avg_ms,
            r.cpu0_system_percent,
            r.disk_utilization_percent,
            r.errors,
        ));
    }
    out.push(format!("TOTAL CELLS: {}", records.len()));
    out
}

pub fn print(records: &[RunRecord]) {
    println!("\n{}", "=".repeat(50));
    println!("BENCHRIG RESULTS");
    println!("{}", "=".repeat(50));
    for line in render(records) {
        println!("{}", line);
    }
}
