// LOAD GENERATOR OUTPUT DECODER (wrk)
// FOUR INDEPENDENT FIELDS SCRAPED FROM FREE TEXT. ANY OF THEM MAY BE MISSING.

use std::sync::LazyLock;

use regex::Regex;

pub const NO_ERRORS: &str = "None";

static REQ_SEC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Requests/sec:\s+(\d+\.\d+)").unwrap());
static TRANSFER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Transfer/sec:\s+(\d+\.\d+)(\w+)").unwrap());
static LATENCY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Latency\s+(\d+\.\d+)(\w+)").unwrap());
static SOCKET_ERRORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Socket errors:\s+(.+)").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct LoadResult {
    pub throughput_req_sec: Option<f64>,
    pub throughput_bandwidth_mb_sec: Option<f64>,
    pub latency_avg_ms: Option<f64>,
    pub errors: String,
}

impl Default for LoadResult {
    fn default() -> Self {
        Self {
            throughput_req_sec: None,
            throughput_bandwidth_mb_sec: None,
            latency_avg_ms: None,
            errors: NO_ERRORS.to_string(),
        }
    }
}

pub fn parse_load_output(output: &str) -> LoadResult {
    let throughput_req_sec = REQ_SEC
        .captures(output)
        .and_then(|c| c[1].parse::<f64>().ok());

    let throughput_bandwidth_mb_sec = TRANSFER.captures(output).and_then(|c| {
        let v = c[1].parse::<f64>().ok()?;
        Some(to_mb(v, &c[2]))
    });

    let latency_avg_ms = LATENCY.captures(output).and_then(|c| {
        let v = c[1].parse::<f64>().ok()?;
        Some(to_ms(v, &c[2]))
    });

    let errors = SOCKET_ERRORS
        .captures(output)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_else(|| NO_ERRORS.to_string());

    LoadResult {
        throughput_req_sec,
        throughput_bandwidth_mb_sec,
        latency_avg_ms,
        errors,
    }
}

// UNKNOWN UNITS PASS THROUGH (MB IS ALREADY THE TARGET)
pub fn to_mb(value: f64, unit: &str) -> f64 {
    match unit {
        "B" => value / (1024.0 * 1024.0),
        "KB" => value / 1024.0,
        "GB" => value * 1024.0,
        _ => value,
    }
}

pub fn to_ms(value: f64, unit: &str) -> f64 {
    match unit {
        "us" => value / 1000.0,
        "s" => value * 1000.0,
        _ => value,
    }
}
