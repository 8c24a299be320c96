// BENCHRIG MEASUREMENT WINDOW
// ONE CELL: COLLECTOR STARTS -> LOAD RUNS (BLOCKING) -> COLLECTOR JOINED.
// THE COLLECTOR WINDOW IS duration + buffer SO ITS BEFORE/AFTER SNAPSHOTS
// ENCLOSE THE LOAD RUN. NO ARTIFACT IS READ BEFORE join() RETURNS.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use tracing::{info, warn};

use crate::config::{BenchConfig, RunKey, COLLECTOR_SCRIPT};
use crate::remote::{BackgroundTask, CommandOutput, RemoteExec};

/// Arguments for one load-generator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadPlan {
    pub threads: u32,
    pub connections: u32,
    pub duration: Duration,
    pub script: String,
    pub url: String,
}

impl LoadPlan {
    pub fn args(&self) -> Vec<String> {
        vec![
            "-t".to_string(),
            self.threads.to_string(),
            "-c".to_string(),
            self.connections.to_string(),
            "-d".to_string(),
            format!("{}s", self.duration.as_secs()),
            "-s".to_string(),
            self.script.clone(),
            "--latency".to_string(),
            self.url.clone(),
        ]
    }
}

pub trait LoadGenerator {
    /// Run to completion and return captured stdout. Empty on failure.
    fn run(&self, plan: &LoadPlan) -> String;
}

/// Local `wrk` process.
pub struct WrkLoadGenerator {
    binary: PathBuf,
}

impl WrkLoadGenerator {
    pub fn new(config: &BenchConfig) -> Self {
        Self {
            binary: config.load_binary.clone(),
        }
    }
}

impl LoadGenerator for WrkLoadGenerator {
    fn run(&self, plan: &LoadPlan) -> String {
        let args = plan.args();
        let command = format!("{} {}", self.binary.display(), args.join(" "));
        info!(command = %command, "Running load generator");
        match Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .output()
        {
            Ok(out) => {
                if !out.status.success() {
                    warn!(status = %out.status, "load generator exited non-zero");
                }
                String::from_utf8_lossy(&out.stdout).into_owned()
            }
            Err(e) => {
                warn!(
                    error = %e,
                    binary = %self.binary.display(),
                    "failed to run load generator"
                );
                String::new()
            }
        }
    }
}

pub struct MeasurementWindow<'a, G: RemoteExec, L: LoadGenerator> {
    gateway: &'a G,
    load: &'a L,
    config: &'a BenchConfig,
}

/// A running collector. The only way to get at its result is `join`.
pub struct OpenWindow<T: BackgroundTask> {
    task: T,
    prefix: String,
}

impl<T: BackgroundTask> OpenWindow<T> {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Block until the collector has written all of its artifacts.
    pub fn join(self) -> CommandOutput {
        let out = self.task.wait();
        if !out.success() {
            warn!(prefix = %self.prefix, status = ?out.status, "collector did not exit cleanly");
        }
        out
    }
}

impl<'a, G: RemoteExec, L: LoadGenerator> MeasurementWindow<'a, G, L> {
    pub fn new(gateway: &'a G, load: &'a L, config: &'a BenchConfig) -> Self {
        Self {
            gateway,
            load,
            config,
        }
    }

    pub fn collector_command(&self, key: &RunKey) -> String {
        format!(
            "cd {} && ./{} {} {}",
            self.config.server_dir,
            COLLECTOR_SCRIPT,
            self.config.window().as_secs(),
            key.prefix(),
        )
    }

    pub fn plan(&self, key: &RunKey) -> LoadPlan {
        LoadPlan {
            threads: self.config.load_threads(key.concurrency),
            connections: key.concurrency,
            duration: self.config.duration,
            script: self.config.load_script.clone(),
            url: self.config.base_url(),
        }
    }

    /// Start the collector. Must precede the load run.
    pub fn open(&self, key: &RunKey) -> OpenWindow<G::Task> {
        let cmd = self.collector_command(key);
        info!(command = %cmd, "Starting metrics");
        OpenWindow {
            task: self.gateway.execute_background(&cmd),
            prefix: key.prefix(),
        }
    }

    /// Full cell: open, load, join. Returns the load generator's stdout.
    pub fn measure(&self, key: &RunKey) -> String {
        let window = self.open(key);
        let output = self.load.run(&self.plan(key));
        window.join();
        output
    }
}
