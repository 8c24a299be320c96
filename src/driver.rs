// BENCHRIG EXPERIMENT DRIVER
// SERIAL MATRIX WALK: ONE SERVER LIFECYCLE PER CONFIGURATION, ONE CELL PER
// CONCURRENCY LEVEL. NOTHING RUNS IN PARALLEL: EVERY CELL SHARES THE SAME
// PINNED CORE AND SERVER, SO OVERLAP WOULD POISON EVERY COUNTER.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::sleep;

use anyhow::Result;
use tracing::{info, warn};

use crate::config::{BenchConfig, RunKey, COLLECTOR_SCRIPT};
use crate::record::{RecordSink, RunRecord};
use crate::remote::RemoteExec;
use crate::server::ServerController;
use crate::telemetry::load::parse_load_output;
use crate::telemetry::{collect_all, default_sources, Cell, RemoteArtifacts, TelemetrySource};
use crate::window::{LoadGenerator, MeasurementWindow};

pub struct Experiment<'a, G: RemoteExec, L: LoadGenerator> {
    config: &'a BenchConfig,
    gateway: &'a G,
    load: &'a L,
    sources: Vec<Box<dyn TelemetrySource>>,
}

impl<'a, G: RemoteExec, L: LoadGenerator> Experiment<'a, G, L> {
    pub fn new(config: &'a BenchConfig, gateway: &'a G, load: &'a L) -> Self {
        Self {
            config,
            gateway,
            load,
            sources: default_sources(),
        }
    }

    pub fn with_sources(mut self, sources: Vec<Box<dyn TelemetrySource>>) -> Self {
        self.sources = sources;
        self
    }

    /// Push the collector script and make it executable. Failure is a warning:
    /// a stale copy may already be in place.
    pub fn deploy(&self) {
        let remote = self.config.remote_path(COLLECTOR_SCRIPT);
        info!(
            script = %self.config.collector_script.display(),
            remote = %remote,
            "Deploying collector"
        );
        if let Err(e) = self.gateway.push_file(&self.config.collector_script, &remote) {
            warn!(error = %e, "collector deploy failed, using whatever is on the host");
        }
        let chmod = self.gateway.execute(&format!("chmod +x {}", remote));
        if !chmod.success() {
            warn!(
                status = ?chmod.status,
                stderr = %chmod.stderr.trim(),
                "chmod on collector failed"
            );
        }
    }

    /// One cell against an already-running server.
    pub fn run_cell(&self, key: &RunKey) -> RunRecord {
        let window = MeasurementWindow::new(self.gateway, self.load, self.config);
        let output = window.measure(key);

        let load = parse_load_output(&output);
        let prefix = key.prefix();
        let cell = Cell {
            prefix: &prefix,
            duration: self.config.duration,
            core: self.config.server_core,
        };
        let artifacts = RemoteArtifacts::new(self.gateway, self.config);
        let sys = collect_all(&self.sources, &artifacts, &cell);

        RunRecord::normalize(key, &load, &sys)
    }

    /// Walk the whole matrix. Returns every record appended to `sink`.
    /// A set `shutdown` flag ends the walk after the current cell.
    pub fn run(&self, sink: &mut dyn RecordSink, shutdown: &AtomicBool) -> Result<Vec<RunRecord>> {
        let mut records = Vec::new();
        let mut server = ServerController::new(self.gateway, self.config);

        'configs: for conf in &self.config.configurations {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            server.start(&conf.flags);
            sleep(self.config.cooldown);

            for &c in &self.config.concurrency_levels {
                if shutdown.load(Ordering::Relaxed) {
                    server.stop();
                    break 'configs;
                }
                let key = RunKey::new(conf, c);
                info!("--- Running: {} ---", key);

                let record = self.run_cell(&key);
                if let Err(e) = sink.append(&record) {
                    server.stop();
                    return Err(e);
                }
                info!(record = ?record, "Result");
                records.push(record);
            }

            server.stop();
            sleep(self.config.cooldown);
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{quick_config, FakeLoad, FakeRemote};

    #[test]
    fn deploy_pushes_and_chmods() {
        let cfg = quick_config();
        let remote = FakeRemote::new();
        let load = FakeLoad::new(&remote, "");
        Experiment::new(&cfg, &remote, &load).deploy();
        let events = remote.events();
        assert_eq!(events[0], "push:metrics_collector.sh->/srv/web/metrics_collector.sh");
        assert_eq!(events[1], "exec:chmod +x /srv/web/metrics_collector.sh");
    }

    #[test]
    fn walks_matrix_in_order() {
        let cfg = quick_config();
        let remote = FakeRemote::new();
        let load = FakeLoad::new(&remote, "Requests/sec:   1000.00\n");
        let exp = Experiment::new(&cfg, &remote, &load);
        let mut sink: Vec<RunRecord> = Vec::new();
        let records = exp.run(&mut sink, &AtomicBool::new(false)).unwrap();

        let cells: Vec<(String, u32)> =
            records.iter().map(|r| (r.config.clone(), r.connections)).collect();
        assert_eq!(
            cells,
            vec![
                ("RW_PageCache".to_string(), 1),
                ("RW_PageCache".to_string(), 5),
                ("Sendfile_PageCache".to_string(), 1),
                ("Sendfile_PageCache".to_string(), 5),
            ]
        );
        assert_eq!(sink, records);
        assert!(records.iter().all(|r| r.throughput_req_sec == 1000.0 && r.errors == "None"));
    }

    #[test]
    fn one_server_launch_per_configuration() {
        let cfg = quick_config();
        let remote = FakeRemote::new();
        let load = FakeLoad::new(&remote, "");
        let exp = Experiment::new(&cfg, &remote, &load);
        exp.run(&mut Vec::<RunRecord>::new(), &AtomicBool::new(false)).unwrap();

        let events = remote.events();
        let spawned = |what: &str| {
            events
                .iter()
                .filter(|e| e.starts_with("spawn:") && e.contains(what))
                .count()
        };
        let launches = spawned("./server ");
        let collectors = spawned("metrics_collector.sh");
        assert_eq!(launches, 2);
        assert_eq!(collectors, 4);
        // LAST THING THE DRIVER DOES IS KILL THE SERVER
        assert_eq!(events.last().unwrap(), "exec:pkill -9 -x server");
    }

    #[test]
    fn artifacts_read_only_after_collector_joined() {
        let cfg = quick_config();
        let remote = FakeRemote::new();
        let load = FakeLoad::new(&remote, "");
        let exp = Experiment::new(&cfg, &remote, &load);
        let key = RunKey::new(&cfg.configurations[0], 1);
        exp.run_cell(&key);

        let events = remote.events();
        let join = events.iter().position(|e| e.starts_with("join:")).unwrap();
        let first_cat = events.iter().position(|e| e.starts_with("exec:cat ")).unwrap();
        assert!(join < first_cat);
    }

    #[test]
    fn shutdown_stops_before_first_cell() {
        let cfg = quick_config();
        let remote = FakeRemote::new();
        let load = FakeLoad::new(&remote, "");
        let exp = Experiment::new(&cfg, &remote, &load);
        let records = exp.run(&mut Vec::<RunRecord>::new(), &AtomicBool::new(true)).unwrap();
        assert!(records.is_empty());
        assert!(remote.events().is_empty());
    }

    #[test]
    fn no_sources_still_produces_records() {
        let cfg = quick_config();
        let remote = FakeRemote::new();
        let load = FakeLoad::new(&remote, "");
        let exp = Experiment::new(&cfg, &remote, &load).with_sources(Vec::new());
        let records = exp.run(&mut Vec::<RunRecord>::new(), &AtomicBool::new(false)).unwrap();
        assert_eq!(records.len(), 4);
        assert!(!remote.events().iter().any(|e| e.starts_with("exec:cat ")));
    }
}
