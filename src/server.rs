// BENCHRIG REMOTE PROCESS CONTROLLER
// START / STOP / PROBE THE SERVER UNDER TEST. ONE INSTANCE AT A TIME.
// A SERVER THAT FAILS TO COME UP IS A WARNING, NOT AN ABORT: THE CELL STILL
// PRODUCES A RECORD, IT JUST REFLECTS A DEAD SERVER.

use std::thread::sleep;

use tracing::{info, warn};

use crate::config::{BenchConfig, SERVER_BINARY, SERVER_LOG};
use crate::remote::RemoteExec;

pub struct ServerController<'a, G: RemoteExec> {
    gateway: &'a G,
    config: &'a BenchConfig,
    // LOCAL SIDE OF THE DETACHED LAUNCH; DROPPED ON STOP
    handle: Option<G::Task>,
}

impl<'a, G: RemoteExec> ServerController<'a, G> {
    pub fn new(gateway: &'a G, config: &'a BenchConfig) -> Self {
        Self {
            gateway,
            config,
            handle: None,
        }
    }

    pub fn launch_command(&self, flags: &str) -> String {
        let cmd = format!(
            "cd {} && taskset -c {} ./{} {} {}",
            self.config.server_dir,
            self.config.server_core,
            SERVER_BINARY,
            self.config.server_port,
            flags,
        );
        format!("{} > {} 2>&1", cmd.trim_end(), SERVER_LOG)
    }

    /// Kill any prior instance, launch a fresh one, probe it. Returns liveness.
    pub fn start(&mut self, flags: &str) -> bool {
        self.kill();
        sleep(self.config.settle);

        let cmd = self.launch_command(flags);
        info!(command = %cmd, "Starting server");
        self.handle = Some(self.gateway.execute_background(&cmd));

        sleep(self.config.grace);
        let alive = self.is_alive();
        if !alive {
            warn!("Server process not found immediately after start");
        }
        alive
    }

    /// Forceful terminate. Succeeds whether or not a server was running.
    pub fn stop(&mut self) {
        self.kill();
        drop(self.handle.take());
    }

    pub fn is_alive(&self) -> bool {
        let probe = self.gateway.execute(&format!("pgrep -x {}", SERVER_BINARY));
        !probe.stdout.trim().is_empty()
    }

    // pkill EXITS 1 WHEN NOTHING MATCHED; THAT IS FINE
    fn kill(&self) {
        self.gateway
            .execute(&format!("pkill -9 -x {}", SERVER_BINARY));
    }
}
