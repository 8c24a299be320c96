// IN-MEMORY COLLABORATORS FOR TESTS
// FakeRemote PLAYS THE REMOTE HOST, FakeLoad PLAYS wrk. BOTH APPEND TO ONE
// SHARED EVENT LOG SO TESTS CAN ASSERT ON ORDERING ACROSS THEM.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;

use crate::config::{BenchConfig, Configuration};
use crate::remote::{BackgroundTask, CommandOutput, RemoteExec};
use crate::window::{LoadGenerator, LoadPlan};

type EventLog = Rc<RefCell<Vec<String>>>;

/// Zero sleeps, tiny matrix, fixed remote layout.
pub fn quick_config() -> BenchConfig {
    BenchConfig {
        host: "10.0.0.2".to_string(),
        user: "bench".to_string(),
        server_dir: "/srv/web".to_string(),
        duration: Duration::from_secs(1),
        window_buffer: Duration::from_secs(2),
        cooldown: Duration::ZERO,
        settle: Duration::ZERO,
        grace: Duration::ZERO,
        concurrency_levels: vec![1, 5],
        configurations: vec![
            Configuration::new("RW_PageCache", ""),
            Configuration::new("Sendfile_PageCache", "--use-sendfile"),
        ],
        ..BenchConfig::default()
    }
}

pub struct FakeRemote {
    events: EventLog,
    files: RefCell<HashMap<String, String>>,
    server_alive: Cell<bool>,
    server_starts: bool,
}

impl Default for FakeRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRemote {
    pub fn new() -> Self {
        Self {
            events: Rc::new(RefCell::new(Vec::new())),
            files: RefCell::new(HashMap::new()),
            server_alive: Cell::new(false),
            server_starts: true,
        }
    }

    /// Launches "succeed" but the liveness probe never finds a process.
    pub fn with_dead_server(mut self) -> Self {
        self.server_starts = false;
        self
    }

    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.add_file(path, content);
        self
    }

    pub fn add_file(&self, path: &str, content: &str) {
        self.files
            .borrow_mut()
            .insert(path.to_string(), content.to_string());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    fn log(&self, event: String) {
        self.events.borrow_mut().push(event);
    }
}

impl RemoteExec for FakeRemote {
    type Task = FakeTask;

    fn execute(&self, command: &str) -> CommandOutput {
        self.log(format!("exec:{}", command));
        if let Some(path) = command.strip_prefix("cat ") {
            return match self.files.borrow().get(path) {
                Some(content) => CommandOutput {
                    stdout: content.clone(),
                    stderr: String::new(),
                    status: Some(0),
                },
                None => CommandOutput {
                    stdout: String::new(),
                    stderr: format!("cat: {}: No such file or directory", path),
                    status: Some(1),
                },
            };
        }
        if command.starts_with("pkill ") {
            let was_alive = self.server_alive.replace(false);
            return CommandOutput {
                status: Some(if was_alive { 0 } else { 1 }),
                ..Default::default()
            };
        }
        if command.starts_with("pgrep ") {
            return if self.server_alive.get() {
                CommandOutput {
                    stdout: "4242\n".to_string(),
                    stderr: String::new(),
                    status: Some(0),
                }
            } else {
                CommandOutput {
                    status: Some(1),
                    ..Default::default()
                }
            };
        }
        CommandOutput {
            status: Some(0),
            ..Default::default()
        }
    }

    fn execute_background(&self, command: &str) -> FakeTask {
        self.log(format!("spawn:{}", command));
        if command.contains("./server ") && self.server_starts {
            self.server_alive.set(true);
        }
        FakeTask {
            events: Rc::clone(&self.events),
            command: command.to_string(),
        }
    }

    fn push_file(&self, local: &Path, remote: &str) -> Result<()> {
        self.log(format!("push:{}->{}", local.display(), remote));
        Ok(())
    }
}

pub struct FakeTask {
    events: EventLog,
    command: String,
}

impl BackgroundTask for FakeTask {
    fn wait(self) -> CommandOutput {
        self.events
            .borrow_mut()
            .push(format!("join:{}", self.command));
        CommandOutput {
            status: Some(0),
            ..Default::default()
        }
    }
}

/// Returns a canned stdout for every run.
pub struct FakeLoad {
    events: EventLog,
    output: String,
}

impl FakeLoad {
    pub fn new(remote: &FakeRemote, output: &str) -> Self {
        Self {
            events: Rc::clone(&remote.events),
            output: output.to_string(),
        }
    }
}

impl LoadGenerator for FakeLoad {
    fn run(&self, plan: &LoadPlan) -> String {
        self.events
            .borrow_mut()
            .push(format!("load:{}", plan.args().join(" ")));
        self.output.clone()
    }
}
