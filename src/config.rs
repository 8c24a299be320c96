// BENCHRIG CONFIGURATION
// ONE IMMUTABLE STRUCT, BUILT ONCE IN main(), PASSED BY REFERENCE EVERYWHERE.
// DEFAULTS LIVE HERE AS CONSTANTS. THE ONLY RUNTIME KNOB IS --dry-run.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

// REMOTE HOST

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_USER: &str = "ricky";
pub const DEFAULT_SERVER_DIR: &str = "/home/ricky/Desktop/6-spring-2026-5/simple-webserver";
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const SERVER_BINARY: &str = "server";
pub const SERVER_LOG: &str = "server.log";
pub const SERVER_CORE: u32 = 0;                // SERVER PINNED HERE, CPU LINE PARSED FOR THIS CORE

// COLLABORATORS

pub const COLLECTOR_SCRIPT: &str = "metrics_collector.sh";
pub const LOAD_BINARY: &str = "./wrk";
pub const LOAD_SCRIPT: &str = "load_urls.lua";
pub const RESULTS_FILE: &str = "results.csv";

// TIMING

pub const DURATION_SECS: u64 = 20;            // ONE LOAD RUN
pub const DRY_RUN_DURATION_SECS: u64 = 5;
pub const WINDOW_BUFFER_SECS: u64 = 5;        // COLLECTOR WINDOW = DURATION + BUFFER
pub const COOLDOWN_SECS: u64 = 5;             // BETWEEN SETUPS
pub const SETTLE_SECS: u64 = 5;               // AFTER KILLING A PRIOR SERVER
pub const GRACE_SECS: u64 = 1;                // BEFORE THE LIVENESS PROBE

// LOAD SHAPE

pub const CORE_BUDGET: u32 = 4;               // MAX LOAD GENERATOR THREADS
pub const CONCURRENCY_LEVELS: [u32; 3] = [1, 5, 10];
pub const DRY_RUN_CONCURRENCY: u32 = 1;

/// One server startup variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub name: String,
    pub flags: String,
}

impl Configuration {
    pub fn new(name: impl Into<String>, flags: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: flags.into(),
        }
    }
}

pub fn default_configurations() -> Vec<Configuration> {
    vec![
        Configuration::new("RW_PageCache", ""),
        Configuration::new("RW_NoPageCache", "--disable-page-cache"),
        Configuration::new("Sendfile_PageCache", "--use-sendfile"),
        Configuration::new("Sendfile_NoPageCache", "--use-sendfile --disable-page-cache"),
    ]
}

/// One measurement cell. The prefix namespaces every remote artifact of the cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunKey {
    pub config: Configuration,
    pub concurrency: u32,
}

impl RunKey {
    pub fn new(config: &Configuration, concurrency: u32) -> Self {
        Self {
            config: config.clone(),
            concurrency,
        }
    }

    pub fn prefix(&self) -> String {
        format!("metrics_{}_{}", self.config.name, self.concurrency)
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | Conns: {}", self.config.name, self.concurrency)
    }
}

#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub host: String,
    pub user: String,
    pub server_dir: String,
    pub server_port: u16,
    pub server_core: u32,
    pub collector_script: PathBuf,
    pub load_binary: PathBuf,
    pub load_script: String,
    pub results_file: PathBuf,
    pub duration: Duration,
    pub window_buffer: Duration,
    pub cooldown: Duration,
    pub settle: Duration,
    pub grace: Duration,
    pub core_budget: u32,
    pub concurrency_levels: Vec<u32>,
    pub configurations: Vec<Configuration>,
    pub dry_run: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            user: DEFAULT_USER.to_string(),
            server_dir: DEFAULT_SERVER_DIR.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            server_core: SERVER_CORE,
            collector_script: PathBuf::from(COLLECTOR_SCRIPT),
            load_binary: PathBuf::from(LOAD_BINARY),
            load_script: LOAD_SCRIPT.to_string(),
            results_file: PathBuf::from(RESULTS_FILE),
            duration: Duration::from_secs(DURATION_SECS),
            window_buffer: Duration::from_secs(WINDOW_BUFFER_SECS),
            cooldown: Duration::from_secs(COOLDOWN_SECS),
            settle: Duration::from_secs(SETTLE_SECS),
            grace: Duration::from_secs(GRACE_SECS),
            core_budget: CORE_BUDGET,
            concurrency_levels: CONCURRENCY_LEVELS.to_vec(),
            configurations: default_configurations(),
            dry_run: false,
        }
    }
}

impl BenchConfig {
    /// Shrink the matrix to one low concurrency level and a short run.
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self.concurrency_levels = vec![DRY_RUN_CONCURRENCY];
        self.duration = Duration::from_secs(DRY_RUN_DURATION_SECS);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.user.trim().is_empty() {
            return Err(ConfigError::EmptyUser);
        }
        if self.configurations.is_empty() {
            return Err(ConfigError::NoConfigurations);
        }
        let mut seen = HashSet::new();
        for c in &self.configurations {
            // NAME ENDS UP IN REMOTE FILE NAMES AND SHELL COMMANDS
            if c.name.is_empty()
                || !c.name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
            {
                return Err(ConfigError::InvalidConfigurationName(c.name.clone()));
            }
            if !seen.insert(c.name.as_str()) {
                return Err(ConfigError::DuplicateConfiguration(c.name.clone()));
            }
        }
        if self.concurrency_levels.is_empty() {
            return Err(ConfigError::NoConcurrencyLevels);
        }
        if self.concurrency_levels.contains(&0) {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.duration.is_zero() {
            return Err(ConfigError::ZeroDuration);
        }
        if self.core_budget == 0 {
            return Err(ConfigError::ZeroCoreBudget);
        }
        Ok(())
    }

    /// `user@host` target for the transport.
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}/", self.host, self.server_port)
    }

    pub fn remote_path(&self, file: &str) -> String {
        format!("{}/{}", self.server_dir, file)
    }

    /// Collector window: long enough to enclose the whole load run.
    pub fn window(&self) -> Duration {
        self.duration + self.window_buffer
    }

    pub fn load_threads(&self, concurrency: u32) -> u32 {
        load_threads(concurrency, self.core_budget)
    }
}

// ONE THREAD PER CONNECTION, CAPPED AT THE CORE BUDGET
pub fn load_threads(concurrency: u32, core_budget: u32) -> u32 {
    if concurrency > 1 {
        concurrency.min(core_budget).max(1)
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = BenchConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.configurations.len(), 4);
        assert_eq!(cfg.concurrency_levels, vec![1, 5, 10]);
        assert_eq!(cfg.window(), Duration::from_secs(25));
    }

    #[test]
    fn dry_run_shrinks_matrix() {
        let cfg = BenchConfig::default().dry_run();
        assert!(cfg.dry_run);
        assert_eq!(cfg.concurrency_levels, vec![1]);
        assert_eq!(cfg.duration, Duration::from_secs(5));
        // CONFIGURATIONS ARE NOT TOUCHED
        assert_eq!(cfg.configurations.len(), 4);
    }

    #[test]
    fn run_key_prefix() {
        let key = RunKey::new(&Configuration::new("Sendfile_PageCache", "--use-sendfile"), 10);
        assert_eq!(key.prefix(), "metrics_Sendfile_PageCache_10");
        assert_eq!(key.to_string(), "Sendfile_PageCache | Conns: 10");
    }

    #[test]
    fn threads_capped_by_core_budget() {
        assert_eq!(load_threads(1, 4), 1);
        assert_eq!(load_threads(2, 4), 2);
        assert_eq!(load_threads(5, 4), 4);
        assert_eq!(load_threads(10, 4), 4);
    }

    #[test]
    fn urls_and_paths() {
        let cfg = BenchConfig::default();
        assert_eq!(cfg.base_url(), "http://127.0.0.1:8080/");
        assert!(cfg.remote_path("x.txt").ends_with("/simple-webserver/x.txt"));
        assert_eq!(cfg.destination(), "ricky@127.0.0.1");
    }

    #[test]
    fn validate_rejects_bad_matrix() {
        let mut cfg = BenchConfig::default();
        cfg.concurrency_levels = vec![1, 0];
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroConcurrency)));

        let mut cfg = BenchConfig::default();
        cfg.configurations.push(Configuration::new("RW_PageCache", "--x"));
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::DuplicateConfiguration(_))
        ));

        let mut cfg = BenchConfig::default();
        cfg.configurations = vec![Configuration::new("bad name", "")];
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidConfigurationName(_))
        ));

        let mut cfg = BenchConfig::default();
        cfg.duration = Duration::ZERO;
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroDuration)));
    }
}
