// BENCHRIG -- REMOTE WEB SERVER BENCHMARK DRIVER
// WALKS A FIXED MATRIX OF SERVER CONFIGURATIONS x CLIENT CONCURRENCY,
// RUNS wrk AGAINST EACH CELL WHILE THE HOST SNAPSHOTS ITS COUNTERS,
// AND WRITES ONE NORMALIZED CSV ROW PER CELL.

mod cli;

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;

use benchrig::config::BenchConfig;
use benchrig::driver::Experiment;
use benchrig::record::CsvSink;
use benchrig::remote::SshGateway;
use benchrig::report;
use benchrig::window::WrkLoadGenerator;

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

#[derive(Parser)]
#[command(name = "benchrig")]
#[command(about = "BENCHRIG -- REMOTE SERVER BENCHMARK + TELEMETRY NORMALIZER")]
struct Cli {
    // SHORT SMOKE TEST: ONE CONNECTION, 5S PER CELL
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Verify local tools and remote reachability, then exit
    Check,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = BenchConfig::default();
    if cli.dry_run {
        config = config.dry_run();
    }
    config.validate().context("invalid benchmark configuration")?;

    let gateway = SshGateway::new(&config);

    if let Some(Cmd::Check) = cli.command {
        return cli::check::run_check(&config, &gateway);
    }

    ctrlc::set_handler(move || {
        SHUTDOWN.store(true, Ordering::Relaxed);
    })?;

    println!("BENCHRIG");
    println!("TARGET:          {} (port {})", config.destination(), config.server_port);
    println!("SERVER DIR:      {}", config.server_dir);
    let names: Vec<&str> = config.configurations.iter().map(|c| c.name.as_str()).collect();
    println!("CONFIGURATIONS:  {}", names.join(", "));
    println!("CONNECTIONS:     {:?}", config.concurrency_levels);
    println!(
        "DURATION:        {}s (+{}s collector buffer)",
        config.duration.as_secs(),
        config.window_buffer.as_secs()
    );
    println!("RESULTS:         {}", config.results_file.display());
    if config.dry_run {
        println!("MODE:            DRY RUN");
    }
    println!();

    let mut sink = CsvSink::create(&config.results_file)?;
    let load = WrkLoadGenerator::new(&config);
    let experiment = Experiment::new(&config, &gateway, &load);

    experiment.deploy();
    let records = experiment.run(&mut sink, &SHUTDOWN)?;

    if SHUTDOWN.load(Ordering::Relaxed) {
        warn!(completed = records.len(), "interrupted, server stopped");
    }
    report::print(&records);
    println!("\nSAVED TO {}", config.results_file.display());
    Ok(())
}
