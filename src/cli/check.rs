use std::path::Path;
use std::process::Command;

use anyhow::{bail, Result};

use benchrig::config::{BenchConfig, SERVER_BINARY};
use benchrig::remote::RemoteExec;

fn check_tool(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn report(label: &str, ok: bool) -> bool {
    println!("  {:<32}{}", label, if ok { "OK" } else { "MISSING" });
    ok
}

pub fn run_check<G: RemoteExec>(config: &BenchConfig, gateway: &G) -> Result<()> {
    println!("BENCHRIG PREFLIGHT CHECK");
    println!();

    let mut ok = true;
    println!("LOCAL:");
    for tool in ["ssh", "scp"] {
        ok &= report(tool, check_tool(tool));
    }
    let local_files: [&Path; 3] = [
        config.load_binary.as_path(),
        Path::new(&config.load_script),
        config.collector_script.as_path(),
    ];
    for path in local_files {
        ok &= report(&path.display().to_string(), path.exists());
    }
    println!();

    println!("REMOTE ({}):", config.destination());
    let reachable = gateway.execute("true").success();
    ok &= report("ssh", reachable);
    if reachable {
        let server = config.remote_path(SERVER_BINARY);
        ok &= report(&server, gateway.execute(&format!("test -x {}", server)).success());
        for tool in ["taskset", "pkill", "pgrep"] {
            ok &= report(tool, gateway.execute(&format!("which {}", tool)).success());
        }
    }
    println!();

    if !ok {
        bail!("SOME CHECKS FAILED");
    }
    println!("ALL CHECKS PASSED");
    Ok(())
}
