mod cli;
mod console;
mod error_fmt;
mod logging;
mod render;
mod run;
mod target;

use clap::Parser;
use cli::{Cli, Commands, JSON_MODE};
use eyre::WrapErr;
use pidpanel_config::Config;
use pidpanel_core::{PanelError, RefreshScheduler};
use pidpanel_hardware::SIM_PORT;
use render::{ConsoleMetrics, ConsolePlot};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = real_main(cli) {
        let json = JSON_MODE.get().copied().unwrap_or(false);
        tracing::error!(error = %e, "fatal");
        if json {
            println!("{}", error_fmt::format_error_json(&e));
        } else {
            eprintln!("{}", error_fmt::humanize(&e));
        }
        std::process::exit(error_fmt::exit_code_for_error(&e));
    }
}

/// Read, parse and validate the config. Parse errors keep their TOML type.
fn load_config(path: Option<&Path>) -> eyre::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = pidpanel_config::load_toml(&text)
        .wrap_err_with(|| format!("parse config {}", path.display()))?;
    cfg.validate()
        .map_err(|e| eyre::Report::new(PanelError::Config(e.to_string())))?;
    Ok(cfg)
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    logging::init(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    tracing::debug!(config = ?cli.config, "configuration loaded");

    match &cli.cmd {
        Commands::Ports { sim } => {
            let ports = target::opener(&cfg, *sim).list_ports();
            if cli.json {
                println!("{}", serde_json::json!({ "type": "ports", "ports": ports }));
            } else if ports.is_empty() {
                println!("No ports available");
            } else {
                for p in ports {
                    println!("{p}");
                }
            }
            Ok(())
        }
        Commands::Run(args) => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&shutdown);
            ctrlc::set_handler(move || {
                flag.store(true, Ordering::SeqCst);
            })?;
            run::run(&cfg, args, cli.json, &shutdown).map(|_| ())
        }
        Commands::Console { target } => {
            let (opener, port) = target::resolve(&cfg, target);
            let session = Arc::new(run::build_session(&cfg, opener, None)?);
            // Runs for the whole console lifetime, idle or not.
            let scheduler = RefreshScheduler::spawn(
                Arc::clone(&session),
                session.refresh_period(),
                ConsolePlot::stdout(cli.json),
                ConsoleMetrics::stdout(cli.json),
            )
            .wrap_err("failed to start refresh thread")?;
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            let res = console::run_console(
                &session,
                stdin.lock(),
                &mut stdout,
                port.as_deref(),
                cli.json,
            );
            scheduler.stop();
            res.wrap_err("console I/O failed")
        }
        Commands::SelfCheck { sim } => self_check(&cfg, *sim, cli.json),
    }
}

/// Config is already validated by the time we get here; with `sim` also
/// drive the simulated controller briefly and require telemetry.
fn self_check(cfg: &Config, sim: bool, json: bool) -> eyre::Result<()> {
    let mut samples = None;
    if sim {
        let session = run::build_session(cfg, target::opener(cfg, true), None)?;
        session.connect(SIM_PORT)?;
        session.set_rpm(100.0);
        session.start()?;
        let deadline = Instant::now() + Duration::from_secs(3);
        while session.snapshot().len() < 5 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        let n = session.snapshot().len();
        session.stop();
        session.disconnect();
        if n < 5 {
            return Err(eyre::Report::new(PanelError::Timeout))
                .wrap_err(format!("simulated controller produced {n} samples"));
        }
        samples = Some(n);
    }
    if json {
        println!(
            "{}",
            serde_json::json!({ "type": "self_check", "ok": true, "sim_samples": samples })
        );
    } else {
        match samples {
            Some(n) => println!("self-check ok (config valid, simulated run: {n} samples)"),
            None => println!("self-check ok (config valid)"),
        }
    }
    Ok(())
}
