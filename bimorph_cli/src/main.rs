mod cli;
mod error_fmt;
mod logging;
mod run;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;

use crate::cli::{Cli, Commands, DEFAULT_CONFIG, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::run::MoveOutcome;

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error reporter: {e}");
    }

    if let Err(err) = run(cli) {
        tracing::error!(error = %format!("{err:#}"), "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

/// Read and validate the typed config. A missing default file means defaults.
fn load_config(path: Option<&Path>) -> eyre::Result<bimorph_config::Config> {
    let (path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG), false),
    };
    if !explicit && !path.exists() {
        let cfg = bimorph_config::Config::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let text = std::fs::read_to_string(&path)
        .wrap_err_with(|| format!("reading config {}", path.display()))?;
    let cfg: bimorph_config::Config = toml::from_str(&text)
        .wrap_err_with(|| format!("parsing config {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

fn run(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    logging::init(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    tracing::debug!(?cfg, "config loaded");

    match cli.cmd {
        Commands::Move {
            set,
            request,
            initial,
        } => {
            let request = run::build_request(set, request.as_deref())?;

            let shutdown = Arc::new(AtomicBool::new(false));
            {
                let flag = Arc::clone(&shutdown);
                ctrlc::set_handler(move || {
                    flag.store(true, Ordering::Relaxed);
                })
                .wrap_err("installing Ctrl-C handler")?;
            }

            let outcome = run::run_move(&cfg, &request, initial, shutdown)?;
            print_outcome(&outcome, cli.json);
            Ok(())
        }
        Commands::SelfCheck => {
            run::self_check(&cfg)?;
            if cli.json {
                println!("{}", serde_json::json!({ "status": "ok" }));
            } else {
                println!("self-check ok");
            }
            Ok(())
        }
    }
}

fn print_outcome(outcome: &MoveOutcome, json: bool) {
    if json {
        let channels: Vec<_> = outcome
            .readings
            .iter()
            .map(|r| {
                serde_json::json!({
                    "channel": r.channel.raw(),
                    "current": r.current,
                    "armed": r.armed,
                    "setpoint": r.setpoint,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::json!({
                "status": "converged",
                "writes": outcome.writes,
                "ramps": outcome.ramps,
                "elapsed_ms": outcome.elapsed.as_millis() as u64,
                "channels": channels,
            })
        );
        return;
    }

    println!(
        "move complete: {} channel(s), {} write(s), {} ramp(s) in {:.2}s",
        outcome.readings.len(),
        outcome.writes,
        outcome.ramps,
        outcome.elapsed.as_secs_f64()
    );
    for r in &outcome.readings {
        println!(
            "  {:<10} current {:>9.3} V  armed {:>9.3} V  setpoint {:>9.3} V",
            r.channel.to_string(),
            r.current,
            r.armed,
            r.setpoint
        );
    }
}
