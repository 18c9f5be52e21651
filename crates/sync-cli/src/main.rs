mod cli;

use std::process::ExitCode;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use cli::Cli;
use sync_core::{ChangeMode, Engine, EngineConfig};

fn main() -> ExitCode {
    color_eyre::install().ok();
    env_logger::init();

    let cli = Cli::parse();

    let mode = match cli.mode.parse::<ChangeMode>() {
        Ok(mode) => mode,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    };

    let config = EngineConfig::new(&cli.source, &cli.dest)
        .with_mode(mode)
        .with_workers(cli.workers)
        .with_adaptive(cli.adaptive);

    let engine = match Engine::new(config) {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    };

    if let Some(log_file) = &cli.log_file {
        if let Err(err) = engine.enable_file_log(log_file) {
            eprintln!("warning: could not enable debug log: {err}");
        }
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );

    spinner.set_message("analyzing...");
    if let Err(err) = engine.analyze() {
        spinner.finish_and_clear();
        eprintln!("analyze failed: {err}");
        return ExitCode::from(1);
    }

    let planned = engine.status();
    spinner.set_message(format!(
        "syncing {} file(s), {} already up to date",
        planned.total_files, planned.already_synced_files
    ));

    let sync_result = engine.sync();
    spinner.finish_and_clear();

    let final_status = engine.status();
    println!(
        "{:?}: {} copied, {} failed, {} cancelled, bottleneck={}",
        final_status.phase,
        final_status.processed_files,
        final_status.failed_files,
        final_status.cancelled_files,
        final_status.bottleneck,
    );

    match sync_result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("sync failed: {err}");
            ExitCode::from(1)
        }
    }
}
