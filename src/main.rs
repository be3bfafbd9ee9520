//! depshift - Dependency update orchestrator CLI
//!
//! Updates dependencies through each project's own package manager commands,
//! validates them with system tests, and restores manifests and lock files
//! when an update or its validation fails.

use clap::Parser;
use depshift::cli::CliArgs;
use depshift::command::{cancel_pair, CommandRunner, ShellCommandRunner};
use depshift::config::{ProjectConfig, RunConfig};
use depshift::confirm::{AutoConfirm, Confirmer, StdinConfirmer};
use depshift::error::ExitError;
use depshift::orchestrator::Orchestrator;
use depshift::output::{create_formatter, OutputConfig};
use depshift::resolver::{CommandVersionSource, ManifestResolver};
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;
use std::sync::Arc;

/// Exit code for configuration errors
const CONFIG_ERROR_EXIT: u8 = 3;

/// Exit code for unexpected failures outside the run itself
const FAILURE_EXIT: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    depshift::logging::init(args.verbose);

    // Run the main logic and handle errors
    match run(args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {}", e);
            let code = e
                .downcast_ref::<ExitError>()
                .map(|e| e.code)
                .unwrap_or(FAILURE_EXIT);
            ExitCode::from(code)
        }
    }
}

/// Main application logic
async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    let run_config =
        RunConfig::from_cli(&args).map_err(|e| ExitError::new(CONFIG_ERROR_EXIT, e.to_string()))?;
    let config_path =
        ProjectConfig::locate(&run_config.working_dir, run_config.config_path.as_deref());
    let config = ProjectConfig::load(&config_path)
        .map_err(|e| ExitError::new(CONFIG_ERROR_EXIT, e.to_string()))?;

    // Print run info in verbose mode
    if args.verbose {
        eprintln!("depshift v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("Target: {}", run_config.working_dir.display());
        eprintln!("Config: {}", config_path.display());
        if run_config.dry_run {
            eprintln!("Mode: dry-run");
        }
    }

    // Ctrl-C cancels the in-flight command and skips the remaining units
    let (handle, cancel) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted, restoring the current unit...");
            handle.cancel();
        }
    });

    let runner: Arc<dyn CommandRunner> = Arc::new(ShellCommandRunner::new());
    let confirmer: Box<dyn Confirmer> = if args.yes {
        Box::new(AutoConfirm(true))
    } else {
        Box::new(StdinConfirmer)
    };
    let show_progress = !args.quiet && !args.structured_output() && io::stderr().is_terminal();

    let orchestrator = Orchestrator::new(
        run_config,
        config,
        Arc::new(ManifestResolver::new(runner.clone())),
        Arc::new(CommandVersionSource::new(runner.clone())),
        runner,
        confirmer,
    )
    .with_progress(show_progress);
    let result = orchestrator.run(&cancel).await;

    // Output results
    let formatter = create_formatter(OutputConfig::from_cli(args.output, args.verbose, args.quiet));
    let mut stdout = io::stdout().lock();
    formatter.format(&result.summary, &mut stdout)?;
    stdout.flush()?;

    if let Some(error) = &result.error {
        eprintln!("Error: {}", error);
    }

    Ok(ExitCode::from(result.exit_code()))
}
