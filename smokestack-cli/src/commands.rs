//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use anyhow::Context;
use smokestack_checks::lifecycle::StackController;
use smokestack_checks::registry::CheckContext;
use smokestack_checks::runner;
use smokestack_checks::suites::{Suite, run_suite};
use smokestack_core::config::{HarnessConfig, load_config};
use smokestack_core::error::LifecycleError;
use smokestack_core::probe::Probe;
use smokestack_core::report::{CheckOutcome, RunReport, TestRecord, TestStatus};
use std::path::Path;

/// Handle a CLI subcommand.
pub async fn handle_command(command: Commands, workspace: &Path) -> anyhow::Result<()> {
    match command {
        Commands::Up => handle_up(workspace).await,
        Commands::Down => handle_down(workspace).await,
        Commands::Gate => handle_suite(Suite::BootGate, workspace).await,
        Commands::Smoke => handle_suite(Suite::Small, workspace).await,
        Commands::Release => handle_suite(Suite::Release, workspace).await,
        Commands::Run { dir, timeout } => handle_run(&dir, timeout, workspace).await,
        Commands::Config { action } => handle_config(action, workspace).await,
    }
}

fn load(workspace: &Path) -> anyhow::Result<(HarnessConfig, Probe)> {
    if !smokestack_core::config_exists(Some(workspace)) {
        println!("No configuration file found, using built-in defaults ('smokestack config init' to customize).");
    }
    let config = load_config(Some(workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    let probe = Probe::new(&config.http)?;
    Ok((config, probe))
}

fn print_outcome(outcome: &CheckOutcome) {
    println!(
        "{} {} ({:.2}s): {}",
        outcome.status,
        outcome.name,
        outcome.duration_ms as f64 / 1000.0,
        outcome.detail
    );
}

fn print_record(record: &TestRecord) {
    println!(
        "{} {} ({:.2}s): {}",
        record.status,
        record.name,
        record.duration_ms as f64 / 1000.0,
        record.detail
    );
    if record.status == TestStatus::Failed && !record.stderr.is_empty() {
        let excerpt: String = record
            .stderr
            .trim()
            .lines()
            .take(3)
            .collect::<Vec<_>>()
            .join("\n    ");
        println!("    {excerpt}");
    }
}

fn print_summary(report: &RunReport) {
    println!();
    println!(
        "Summary: {} total, {} passed, {} failed",
        report.summary.total, report.summary.passed, report.summary.failed
    );
}

fn write_report(report: &RunReport, config: &HarnessConfig) -> anyhow::Result<()> {
    let dir = config.report.resolve_dir();
    let path = report
        .write_to_dir(&dir)
        .with_context(|| format!("failed to write report under {}", dir.display()))?;
    println!("Report written to {}", path.display());
    Ok(())
}

async fn handle_up(workspace: &Path) -> anyhow::Result<()> {
    let (config, probe) = load(workspace)?;
    let controller = StackController::new(config.clone(), probe.clone());

    println!("Starting stack...");
    controller.start().await?;
    println!("All services ready, running boot gate...");

    let ctx = CheckContext::new(config.clone(), probe);
    let report = run_suite(Suite::BootGate, &ctx, print_outcome).await;
    print_summary(&report);
    write_report(&report, &config)?;

    if !report.summary.all_passed() {
        return Err(LifecycleError::BootGateFailed {
            failed: report.summary.failed,
            total: report.summary.total,
        }
        .into());
    }
    println!("Stack is up.");
    Ok(())
}

async fn handle_down(workspace: &Path) -> anyhow::Result<()> {
    let (config, probe) = load(workspace)?;
    let controller = StackController::new(config, probe);
    controller.stop().await?;
    println!("Stack is down.");
    Ok(())
}

async fn handle_suite(suite: Suite, workspace: &Path) -> anyhow::Result<()> {
    let (config, probe) = load(workspace)?;
    let ctx = CheckContext::new(config.clone(), probe);

    println!("Running {} suite...", suite.name());
    let report = run_suite(suite, &ctx, print_outcome).await;
    print_summary(&report);
    write_report(&report, &config)?;

    if !report.summary.all_passed() {
        anyhow::bail!("{} suite failed", suite.name());
    }
    Ok(())
}

async fn handle_run(
    dir: &Path,
    timeout: Option<u64>,
    workspace: &Path,
) -> anyhow::Result<()> {
    let (config, _probe) = load(workspace)?;
    let mut runner_config = config.runner.clone();
    if let Some(timeout_secs) = timeout {
        runner_config.script_timeout_secs = timeout_secs;
    }

    println!("Running test scripts in {}...", dir.display());
    let report = runner::run_dir(dir, &runner_config, print_record).await?;
    print_summary(&report);
    write_report(&report, &config)?;

    if !report.summary.all_passed() {
        anyhow::bail!("{} of {} test scripts failed", report.summary.failed, report.summary.total);
    }
    Ok(())
}

async fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = workspace.join("smokestack.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let default_config = HarnessConfig::default();
            let toml_str = toml::to_string_pretty(&default_config)?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_config(Some(workspace), None)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}
