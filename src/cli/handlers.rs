// Command handlers: build the engine from configuration and run one command
// Console output goes to stdout, diagnostics go through the log facade

use anyhow::{Context, Result, anyhow};
use log::{error, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::commands::{Cli, Commands};
use crate::analyzer::{CampaignPlan, TrafficAnalyzer};
use crate::cancel::{CancelSignal, cancel_pair};
use crate::collectors::formatting::{format_bytes, format_rate};
use crate::config::AnalyzerConfig;
use crate::models::ProbeSpec;
use crate::reporting;
use crate::runner::{CommandRunner, EndpointDirectory, ShellRunner, StaticDirectory};

/// Executes the parsed command line
pub async fn execute(cli: Cli) -> Result<()> {
    let mut config = AnalyzerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            duration,
            output,
            interface,
            skip_matrix,
            skip_monitor,
        } => {
            apply_monitor_overrides(&mut config, duration, interface)?;
            if let Some(output) = output {
                config.report.path = output;
            }
            let plan = CampaignPlan {
                traffic_matrix: !skip_matrix,
                bandwidth: !skip_monitor,
            };
            run_analyze(config, plan).await
        }
        Commands::Probe {
            source,
            destination,
            label,
        } => {
            config.probes = vec![ProbeSpec::new(source, destination, label)];
            run_probe(config).await
        }
        Commands::Monitor {
            duration,
            interface,
        } => {
            apply_monitor_overrides(&mut config, duration, interface)?;
            run_monitor(config).await
        }
        Commands::Sample {
            endpoint,
            interface,
        } => {
            if let Some(interface) = interface {
                config.monitor.interface = interface;
            }
            run_sample(config, &endpoint).await
        }
        Commands::Show { report } => show_report(report),
    }
}

fn apply_monitor_overrides(
    config: &mut AnalyzerConfig,
    duration: Option<u64>,
    interface: Option<String>,
) -> Result<()> {
    if let Some(duration) = duration {
        config.monitor.duration_secs = duration;
    }
    if let Some(interface) = interface {
        config.monitor.interface = interface;
    }
    config.validate()?;
    Ok(())
}

/// Builds an analyzer backed by real processes, with Ctrl-C wired to cancellation
fn build_analyzer(config: AnalyzerConfig) -> Result<TrafficAnalyzer> {
    let runner: Arc<dyn CommandRunner> = Arc::new(ShellRunner::new(&config.runner));
    let directory: Arc<dyn EndpointDirectory> =
        Arc::new(StaticDirectory::new(config.endpoints.clone()));
    let analyzer = TrafficAnalyzer::new(config, runner, directory)
        .context("Failed to set up traffic analyzer")?;
    Ok(analyzer.with_cancel(ctrl_c_signal()))
}

fn ctrl_c_signal() -> CancelSignal {
    let (handle, signal) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received - finishing current step and stopping");
            handle.cancel();
        }
    });
    signal
}

async fn run_analyze(config: AnalyzerConfig, plan: CampaignPlan) -> Result<()> {
    let report_path = config.report.path.clone();
    let mut analyzer = build_analyzer(config)?;
    let report = analyzer.run_campaign(plan).await;

    // The analysis stays valid even when the sink is not writable
    if let Err(e) = reporting::emit(&report, &report_path) {
        error!("{}", e);
        print!("{}", reporting::render_summary(&report));
        return Err(anyhow::Error::new(e).context("Report could not be saved"));
    }

    println!("Report saved to {}", report_path.display());
    Ok(())
}

async fn run_probe(config: AnalyzerConfig) -> Result<()> {
    let mut analyzer = build_analyzer(config)?;
    let results = analyzer.generate_traffic_matrix().await;

    for result in results {
        println!("{} traffic: {} -> {}", result.label, result.source, result.destination);
        println!("  Result: {}", result.result);
        if let Some(failure) = &result.failure {
            println!("  Failure: {}", failure);
        }
    }
    Ok(())
}

async fn run_monitor(config: AnalyzerConfig) -> Result<()> {
    let duration = Duration::from_secs(config.monitor.duration_secs);
    let mut analyzer = build_analyzer(config)?;
    let run = analyzer.monitor_bandwidth(duration).await?;

    println!("Bandwidth Usage ({}s window)", duration.as_secs());
    println!("==========================");
    for (endpoint, record) in &run.records {
        println!("\n{}:", endpoint);
        println!("  RX Rate: {}", format_rate(record.rx_rate));
        println!("  TX Rate: {}", format_rate(record.tx_rate));
    }
    for failure in &run.failures {
        println!("\n{}: no rate ({})", failure.endpoint, failure.error);
    }
    if run.cancelled() {
        println!("\nMonitoring was cancelled before rates could be computed");
    }
    Ok(())
}

async fn run_sample(config: AnalyzerConfig, endpoint: &str) -> Result<()> {
    let analyzer = build_analyzer(config)?;
    if !analyzer.endpoints().iter().any(|e| e.name == endpoint) {
        return Err(anyhow!("Unknown endpoint '{}'", endpoint));
    }

    let sample = analyzer
        .sampler()
        .sample(endpoint)
        .await
        .with_context(|| format!("Failed to sample counters on '{}'", endpoint))?;

    println!("Interface counters for {} ({})", endpoint, analyzer.sampler().interface());
    println!("  Received: {} ({} bytes)", format_bytes(sample.rx_bytes), sample.rx_bytes);
    println!("  Sent: {} ({} bytes)", format_bytes(sample.tx_bytes), sample.tx_bytes);
    Ok(())
}

fn show_report(path: PathBuf) -> Result<()> {
    let report = reporting::load(&path)
        .with_context(|| format!("Failed to load report {}", path.display()))?;
    print!("{}", reporting::render_summary(&report));
    Ok(())
}
