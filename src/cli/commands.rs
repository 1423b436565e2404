use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI structure for the traffic-watcher application
/// Uses clap's derive macros for automatic CLI generation
#[derive(Parser)]
#[command(author = "Kaipo Chen")]
#[command(version)] // Automatically uses version from Cargo.toml
#[command(about = "Traffic Watcher - Run throughput probes and bandwidth monitoring across network endpoints")]
#[command(long_about = "Traffic Watcher drives pairwise throughput probes between endpoints (network namespaces \
or emulated hosts), samples interface counters over a monitoring window to derive receive/transmit rates, \
and aggregates both into a JSON report.\n\n\
Configuration is read from an optional file (--config) and TW__-prefixed environment variables, \
e.g. TW__MONITOR__INTERFACE=eth1.")]
pub struct Cli {
    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long, global = true, help = "Path to a configuration file")]
    pub config: Option<PathBuf>,

    /// Raise the default log level to debug
    #[arg(short, long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
/// Each variant represents a different mode of operation
#[derive(Subcommand)]
pub enum Commands {
    /// Full campaign: traffic matrix, bandwidth monitoring and report
    #[command(about = "Run the full traffic analysis campaign and write a report")]
    #[command(long_about = "Runs every configured throughput probe in order, then monitors interface \
counters on all endpoints for the monitoring duration, then writes the combined JSON report. \
Ctrl-C stops after the current step and still writes the partial report.\n\n\
Examples:\n  \
tw analyze                               # Default five-host campaign\n  \
tw analyze --duration 10                 # Monitor for 10 seconds\n  \
tw analyze --skip-matrix                 # Bandwidth monitoring only\n  \
tw analyze --output report.json          # Custom report location")]
    Analyze {
        /// Monitoring window in seconds
        #[arg(short, long, help = "Bandwidth monitoring duration in seconds")]
        duration: Option<u64>,

        /// Report destination
        #[arg(short, long, help = "Where to write the JSON report")]
        output: Option<PathBuf>,

        /// Primary interface name looked up on every endpoint
        #[arg(short = 'I', long, help = "Primary interface name, e.g. eth0")]
        interface: Option<String>,

        #[arg(long, help = "Skip the throughput probes")]
        skip_matrix: bool,

        #[arg(long, help = "Skip bandwidth monitoring")]
        skip_monitor: bool,
    },

    /// One throughput probe between two endpoints
    #[command(about = "Run a single throughput probe")]
    Probe {
        /// Client endpoint
        source: String,

        /// Server endpoint
        destination: String,

        /// Traffic-class label; labels containing "UDP" use datagram mode
        #[arg(short, long, default_value = "TCP Bulk", help = "Traffic class label")]
        label: String,
    },

    /// Bandwidth monitoring only, rates printed
    #[command(about = "Monitor endpoint bandwidth for a fixed window")]
    Monitor {
        #[arg(short, long, help = "Monitoring duration in seconds")]
        duration: Option<u64>,

        #[arg(short = 'I', long, help = "Primary interface name, e.g. eth0")]
        interface: Option<String>,
    },

    /// Single interface counter sample
    #[command(about = "Read the interface counters of one endpoint")]
    Sample {
        endpoint: String,

        #[arg(short = 'I', long, help = "Primary interface name, e.g. eth0")]
        interface: Option<String>,
    },

    /// Print the summary of a saved report
    #[command(about = "Show a previously written report")]
    Show {
        report: PathBuf,
    },
}
