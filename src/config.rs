//! Layered configuration for the analyzer
//!
//! Values are resolved in order: built-in defaults (the classic five-host campaign),
//! an optional configuration file, then `TW__`-prefixed environment variables
//! (`TW__MONITOR__DURATION_SECS=10`). CLI flags are applied on top by the caller.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::AnalyzerError;
use crate::models::{Endpoint, ProbeSpec};

/// How the throughput runner waits for the server side to come up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessMode {
    /// Poll the destination for a bound listener, falling back to the full warmup
    Poll,
    /// Always sleep for the full warmup
    Fixed,
}

/// Where endpoint commands are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// `ip netns exec <endpoint> sh -c <command>`
    Netns,
    /// `sh -c <command>` on this host, whatever the endpoint name
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThroughputConfig {
    /// Throughput tool binary (iperf2-compatible flags)
    pub tool: String,
    pub listen_port: u16,
    /// Upper bound on how long the server may take to bind
    pub server_warmup_ms: u64,
    pub readiness: ReadinessMode,
    pub readiness_poll_ms: u64,
    pub client_duration_secs: u64,
    pub report_interval_secs: u64,
    /// Target rate for datagram probes, in the tool's notation
    pub datagram_rate: String,
    /// `{name}` is replaced with the destination endpoint name
    pub server_log_template: String,
}

impl Default for ThroughputConfig {
    fn default() -> Self {
        Self {
            tool: "iperf".to_string(),
            listen_port: 5001,
            server_warmup_ms: 1000,
            readiness: ReadinessMode::Poll,
            readiness_poll_ms: 200,
            client_duration_secs: 5,
            report_interval_secs: 1,
            datagram_rate: "5M".to_string(),
            server_log_template: "/tmp/iperf_server_{name}.log".to_string(),
        }
    }
}

impl ThroughputConfig {
    pub fn server_warmup(&self) -> Duration {
        Duration::from_millis(self.server_warmup_ms)
    }

    pub fn readiness_poll(&self) -> Duration {
        Duration::from_millis(self.readiness_poll_ms.max(1))
    }

    pub fn server_log_path(&self, endpoint: &str) -> String {
        self.server_log_template.replace("{name}", endpoint)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Primary interface name looked up in the counter source; never guessed
    pub interface: String,
    pub duration_secs: u64,
    /// Device statistics file read on each endpoint
    pub counter_source: String,
    /// Emit negative rates for regressed counters instead of failing the endpoint
    pub negative_rates: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interface: "eth0".to_string(),
            duration_secs: 5,
            counter_source: "/proc/net/dev".to_string(),
            negative_rates: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub backend: Backend,
    pub shell: String,
    pub command_timeout_secs: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Netns,
            shell: "sh".to_string(),
            command_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub path: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/tmp/mininet_analysis_report.json"),
        }
    }
}

/// Complete analyzer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub endpoints: Vec<Endpoint>,
    pub probes: Vec<ProbeSpec>,
    pub throughput: ThroughputConfig,
    pub monitor: MonitorConfig,
    pub runner: RunnerConfig,
    pub report: ReportConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        let endpoints = (1..=5)
            .map(|i| Endpoint::new(format!("h{i}"), format!("10.0.0.{i}/24")))
            .collect();

        Self {
            endpoints,
            probes: vec![
                ProbeSpec::new("h1", "h3", "TCP Bulk"),
                ProbeSpec::new("h2", "h4", "TCP Bulk"),
                ProbeSpec::new("h1", "h5", "UDP Streaming"),
                ProbeSpec::new("h3", "h5", "HTTP-like"),
            ],
            throughput: ThroughputConfig::default(),
            monitor: MonitorConfig::default(),
            runner: RunnerConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Loads defaults, then `path` if given, then `TW__*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        // Defaults come from the serde attributes so that file arrays replace
        // the default endpoint and probe lists instead of merging into them.
        let mut builder = Config::builder();

        if let Some(path) = path {
            debug!("Loading configuration file {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("TW")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: AnalyzerConfig = builder
            .build()
            .context("Failed to assemble configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants the engine relies on
    pub fn validate(&self) -> Result<(), AnalyzerError> {
        if self.endpoints.is_empty() {
            return Err(AnalyzerError::Config("no endpoints configured".to_string()));
        }

        let mut names = HashSet::new();
        for endpoint in &self.endpoints {
            if endpoint.name.trim().is_empty() {
                return Err(AnalyzerError::Config("endpoint with empty name".to_string()));
            }
            if !names.insert(endpoint.name.as_str()) {
                return Err(AnalyzerError::Config(format!(
                    "duplicate endpoint '{}'",
                    endpoint.name
                )));
            }
        }

        for probe in &self.probes {
            for name in [&probe.source, &probe.destination] {
                if !names.contains(name.as_str()) {
                    return Err(AnalyzerError::UnknownEndpoint(name.clone()));
                }
            }
        }

        if self.monitor.duration_secs == 0 {
            return Err(AnalyzerError::Config(
                "monitor.duration_secs must be greater than zero".to_string(),
            ));
        }
        if self.throughput.client_duration_secs == 0 {
            return Err(AnalyzerError::Config(
                "throughput.client_duration_secs must be greater than zero".to_string(),
            ));
        }
        if self.monitor.interface.trim().is_empty() {
            return Err(AnalyzerError::Config("monitor.interface is empty".to_string()));
        }

        Ok(())
    }
}
