//! Single source-to-destination throughput probe
//!
//! A probe starts a throughput server on the destination in the background, waits
//! until it is listening, drives the client from the source and keeps the first
//! throughput line of the client's output. The server is always torn down
//! afterwards, whatever the outcome.

use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::time::Instant;

use crate::cancel::CancelSignal;
use crate::config::{ReadinessMode, ThroughputConfig};
use crate::errors::AnalyzerError;
use crate::models::{NO_THROUGHPUT_DATA, ProbeResult, ProbeSpec, TrafficClass};
use crate::runner::{CommandRunner, EndpointDirectory};

/// Unit markers a throughput line must contain
const THROUGHPUT_MARKERS: [&str; 2] = ["Gbits/sec", "Mbits/sec"];

/// Returns the first line carrying a throughput unit, trimmed, or the sentinel
///
/// Matching is a plain substring test so that differing tool versions and
/// output layouts are all accepted.
pub fn extract_metric(output: &str) -> String {
    output
        .lines()
        .find(|line| THROUGHPUT_MARKERS.iter().any(|marker| line.contains(marker)))
        .map(|line| line.trim().to_string())
        .unwrap_or_else(|| NO_THROUGHPUT_DATA.to_string())
}

/// True if a socket listing (`ss -lntu`) shows something bound to `port`
pub fn listener_bound(listing: &str, port: u16) -> bool {
    let suffix = format!(":{port}");
    listing
        .lines()
        .any(|line| line.split_whitespace().any(|field| field.ends_with(&suffix)))
}

/// How the wait for the server ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerWait {
    /// Listener observed
    Ready,
    /// Listener never observed; the full warmup has elapsed
    WarmupElapsed,
    Cancelled,
}

pub struct ThroughputTester {
    runner: Arc<dyn CommandRunner>,
    directory: Arc<dyn EndpointDirectory>,
    config: ThroughputConfig,
}

impl ThroughputTester {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        directory: Arc<dyn EndpointDirectory>,
        config: ThroughputConfig,
    ) -> Self {
        Self {
            runner,
            directory,
            config,
        }
    }

    pub fn config(&self) -> &ThroughputConfig {
        &self.config
    }

    pub fn server_command(&self, class: TrafficClass) -> String {
        let mut cmd = format!("{} -s -p {}", self.config.tool, self.config.listen_port);
        if class == TrafficClass::Datagram {
            cmd.push_str(" -u");
        }
        cmd
    }

    pub fn client_command(&self, target: &str, class: TrafficClass) -> String {
        let mode = match class {
            TrafficClass::Datagram => format!(" -u -b {}", self.config.datagram_rate),
            TrafficClass::Stream => String::new(),
        };
        format!(
            "{} -c {} -p {}{} -t {} -i {}",
            self.config.tool,
            target,
            self.config.listen_port,
            mode,
            self.config.client_duration_secs,
            self.config.report_interval_secs
        )
    }

    fn kill_command(&self) -> String {
        format!(
            "pkill -f '{} -s -p {}'",
            self.config.tool, self.config.listen_port
        )
    }

    /// Runs one probe and returns its result
    ///
    /// Command failures never fail the probe: whatever text was captured is
    /// scanned and the sentinel recorded when nothing matches. Only unknown
    /// endpoints and cancellation during the server warmup are errors, and in
    /// the latter case the server has already been terminated.
    ///
    /// # Arguments
    ///
    /// * `spec` - Source, destination and label of the probe
    /// * `cancel` - Observed while waiting for the server to listen
    ///
    /// # Returns
    ///
    /// The probe result stamped when the client finished, with `failure` set
    /// if the client command failed, `AnalyzerError::UnknownEndpoint` for an
    /// endpoint missing from the directory, or `AnalyzerError::Cancelled`
    pub async fn run_probe(
        &self,
        spec: &ProbeSpec,
        cancel: &CancelSignal,
    ) -> Result<ProbeResult, AnalyzerError> {
        if self.directory.address(&spec.source).is_none() {
            return Err(AnalyzerError::UnknownEndpoint(spec.source.clone()));
        }
        let destination = self
            .directory
            .endpoint(&spec.destination)
            .ok_or_else(|| AnalyzerError::UnknownEndpoint(spec.destination.clone()))?;
        let target = destination.host_address();
        let class = spec.traffic_class();

        info!(
            "{} traffic: {} -> {} ({:?})",
            spec.label, spec.source, spec.destination, class
        );

        let server_cmd = self.server_command(class);
        let log_path = self.config.server_log_path(&spec.destination);
        if let Err(e) = self
            .runner
            .run_background(&spec.destination, &server_cmd, &log_path)
            .await
        {
            warn!(
                "Failed to start server on '{}' for '{}' probe: {} - continuing with client",
                spec.destination, spec.label, e
            );
        }

        if self.wait_for_server(&spec.destination, cancel).await == ServerWait::Cancelled {
            warn!(
                "'{}' probe {} -> {} cancelled during server warmup",
                spec.label, spec.source, spec.destination
            );
            self.stop_server(&spec.destination).await;
            return Err(AnalyzerError::Cancelled);
        }

        let client_cmd = self.client_command(target, class);
        let (output, failure) = match self.runner.run(&spec.source, &client_cmd).await {
            Ok(output) => (output.text, None),
            Err(e) => {
                warn!(
                    "'{}' probe {} -> {} failed: {} - recording captured output",
                    spec.label, spec.source, spec.destination, e
                );
                (e.partial_output().to_string(), Some(e.to_string()))
            }
        };
        let result = ProbeResult {
            label: spec.label.clone(),
            source: spec.source.clone(),
            destination: spec.destination.clone(),
            result: extract_metric(&output),
            timestamp: Utc::now(),
            failure,
        };

        if result.has_data() {
            debug!("'{}' probe result: {}", spec.label, result.result);
        } else {
            warn!(
                "'{}' probe {} -> {} produced no throughput line",
                spec.label, spec.source, spec.destination
            );
        }

        self.stop_server(&spec.destination).await;

        Ok(result)
    }

    /// Waits for the destination's server to listen, bounded by the warmup
    pub async fn wait_for_server(&self, endpoint: &str, cancel: &CancelSignal) -> ServerWait {
        let warmup = self.config.server_warmup();

        if self.config.readiness == ReadinessMode::Fixed {
            return if cancel.sleep(warmup).await {
                ServerWait::Ready
            } else {
                ServerWait::Cancelled
            };
        }

        let deadline = Instant::now() + warmup;
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.runner.run(endpoint, "ss -lntu").await {
                Ok(output) if listener_bound(&output.text, self.config.listen_port) => {
                    debug!(
                        "Server on '{}' listening on port {} after {} poll(s)",
                        endpoint, self.config.listen_port, attempts
                    );
                    return ServerWait::Ready;
                }
                Ok(_) => {}
                Err(e) => debug!("Readiness poll #{} on '{}' failed: {}", attempts, endpoint, e),
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(
                    "Server on '{}' not observed listening on port {} within {}ms - proceeding anyway",
                    endpoint,
                    self.config.listen_port,
                    warmup.as_millis()
                );
                return ServerWait::WarmupElapsed;
            }

            let pause = self.config.readiness_poll().min(deadline - now);
            if !cancel.sleep(pause).await {
                return ServerWait::Cancelled;
            }
        }
    }

    /// Best-effort termination of the background server
    pub async fn stop_server(&self, endpoint: &str) {
        if let Err(e) = self.runner.run(endpoint, &self.kill_command()).await {
            debug!("Server cleanup on '{}' reported: {}", endpoint, e);
        }
    }
}
