//! Campaign orchestration
//!
//! `TrafficAnalyzer` owns every piece of state a campaign accumulates: the
//! append-only probe log and the rate records of the last monitoring run. All
//! mutation goes through `&mut self`, so there is exactly one sequential flow.

use log::{info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cancel::CancelSignal;
use crate::collectors::{BandwidthMonitor, CounterSampler, MonitorRun};
use crate::config::AnalyzerConfig;
use crate::errors::{AnalyzerError, MonitorError};
use crate::models::{Endpoint, ProbeResult, RateRecord, Report};
use crate::probes::{ThroughputTester, TrafficMatrix};
use crate::reporting;
use crate::runner::{CommandRunner, EndpointDirectory};

/// Which phases a campaign runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CampaignPlan {
    pub traffic_matrix: bool,
    pub bandwidth: bool,
}

impl Default for CampaignPlan {
    fn default() -> Self {
        Self {
            traffic_matrix: true,
            bandwidth: true,
        }
    }
}

pub struct TrafficAnalyzer {
    config: AnalyzerConfig,
    endpoints: Vec<Endpoint>,
    matrix: TrafficMatrix,
    tester: ThroughputTester,
    monitor: BandwidthMonitor,
    sampler: CounterSampler,
    cancel: CancelSignal,
    traffic_log: Vec<ProbeResult>,
    bandwidth: Option<BTreeMap<String, RateRecord>>,
}

impl TrafficAnalyzer {
    pub fn new(
        config: AnalyzerConfig,
        runner: Arc<dyn CommandRunner>,
        directory: Arc<dyn EndpointDirectory>,
    ) -> Result<Self, AnalyzerError> {
        let endpoints = directory.list_endpoints();
        if endpoints.is_empty() {
            return Err(AnalyzerError::Config("endpoint directory is empty".to_string()));
        }

        let matrix = TrafficMatrix::new(&endpoints, config.probes.clone())?;
        let tester = ThroughputTester::new(
            Arc::clone(&runner),
            Arc::clone(&directory),
            config.throughput.clone(),
        );
        let sampler = CounterSampler::new(Arc::clone(&runner), &config.monitor);
        let monitor = BandwidthMonitor::new(sampler.clone(), config.monitor.negative_rates);

        Ok(Self {
            config,
            endpoints,
            matrix,
            tester,
            monitor,
            sampler,
            cancel: CancelSignal::never(),
            traffic_log: Vec::new(),
            bandwidth: None,
        })
    }

    /// Attaches a cancellation signal observed by every later phase
    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn traffic_log(&self) -> &[ProbeResult] {
        &self.traffic_log
    }

    pub fn bandwidth(&self) -> Option<&BTreeMap<String, RateRecord>> {
        self.bandwidth.as_ref()
    }

    pub fn sampler(&self) -> &CounterSampler {
        &self.sampler
    }

    /// Runs the configured probes and appends their results to the log
    ///
    /// Returns the results added by this call.
    pub async fn generate_traffic_matrix(&mut self) -> &[ProbeResult] {
        let start = self.traffic_log.len();
        let run = self.matrix.generate(&self.tester, &self.cancel).await;
        self.traffic_log.extend(run.results);
        &self.traffic_log[start..]
    }

    /// Monitors every endpoint for `duration` and stores the rate records
    pub async fn monitor_bandwidth(&mut self, duration: Duration) -> Result<MonitorRun, MonitorError> {
        if self.cancel.is_cancelled() {
            warn!("Skipping bandwidth monitoring: campaign cancelled");
            return Ok(MonitorRun::new(duration));
        }
        let run = self
            .monitor
            .monitor(&self.endpoints, duration, &self.cancel)
            .await?;
        if !run.cancelled() {
            self.bandwidth = Some(run.records.clone());
        }
        Ok(run)
    }

    pub fn build_report(&self) -> Report {
        reporting::build_report(&self.traffic_log, self.bandwidth.as_ref())
    }

    /// Runs the planned phases in sequence and returns the resulting report
    ///
    /// Probe and monitoring failures never abort the campaign; they are logged
    /// and reflected in the report.
    pub async fn run_campaign(&mut self, plan: CampaignPlan) -> Report {
        info!(
            "Starting traffic analysis across {} endpoint(s)",
            self.endpoints.len()
        );

        if plan.traffic_matrix && !self.cancel.is_cancelled() {
            self.generate_traffic_matrix().await;
        }

        if plan.bandwidth && !self.cancel.is_cancelled() {
            let duration = Duration::from_secs(self.config.monitor.duration_secs);
            if let Err(e) = self.monitor_bandwidth(duration).await {
                warn!("Bandwidth monitoring skipped: {}", e);
            }
        }

        let report = self.build_report();
        reporting::log_summary(&report);
        report
    }
}
