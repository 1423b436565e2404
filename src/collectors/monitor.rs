//! Bandwidth monitoring over a fixed window
//!
//! One pass samples every endpoint back to back, the monitor waits for the
//! configured duration, and a second pass samples them again. Rates are the
//! counter deltas divided by that duration. Sampling skew between endpoints is
//! bounded by the number of endpoints times one sampling round-trip.

use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::time::Duration;

use super::counters::CounterSampler;
use super::formatting::format_rate;
use crate::cancel::CancelSignal;
use crate::errors::MonitorError;
use crate::models::{CounterSample, Endpoint, RateRecord};

/// Progress of one monitoring run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Init,
    SampledInitial,
    SampledFinal,
    Computed,
}

/// A per-endpoint failure that excluded the endpoint from the rate mapping
#[derive(Debug)]
pub struct EndpointFailure {
    pub endpoint: String,
    pub error: MonitorError,
}

/// Result of one monitoring run
#[derive(Debug)]
pub struct MonitorRun {
    pub records: BTreeMap<String, RateRecord>,
    pub failures: Vec<EndpointFailure>,
    /// Last state reached; `SampledInitial` when cancelled during the wait
    pub state: MonitorState,
    pub duration: Duration,
}

impl MonitorRun {
    pub fn new(duration: Duration) -> Self {
        Self {
            records: BTreeMap::new(),
            failures: Vec::new(),
            state: MonitorState::Init,
            duration,
        }
    }

    pub fn cancelled(&self) -> bool {
        self.state != MonitorState::Computed
    }
}

/// Computes the rate record for one endpoint
///
/// A final counter below the initial one is a `CounterRegression` unless
/// `allow_negative` is set, in which case the negative rate is kept as is.
///
/// # Arguments
///
/// * `endpoint` - Endpoint the samples belong to
/// * `initial` - Counters at the start of the window
/// * `final_sample` - Counters at the end of the window
/// * `duration_secs` - Window length in seconds, must be positive
/// * `allow_negative` - Keep negative rates instead of failing on regression
///
/// # Returns
///
/// The rate record with `(final - initial) / duration_secs` for both
/// directions, or `MonitorError::InvalidDuration` / `CounterRegression`
///
/// # Examples
///
/// ```
/// use traffic_watcher::collectors::compute_rates;
/// use traffic_watcher::models::CounterSample;
///
/// let record = compute_rates(
///     "h1",
///     CounterSample::new(1000, 2000),
///     CounterSample::new(6000, 12000),
///     5.0,
///     false,
/// )
/// .unwrap();
/// assert_eq!(record.rx_rate, 1000.0);
/// assert_eq!(record.tx_rate, 2000.0);
/// ```
pub fn compute_rates(
    endpoint: &str,
    initial: CounterSample,
    final_sample: CounterSample,
    duration_secs: f64,
    allow_negative: bool,
) -> Result<RateRecord, MonitorError> {
    if duration_secs <= 0.0 {
        return Err(MonitorError::InvalidDuration);
    }

    if final_sample.regressed_from(&initial) && !allow_negative {
        return Err(MonitorError::CounterRegression {
            endpoint: endpoint.to_string(),
            initial_rx: initial.rx_bytes,
            final_rx: final_sample.rx_bytes,
            initial_tx: initial.tx_bytes,
            final_tx: final_sample.tx_bytes,
        });
    }

    let delta = |to: u64, from: u64| to as f64 - from as f64;
    Ok(RateRecord {
        endpoint: endpoint.to_string(),
        initial,
        final_sample,
        rx_rate: delta(final_sample.rx_bytes, initial.rx_bytes) / duration_secs,
        tx_rate: delta(final_sample.tx_bytes, initial.tx_bytes) / duration_secs,
    })
}

pub struct BandwidthMonitor {
    sampler: CounterSampler,
    allow_negative: bool,
}

impl BandwidthMonitor {
    pub fn new(sampler: CounterSampler, allow_negative: bool) -> Self {
        Self {
            sampler,
            allow_negative,
        }
    }

    /// Samples all endpoints, waits `duration`, samples again and derives rates
    ///
    /// Only a zero duration is an error. Endpoints that fail to sample or whose
    /// counters regress are reported in `failures` and left out of `records`.
    ///
    /// # Arguments
    ///
    /// * `endpoints` - Endpoints to monitor, sampled in this order on both passes
    /// * `duration` - Monitoring window, also the rate denominator
    /// * `cancel` - Observed during the window; raising it skips the final pass
    ///
    /// # Returns
    ///
    /// A `MonitorRun` whose `state` is `Computed` after a full run and
    /// `SampledInitial` with no records when cancelled during the window
    pub async fn monitor(
        &self,
        endpoints: &[Endpoint],
        duration: Duration,
        cancel: &CancelSignal,
    ) -> Result<MonitorRun, MonitorError> {
        if duration.is_zero() {
            return Err(MonitorError::InvalidDuration);
        }

        let mut run = MonitorRun::new(duration);

        info!(
            "Monitoring bandwidth of {} endpoint(s) on '{}' for {:.1}s",
            endpoints.len(),
            self.sampler.interface(),
            duration.as_secs_f64()
        );

        let mut initial = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            match self.sampler.sample(&endpoint.name).await {
                Ok(sample) => initial.push((endpoint.name.clone(), sample)),
                Err(e) => {
                    warn!("Initial sample failed for '{}': {}", endpoint.name, e);
                    run.failures.push(EndpointFailure {
                        endpoint: endpoint.name.clone(),
                        error: e.into(),
                    });
                }
            }
        }
        run.state = MonitorState::SampledInitial;
        debug!("{} initial sample(s) taken", initial.len());

        if !cancel.sleep(duration).await {
            warn!("Bandwidth monitoring cancelled during the monitoring window");
            return Ok(run);
        }

        let mut finals = Vec::with_capacity(initial.len());
        for (name, initial_sample) in initial {
            match self.sampler.sample(&name).await {
                Ok(sample) => finals.push((name, initial_sample, sample)),
                Err(e) => {
                    warn!("Final sample failed for '{}': {}", name, e);
                    run.failures.push(EndpointFailure {
                        endpoint: name,
                        error: e.into(),
                    });
                }
            }
        }
        run.state = MonitorState::SampledFinal;

        let duration_secs = duration.as_secs_f64();
        for (name, initial_sample, final_sample) in finals {
            match compute_rates(
                &name,
                initial_sample,
                final_sample,
                duration_secs,
                self.allow_negative,
            ) {
                Ok(record) => {
                    if final_sample.regressed_from(&initial_sample) {
                        warn!("Counter regression on '{}' kept as negative rate", name);
                    }
                    info!(
                        "{} bandwidth usage: RX {} TX {}",
                        name,
                        format_rate(record.rx_rate),
                        format_rate(record.tx_rate)
                    );
                    run.records.insert(name, record);
                }
                Err(e) => {
                    warn!("No rate for '{}': {}", name, e);
                    run.failures.push(EndpointFailure {
                        endpoint: name,
                        error: e,
                    });
                }
            }
        }
        run.state = MonitorState::Computed;

        if !run.failures.is_empty() {
            warn!(
                "Bandwidth monitoring completed with {} failed endpoint(s): {}",
                run.failures.len(),
                run.failures
                    .iter()
                    .map(|f| format!("{} ({})", f.endpoint, f.error.kind()))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        Ok(run)
    }
}
