//! Interface counter sampling
//!
//! Reads the device statistics table (`/proc/net/dev` layout) on an endpoint and
//! picks out the receive and transmit byte counters of its primary interface.

use log::trace;
use std::sync::Arc;

use crate::config::MonitorConfig;
use crate::errors::SamplingError;
use crate::models::CounterSample;
use crate::runner::CommandRunner;

/// Field positions after the `iface:` prefix
const RX_BYTES_FIELD: usize = 0;
const TX_BYTES_FIELD: usize = 8;

/// True if the device name in the table refers to `interface`
///
/// Emulated hosts commonly prefix their interfaces with the host name
/// (`h1-eth0`), so a `<prefix>-<interface>` device also matches. Nothing
/// else is accepted.
fn device_matches(device: &str, interface: &str) -> bool {
    device == interface
        || device
            .strip_suffix(interface)
            .is_some_and(|prefix| prefix.ends_with('-'))
}

/// Parses the counters of `interface` out of a device statistics table
///
/// Header lines and other devices are skipped. The first device that is either
/// `interface` itself or `<prefix>-<interface>` is used.
///
/// # Arguments
///
/// * `endpoint` - Endpoint the table was read on, used in errors
/// * `interface` - Primary interface name, e.g. `eth0`
/// * `table` - Contents of the device statistics file (`/proc/net/dev` layout)
///
/// # Returns
///
/// The receive and transmit byte counters, `SamplingError::InterfaceMissing`
/// when no device matches, or `SamplingError::MalformedLine` when the matching
/// line lacks numeric fields
///
/// # Examples
///
/// ```
/// use traffic_watcher::collectors::parse_counters;
///
/// let table = "h1-eth0: 1000 10 0 0 0 0 0 0 2000 20 0 0 0 0 0 0\n";
/// let sample = parse_counters("h1", "eth0", table).unwrap();
/// assert_eq!(sample.rx_bytes, 1000);
/// assert_eq!(sample.tx_bytes, 2000);
///
/// assert!(parse_counters("h1", "wlan0", table).is_err());
/// ```
pub fn parse_counters(
    endpoint: &str,
    interface: &str,
    table: &str,
) -> Result<CounterSample, SamplingError> {
    for line in table.lines() {
        let Some((device, fields)) = line.split_once(':') else {
            continue;
        };
        if !device_matches(device.trim(), interface) {
            continue;
        }

        let fields: Vec<&str> = fields.split_whitespace().collect();
        let malformed = || SamplingError::MalformedLine {
            endpoint: endpoint.to_string(),
            interface: interface.to_string(),
            line: line.trim().to_string(),
        };

        let rx_bytes = fields
            .get(RX_BYTES_FIELD)
            .and_then(|f| f.parse::<u64>().ok())
            .ok_or_else(malformed)?;
        let tx_bytes = fields
            .get(TX_BYTES_FIELD)
            .and_then(|f| f.parse::<u64>().ok())
            .ok_or_else(malformed)?;

        return Ok(CounterSample::new(rx_bytes, tx_bytes));
    }

    Err(SamplingError::InterfaceMissing {
        endpoint: endpoint.to_string(),
        interface: interface.to_string(),
    })
}

/// Reads counter samples from endpoints through a command runner
#[derive(Clone)]
pub struct CounterSampler {
    runner: Arc<dyn CommandRunner>,
    interface: String,
    counter_source: String,
}

impl CounterSampler {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &MonitorConfig) -> Self {
        Self {
            runner,
            interface: config.interface.clone(),
            counter_source: config.counter_source.clone(),
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub async fn sample(&self, endpoint: &str) -> Result<CounterSample, SamplingError> {
        let command = format!("cat {}", self.counter_source);
        let output = self
            .runner
            .run(endpoint, &command)
            .await
            .map_err(|source| SamplingError::Runner {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let sample = parse_counters(endpoint, &self.interface, &output.text)?;
        trace!(
            "Sampled '{}' on '{}': rx={} tx={}",
            self.interface, endpoint, sample.rx_bytes, sample.tx_bytes
        );
        Ok(sample)
    }
}
