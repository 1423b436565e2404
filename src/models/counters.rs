use serde::{Deserialize, Serialize};

/// Cumulative byte counters of one endpoint's primary interface at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSample {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

impl CounterSample {
    pub fn new(rx_bytes: u64, tx_bytes: u64) -> Self {
        Self { rx_bytes, tx_bytes }
    }

    /// True when either counter is below the corresponding one in `earlier`
    pub fn regressed_from(&self, earlier: &CounterSample) -> bool {
        self.rx_bytes < earlier.rx_bytes || self.tx_bytes < earlier.tx_bytes
    }
}

/// Derived receive/transmit rates for one endpoint over one monitoring window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRecord {
    #[serde(skip)]
    pub endpoint: String,
    pub initial: CounterSample,
    #[serde(rename = "final")]
    pub final_sample: CounterSample,
    /// Bytes per second
    pub rx_rate: f64,
    /// Bytes per second
    pub tx_rate: f64,
}
