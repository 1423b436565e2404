pub mod counters;
pub mod formatting;
pub mod monitor;

pub use counters::{CounterSampler, parse_counters};
pub use formatting::{format_bytes, format_rate};
pub use monitor::{BandwidthMonitor, EndpointFailure, MonitorRun, MonitorState, compute_rates};
