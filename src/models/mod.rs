pub mod counters;
pub mod endpoint;
pub mod probe;
pub mod report;

pub use counters::{CounterSample, RateRecord};
pub use endpoint::Endpoint;
pub use probe::{NO_THROUGHPUT_DATA, ProbeResult, ProbeSpec, TrafficClass};
pub use report::{BANDWIDTH_GROUP, Report, Statistics};
