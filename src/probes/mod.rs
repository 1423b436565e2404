pub mod matrix;
pub mod throughput;

pub use matrix::{MatrixRun, TrafficMatrix};
pub use throughput::{ServerWait, ThroughputTester, extract_metric};
