pub mod aggregator;
pub mod summary;

pub use aggregator::{add_group, build_report, emit, load, write_report};
pub use summary::{log_summary, render_summary};
