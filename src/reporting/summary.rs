use log::info;

use crate::collectors::formatting::format_rate;
use crate::models::Report;

const RULE: &str = "============================================================";

/// Renders the human-readable analysis summary of a report
pub fn render_summary(report: &Report) -> String {
    let mut lines = vec![
        RULE.to_string(),
        "TRAFFIC ANALYSIS REPORT".to_string(),
        RULE.to_string(),
        String::new(),
        "=== Traffic Test Results ===".to_string(),
    ];

    if report.traffic_tests.is_empty() {
        lines.push("(no traffic tests recorded)".to_string());
    }
    for (i, test) in report.traffic_tests.iter().enumerate() {
        lines.push(format!("Test {}:", i + 1));
        lines.push(format!("  Type: {}", test.label));
        lines.push(format!("  Path: {} -> {}", test.source, test.destination));
        lines.push(format!("  Result: {}", test.result));
        if let Some(failure) = &test.failure {
            lines.push(format!("  Failure: {}", failure));
        }
    }

    if let Some(bandwidth) = &report.statistics.bandwidth {
        lines.push(String::new());
        lines.push("=== Bandwidth Usage Summary ===".to_string());
        for (endpoint, record) in bandwidth {
            lines.push(format!("{}:", endpoint));
            lines.push(format!("  Average RX: {}", format_rate(record.rx_rate)));
            lines.push(format!("  Average TX: {}", format_rate(record.tx_rate)));
        }
    }

    for name in report.statistics.groups.keys() {
        lines.push(String::new());
        lines.push(format!("(additional metric group: {})", name));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Logs the summary line by line at info level
pub fn log_summary(report: &Report) {
    for line in render_summary(report).lines() {
        info!("{line}");
    }
}
