//! Report aggregation and emission
//!
//! Aggregation is pure: probe results keep their execution order and rate
//! records are copied as they are. Emission writes a pretty-printed JSON
//! document; a failed write leaves the in-memory report untouched.

use log::{debug, info};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::errors::ReportError;
use crate::models::{BANDWIDTH_GROUP, ProbeResult, RateRecord, Report, Statistics};

/// Merges probe results and rate records into one report
pub fn build_report(
    probe_results: &[ProbeResult],
    rate_records: Option<&BTreeMap<String, RateRecord>>,
) -> Report {
    Report {
        traffic_tests: probe_results.to_vec(),
        statistics: Statistics {
            bandwidth: rate_records.cloned(),
            groups: BTreeMap::new(),
        },
    }
}

/// Adds an extra named metric group to `report`
///
/// The `bandwidth` name belongs to the typed rate records and is refused, as
/// the emitted document would otherwise carry the key twice.
pub fn add_group(
    report: &mut Report,
    name: impl Into<String>,
    group: serde_json::Value,
) -> Result<(), ReportError> {
    let name = name.into();
    if name == BANDWIDTH_GROUP {
        return Err(ReportError::ReservedGroup(name));
    }
    report.statistics.groups.insert(name, group);
    Ok(())
}

/// Serializes `report` into any writer
pub fn write_report<W: Write>(report: &Report, writer: W) -> Result<(), ReportError> {
    ensure_unshadowed(report)?;
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.write_all(b"\n").map_err(serde_json::Error::io)?;
    writer.flush().map_err(serde_json::Error::io)?;
    Ok(())
}

fn ensure_unshadowed(report: &Report) -> Result<(), ReportError> {
    if report.statistics.groups.contains_key(BANDWIDTH_GROUP) {
        return Err(ReportError::ReservedGroup(BANDWIDTH_GROUP.to_string()));
    }
    Ok(())
}

/// Turns an I/O failure surfacing through the serializer into a write error on `path`
fn attribute_to_path(error: ReportError, path: &Path) -> ReportError {
    match error {
        ReportError::Serialize(inner) if inner.is_io() => ReportError::Write {
            path: path.to_path_buf(),
            source: std::io::Error::from(inner),
        },
        other => other,
    }
}

/// Writes `report` to the file at `path`
///
/// The file is created or truncated and receives the pretty-printed JSON
/// document followed by a newline. The in-memory report is never modified, so
/// a failed write can be retried or the report rendered some other way.
///
/// # Arguments
///
/// * `report` - The report to persist
/// * `path` - Destination file; its parent directory must exist
///
/// # Returns
///
/// `Ok(())` once the document is flushed, `ReportError::Write` carrying the
/// underlying I/O error kind if the sink could not be created or written, or
/// `ReportError::ReservedGroup` if an extra group shadows `bandwidth`
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use traffic_watcher::reporting::{build_report, emit};
///
/// let report = build_report(&[], None);
/// emit(&report, Path::new("/tmp/analysis_report.json")).expect("report written");
/// ```
pub fn emit(report: &Report, path: &Path) -> Result<(), ReportError> {
    debug!(
        "Writing report with {} probe result(s) to {}",
        report.traffic_tests.len(),
        path.display()
    );

    ensure_unshadowed(report)?;
    let file = File::create(path).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    write_report(report, file).map_err(|e| attribute_to_path(e, path))?;

    info!("Report saved to {}", path.display());
    Ok(())
}

/// Reads a report back from `path`
pub fn load(path: &Path) -> Result<Report, ReportError> {
    let text = std::fs::read_to_string(path).map_err(|source| ReportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut report: Report = serde_json::from_str(&text)?;
    report.attach_endpoint_names();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CounterSample, NO_THROUGHPUT_DATA};
    use chrono::Utc;
    use tempfile::tempdir;

    fn probe(label: &str, source: &str, destination: &str) -> ProbeResult {
        ProbeResult {
            label: label.to_string(),
            source: source.to_string(),
            destination: destination.to_string(),
            result: NO_THROUGHPUT_DATA.to_string(),
            timestamp: Utc::now(),
            failure: None,
        }
    }

    fn record(endpoint: &str, rx_rate: f64, tx_rate: f64) -> RateRecord {
        RateRecord {
            endpoint: endpoint.to_string(),
            initial: CounterSample::new(0, 0),
            final_sample: CounterSample::new(
                (rx_rate * 5.0) as u64,
                (tx_rate * 5.0) as u64,
            ),
            rx_rate,
            tx_rate,
        }
    }

    #[test]
    fn test_build_report_preserves_order() {
        let probes = vec![
            probe("TCP Bulk", "h1", "h3"),
            probe("UDP Streaming", "h1", "h5"),
            probe("HTTP-like", "h3", "h5"),
        ];
        let report = build_report(&probes, None);

        let labels: Vec<_> = report.traffic_tests.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["TCP Bulk", "UDP Streaming", "HTTP-like"]);
        assert!(report.statistics.bandwidth.is_none());
    }

    #[test]
    fn test_document_layout() {
        let mut records = BTreeMap::new();
        records.insert("h1".to_string(), record("h1", 1000.0, 2000.0));
        let report = build_report(&[probe("TCP Bulk", "h1", "h2")], Some(&records));

        let value = serde_json::to_value(&report).unwrap();
        let top: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(top, vec!["statistics", "traffic_tests"]);
        assert_eq!(value["traffic_tests"][0]["type"], "TCP Bulk");
        assert_eq!(value["statistics"]["bandwidth"]["h1"]["rx_rate"], 1000.0);
        assert_eq!(value["statistics"]["bandwidth"]["h1"]["final"]["rx_bytes"], 5000);
    }

    #[test]
    fn test_emit_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");

        let mut records = BTreeMap::new();
        records.insert("h1".to_string(), record("h1", 1000.0, 2000.0));
        records.insert("h2".to_string(), record("h2", 0.0, 0.0));
        let mut report = build_report(
            &[probe("TCP Bulk", "h1", "h3"), probe("TCP Bulk", "h2", "h4")],
            Some(&records),
        );
        add_group(&mut report, "latency", serde_json::json!({"h1": {"avg_ms": 4.1}})).unwrap();

        emit(&report, &path).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded.traffic_tests.len(), 2);
        let keys: Vec<_> = loaded.statistics.bandwidth.as_ref().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["h1", "h2"]);
        assert_eq!(loaded.statistics.bandwidth.as_ref().unwrap()["h1"].endpoint, "h1");
        assert_eq!(loaded.statistics.groups["latency"]["h1"]["avg_ms"], 4.1);
    }

    #[test]
    fn test_emit_to_unwritable_path_keeps_report() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("report.json");
        let report = build_report(&[probe("TCP Bulk", "h1", "h3")], None);

        let result = emit(&report, &path);
        assert!(matches!(result, Err(ReportError::Write { .. })));
        assert_eq!(report.traffic_tests.len(), 1);
    }

    #[test]
    fn test_bandwidth_group_name_is_reserved() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut records = BTreeMap::new();
        records.insert("h1".to_string(), record("h1", 1000.0, 2000.0));
        let mut report = build_report(&[], Some(&records));

        let result = add_group(&mut report, BANDWIDTH_GROUP, serde_json::json!({"extra": 1}));
        assert!(matches!(result, Err(ReportError::ReservedGroup(ref name)) if name == "bandwidth"));
        assert!(report.statistics.groups.is_empty());

        emit(&report, &path).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.statistics.bandwidth.unwrap().len(), 1);
    }

    #[test]
    fn test_write_refuses_shadowing_group_inserted_directly() {
        let mut report = build_report(&[], None);
        report
            .statistics
            .groups
            .insert(BANDWIDTH_GROUP.to_string(), serde_json::json!({}));

        let mut sink = Vec::new();
        let result = write_report(&report, &mut sink);
        assert!(matches!(result, Err(ReportError::ReservedGroup(_))));
        assert!(sink.is_empty());
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(std::io::ErrorKind::PermissionDenied))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_keeps_io_error_kind() {
        let report = build_report(&[probe("TCP Bulk", "h1", "h3")], None);
        let path = Path::new("/tmp/report.json");

        let error = write_report(&report, FullDisk).unwrap_err();
        match attribute_to_path(error, path) {
            ReportError::Write { path: failed, source } => {
                assert_eq!(failed, path);
                assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied);
            }
            other => panic!("expected write error, got {:?}", other),
        }
    }
}
