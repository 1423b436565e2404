use chrono::Utc;
use log::{info, warn};
use std::collections::HashSet;

use super::throughput::ThroughputTester;
use crate::cancel::CancelSignal;
use crate::errors::AnalyzerError;
use crate::models::{Endpoint, NO_THROUGHPUT_DATA, ProbeResult, ProbeSpec};

/// Probe results of one matrix run, in execution order
#[derive(Debug, Clone, Default)]
pub struct MatrixRun {
    pub results: Vec<ProbeResult>,
    /// Set when the run stopped early; `results` then holds the completed probes
    pub cancelled: bool,
}

/// Fixed, ordered set of probes driven one at a time
///
/// Probes share the substrate they measure, so they are never overlapped.
#[derive(Debug, Clone)]
pub struct TrafficMatrix {
    specs: Vec<ProbeSpec>,
}

impl TrafficMatrix {
    /// Builds the matrix, rejecting probes that name endpoints outside `endpoints`
    pub fn new(endpoints: &[Endpoint], specs: Vec<ProbeSpec>) -> Result<Self, AnalyzerError> {
        let known: HashSet<&str> = endpoints.iter().map(|e| e.name.as_str()).collect();
        for spec in &specs {
            for name in [&spec.source, &spec.destination] {
                if !known.contains(name.as_str()) {
                    return Err(AnalyzerError::UnknownEndpoint(name.clone()));
                }
            }
        }
        Ok(Self { specs })
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Runs every probe once, in declaration order, without retries
    pub async fn generate(&self, tester: &ThroughputTester, cancel: &CancelSignal) -> MatrixRun {
        info!("Generating traffic matrix with {} probe(s)", self.specs.len());
        let mut run = MatrixRun::default();

        for (index, spec) in self.specs.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(
                    "Traffic matrix cancelled before probe #{} of {}",
                    index + 1,
                    self.specs.len()
                );
                run.cancelled = true;
                break;
            }

            match tester.run_probe(spec, cancel).await {
                Ok(result) => run.results.push(result),
                Err(AnalyzerError::Cancelled) => {
                    run.cancelled = true;
                    break;
                }
                Err(e) => {
                    // Specs are validated at construction; keep the log complete anyway
                    warn!("Probe #{} ('{}') could not run: {}", index + 1, spec.label, e);
                    run.results.push(ProbeResult {
                        label: spec.label.clone(),
                        source: spec.source.clone(),
                        destination: spec.destination.clone(),
                        result: NO_THROUGHPUT_DATA.to_string(),
                        timestamp: Utc::now(),
                        failure: Some(e.to_string()),
                    });
                }
            }
        }

        info!(
            "Traffic matrix finished: {}/{} probe(s) recorded{}",
            run.results.len(),
            self.specs.len(),
            if run.cancelled { " (cancelled)" } else { "" }
        );
        run
    }
}
