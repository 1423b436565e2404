use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{ProbeResult, RateRecord};

/// Name of the metric group holding per-endpoint rate records
pub const BANDWIDTH_GROUP: &str = "bandwidth";

/// Named metric groups of a report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// Rate records keyed by endpoint name; absent when no monitoring ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<BTreeMap<String, RateRecord>>,
    /// Any other named metric groups
    #[serde(flatten)]
    pub groups: BTreeMap<String, serde_json::Value>,
}

/// Final aggregation of one run: probe log plus metric groups
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub traffic_tests: Vec<ProbeResult>,
    pub statistics: Statistics,
}

impl Report {
    /// Restores endpoint names on rate records, which are only keyed in the document
    pub(crate) fn attach_endpoint_names(&mut self) {
        if let Some(bandwidth) = self.statistics.bandwidth.as_mut() {
            for (name, record) in bandwidth.iter_mut() {
                record.endpoint = name.clone();
            }
        }
    }

    pub fn bandwidth(&self) -> impl Iterator<Item = &RateRecord> {
        self.statistics.bandwidth.iter().flat_map(|group| group.values())
    }
}
