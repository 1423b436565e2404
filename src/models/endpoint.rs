use serde::{Deserialize, Serialize};

/// An addressable node that can run commands and expose interface counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: String,
    /// Address in string form, e.g. `10.0.0.1/24`
    pub address: String,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }

    /// Address without any prefix length, suitable as a probe target
    pub fn host_address(&self) -> &str {
        host_part(&self.address)
    }
}

/// Strips an optional `/prefix` suffix from an address string
fn host_part(address: &str) -> &str {
    address
        .split_once('/')
        .map(|(host, _)| host)
        .unwrap_or(address)
        .trim()
}
