use crate::models::Endpoint;

use super::EndpointDirectory;

/// Fixed endpoint set, immutable for the engine's lifetime
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    endpoints: Vec<Endpoint>,
}

impl StaticDirectory {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self { endpoints }
    }
}

impl EndpointDirectory for StaticDirectory {
    fn list_endpoints(&self) -> Vec<Endpoint> {
        self.endpoints.clone()
    }

    fn address(&self, name: &str) -> Option<String> {
        self.endpoints
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.address.clone())
    }
}
