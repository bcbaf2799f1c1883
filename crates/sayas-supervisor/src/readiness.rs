/// Endpoint string the UI backend prints once it listens on `port`.
pub fn local_endpoint(port: u16) -> String {
    format!("http://localhost:{port}")
}

/// Case-sensitive substring match against one line of UI stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessProbe {
    endpoint: String,
}

impl ReadinessProbe {
    pub fn for_port(port: u16) -> Self {
        Self {
            endpoint: local_endpoint(port),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn matches(&self, line: &str) -> bool {
        line.contains(&self.endpoint)
    }
}
