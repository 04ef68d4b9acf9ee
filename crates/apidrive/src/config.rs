//! Client configuration.

use crate::http_client::TransportConfig;

/// Configuration for an [`OpenApi`](crate::OpenApi) client.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Overrides every server URL declared in the document.
    pub base_url: Option<String>,
    /// Headers sent with every request, before parameters and security.
    pub default_headers: Vec<(String, String)>,
    /// Settings for the default reqwest transport.
    pub transport: TransportConfig,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }
}
