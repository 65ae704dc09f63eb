// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Endpoint preferences shared by the tessellation service and its renderers.

use serde::{Deserialize, Serialize};

/// Config key the endpoint prefs are stored under.
pub const ENDPOINT_KEY: &str = "endpoint";

/// Where the tessellation service listens and renderers connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointPrefs {
    /// Host name or address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Default for EndpointPrefs {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5678,
        }
    }
}

impl EndpointPrefs {
    /// `host:port`, suitable for `ToSocketAddrs` / `lookup_host`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Apply optional command-line overrides on top of stored prefs.
    pub fn with_overrides(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }
}
