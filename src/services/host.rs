//! Local host identity reported by `/health` and `/api/info`.

use std::net::{IpAddr, ToSocketAddrs};

use serde::Serialize;
use sysinfo::System;

const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostInfo {
    pub hostname: String,
    pub ip: String,
}

impl HostInfo {
    /// Resolve the local hostname and address. Never fails; anything that
    /// cannot be resolved is reported as `unknown`.
    pub fn detect() -> Self {
        let Some(hostname) = System::host_name().filter(|h| !h.is_empty()) else {
            return Self::unknown();
        };
        let ip = resolve_ip(&hostname)
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| UNKNOWN.to_string());

        Self { hostname, ip }
    }

    pub fn unknown() -> Self {
        Self {
            hostname: UNKNOWN.to_string(),
            ip: UNKNOWN.to_string(),
        }
    }
}

fn resolve_ip(hostname: &str) -> Option<IpAddr> {
    match (hostname, 0).to_socket_addrs() {
        Ok(addrs) => {
            let addrs: Vec<IpAddr> = addrs.map(|a| a.ip()).collect();
            // Prefer IPv4.
            addrs
                .iter()
                .find(|ip| ip.is_ipv4())
                .or_else(|| addrs.first())
                .copied()
        }
        Err(e) => {
            tracing::debug!(hostname, error = %e, "Failed to resolve local address");
            None
        }
    }
}
