//! Probe trait abstraction.
//!
//! Defines the per-port result types and the interface the scan loop drives,
//! so the loop can be tested against scripted probes.

use crate::types::Port;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Reachability verdict for a single port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    /// A TCP connection was accepted.
    Open,
    /// Refused, timed out, or failed.
    Closed,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

/// A connection attempt that failed in an unexpected way.
///
/// Refusals and timeouts are ordinary outcomes and never produce one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProbeError {
    #[error("network unreachable: {0}")]
    Unreachable(String),
    #[error("could not create socket: {0}")]
    Socket(String),
    #[error("connection failed: {0}")]
    Connect(String),
}

/// Result of probing a single port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// The port number that was probed.
    pub port: Port,
    pub verdict: Verdict,
    /// Diagnostic for an unexpected failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ProbeError>,
    /// Connect time in milliseconds, for open ports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
}

impl ProbeResult {
    pub fn open(port: Port, response_time_ms: u64) -> Self {
        Self {
            port,
            verdict: Verdict::Open,
            error: None,
            response_time_ms: Some(response_time_ms),
        }
    }

    pub fn closed(port: Port) -> Self {
        Self {
            port,
            verdict: Verdict::Closed,
            error: None,
            response_time_ms: None,
        }
    }

    pub fn failed(port: Port, error: ProbeError) -> Self {
        Self {
            error: Some(error),
            ..Self::closed(port)
        }
    }

    /// Check if the port is open.
    pub fn is_open(&self) -> bool {
        self.verdict == Verdict::Open
    }
}

/// A single bounded-time reachability test.
///
/// Implementations must not fail: every outcome is folded into the returned
/// [`ProbeResult`].
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, addr: IpAddr, port: Port) -> ProbeResult;
}
