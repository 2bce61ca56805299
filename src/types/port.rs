//! Port types with validation and parsing.
//!
//! The `Port` newtype ensures values are always valid port numbers (1-65535).
//! `PortSet` turns a textual port specification into the ordered list of
//! ports a scan walks.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;
use tracing::warn;

/// A validated network port number (1-65535).
///
/// Using a newtype prevents accidental misuse of raw u16 values
/// and ensures port numbers are always valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Port(u16);

impl Port {
    /// Minimum valid port number.
    pub const MIN: u16 = 1;
    /// Maximum valid port number.
    pub const MAX: u16 = 65535;

    /// Create a new Port from a u16, returning None if invalid.
    #[inline]
    pub const fn new(port: u16) -> Option<Self> {
        if port >= Self::MIN {
            Some(Self(port))
        } else {
            None
        }
    }

    /// Get the raw port number.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

/// Error type for port specification parsing.
///
/// Both kinds are fatal to the caller; they only differ in the message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortSpecError {
    #[error("invalid port format '{0}', use '20-100', '22,80,443' or '80'")]
    InvalidFormat(String),
    #[error("no valid ports to scan, ports must be within 1-65535")]
    NoValidPorts,
}

/// One parsed integer from a specification.
///
/// Tokens that are well-formed integers but do not fit in an `i64` are kept
/// as out-of-range rather than treated as a format error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Candidate {
    Value(i64),
    Overflow,
}

fn parse_candidate(token: &str) -> Result<Candidate, PortSpecError> {
    let token = token.trim();
    match token.parse::<i64>() {
        Ok(value) => Ok(Candidate::Value(value)),
        Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => {
            Ok(Candidate::Overflow)
        }
        Err(_) => Err(PortSpecError::InvalidFormat(token.to_string())),
    }
}

fn in_range(value: i64) -> Option<Port> {
    u16::try_from(value).ok().and_then(Port::new)
}

/// A non-empty, ascending, deduplicated set of ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PortSet {
    ports: Vec<Port>,
}

impl PortSet {
    /// Parse a port specification.
    ///
    /// Accepted forms, checked in this order:
    /// - Range: "20-100" (inclusive)
    /// - Comma-separated: "22,80,443"
    /// - Single port: "80"
    ///
    /// Out-of-range ports are dropped with a warning. An unparseable token
    /// fails the whole specification.
    pub fn parse(spec: &str) -> Result<Self, PortSpecError> {
        let mut ports = BTreeSet::new();

        if spec.contains('-') {
            let bounds: Vec<&str> = spec.split('-').collect();
            if bounds.len() != 2 {
                return Err(PortSpecError::InvalidFormat(spec.trim().to_string()));
            }
            let start = parse_candidate(bounds[0])?;
            let end = parse_candidate(bounds[1])?;
            expand_range(start, end, &mut ports);
        } else if spec.contains(',') {
            let candidates = spec
                .split(',')
                .map(parse_candidate)
                .collect::<Result<Vec<_>, _>>()?;
            for candidate in candidates {
                insert_checked(candidate, &mut ports);
            }
        } else {
            insert_checked(parse_candidate(spec)?, &mut ports);
        }

        if ports.is_empty() {
            return Err(PortSpecError::NoValidPorts);
        }

        Ok(Self {
            ports: ports.into_iter().collect(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Port> + '_ {
        self.ports.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// Always false for a successfully parsed set.
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

fn insert_checked(candidate: Candidate, ports: &mut BTreeSet<Port>) {
    match candidate {
        Candidate::Value(value) => match in_range(value) {
            Some(port) => {
                ports.insert(port);
            }
            None => warn!(port = value, "invalid port number, must be 1-65535"),
        },
        Candidate::Overflow => warn!("invalid port number, must be 1-65535"),
    }
}

fn expand_range(start: Candidate, end: Candidate, ports: &mut BTreeSet<Port>) {
    // An overflowing bound sits past either end of the valid window.
    let start = match start {
        Candidate::Value(v) => v,
        Candidate::Overflow => i64::MAX,
    };
    let end = match end {
        Candidate::Value(v) => v,
        Candidate::Overflow => i64::MAX,
    };
    if start > end {
        return;
    }

    let low = start.max(i64::from(Port::MIN));
    let high = end.min(i64::from(Port::MAX));
    if low <= high {
        ports.extend((low..=high).filter_map(in_range));
    }

    let requested = end.saturating_sub(start).saturating_add(1);
    let kept = if low <= high { high - low + 1 } else { 0 };
    let dropped = requested.saturating_sub(kept);
    if dropped > 0 {
        warn!(start, end, dropped, "ports outside 1-65535 dropped from range");
    }
}

impl FromStr for PortSet {
    type Err = PortSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PortSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ports.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}
