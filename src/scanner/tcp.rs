//! TCP connect probe.
//!
//! Performs a plain connect() through the operating system's socket API.
//! No special privileges are needed.

use crate::scanner::traits::{Probe, ProbeError, ProbeResult};
use crate::types::Port;
use async_trait::async_trait;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// TCP connect prober with a per-attempt timeout.
#[derive(Debug, Clone)]
pub struct TcpProber {
    timeout: Duration,
}

impl TcpProber {
    /// Default per-probe timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for TcpProber {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT)
    }
}

/// Sort a connect error into an ordinary closed outcome or a diagnostic.
fn classify(e: io::Error) -> Option<ProbeError> {
    match e.kind() {
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::TimedOut => None,
        io::ErrorKind::AddrNotAvailable | io::ErrorKind::AddrInUse => {
            Some(ProbeError::Socket(e.to_string()))
        }
        _ => {
            let message = e.to_string();
            if message.to_lowercase().contains("unreachable") {
                Some(ProbeError::Unreachable(message))
            } else {
                Some(ProbeError::Connect(message))
            }
        }
    }
}

#[async_trait]
impl Probe for TcpProber {
    async fn probe(&self, addr: IpAddr, port: Port) -> ProbeResult {
        let target = SocketAddr::new(addr, port.as_u16());
        let start = Instant::now();

        // The stream is dropped at the end of each arm, closing the socket.
        match timeout(self.timeout, TcpStream::connect(target)).await {
            Ok(Ok(_stream)) => {
                let elapsed = start.elapsed().as_millis() as u64;
                debug!(%target, elapsed_ms = elapsed, "port open");
                ProbeResult::open(port, elapsed)
            }
            Ok(Err(e)) => match classify(e) {
                None => {
                    debug!(%target, "port closed");
                    ProbeResult::closed(port)
                }
                Some(error) => {
                    debug!(%target, %error, "probe failed");
                    ProbeResult::failed(port, error)
                }
            },
            Err(_) => {
                debug!(%target, timeout_ms = self.timeout.as_millis() as u64, "probe timed out");
                ProbeResult::closed(port)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::traits::Verdict;
    use std::net::Ipv4Addr;
    use tokio::net::TcpListener;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    /// A local port with nothing listening on it.
    async fn closed_port() -> Port {
        let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        Port::new(port).unwrap()
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(TcpProber::default().timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_classify_ordinary_errors() {
        for kind in [io::ErrorKind::ConnectionRefused, io::ErrorKind::TimedOut] {
            assert_eq!(classify(io::Error::from(kind)), None);
        }
        assert!(matches!(
            classify(io::Error::new(io::ErrorKind::Other, "Network is unreachable")),
            Some(ProbeError::Unreachable(_))
        ));
        assert!(matches!(
            classify(io::Error::from(io::ErrorKind::PermissionDenied)),
            Some(ProbeError::Connect(_))
        ));
    }

    #[tokio::test]
    async fn test_open_port() {
        let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
        let port = Port::new(listener.local_addr().unwrap().port()).unwrap();

        let result = TcpProber::default().probe(LOCALHOST, port).await;
        assert_eq!(result.verdict, Verdict::Open);
        assert!(result.response_time_ms.is_some());
    }

    #[tokio::test]
    async fn test_closed_port_within_timeout() {
        let port = closed_port().await;
        let prober = TcpProber::new(Duration::from_millis(200));

        let start = Instant::now();
        let result = prober.probe(LOCALHOST, port).await;

        assert_eq!(result.verdict, Verdict::Closed);
        assert!(result.error.is_none());
        assert!(start.elapsed() < Duration::from_millis(200) + Duration::from_millis(250));
    }
}
