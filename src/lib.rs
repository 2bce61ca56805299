//! # portgate - an allow-listed TCP port prober
//!
//! portgate checks which TCP ports on a host accept a connection within a
//! bounded time. It only scans hosts on a fixed allow-list, and that check
//! happens before any DNS lookup or socket is created.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use portgate::auth::AllowList;
//! use portgate::scanner::{run_scan, ScanJob, TcpProber};
//! use portgate::types::{PortSet, Resolve, SystemResolver};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     AllowList::default().authorize("localhost").unwrap();
//!     let target = SystemResolver.resolve_target("localhost").await.unwrap();
//!     let ports: PortSet = "20-25".parse().unwrap();
//!
//!     let report = run_scan(
//!         Arc::new(TcpProber::default()),
//!         &target,
//!         &ports,
//!         &ScanJob::default(),
//!         std::future::pending(),
//!     )
//!     .await;
//!
//!     println!("open: {:?}", report.open_ports);
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - ports, port sets, targets and resolvers
//! - [`auth`] - the allow-list gate
//! - [`scanner`] - the TCP probe and the scan loop
//! - [`output`] - plain, JSON and CSV reports
//! - [`config`] - scan settings
//! - [`cli`] - the `portgate` command
//! - [`echo`] - the echo server/client demo

pub mod auth;
pub mod cli;
pub mod config;
pub mod echo;
pub mod error;
pub mod logging;
pub mod output;
pub mod scanner;
pub mod types;

// Re-export commonly used types
pub use auth::{AllowList, AuthorizationError};
pub use error::{CliError, CliResult};
pub use scanner::{ProbeResult, ScanReport, Verdict};
pub use types::{Port, PortSet, PortSpecError, ScanTarget};
