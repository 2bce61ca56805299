//! Command-line interface definitions for portgate.
//!
//! Uses `clap` derive macros for declarative argument parsing.

mod scan;

pub use scan::{execute_scan, ScanCommand};

use clap::Parser;
use std::path::PathBuf;

/// Probe TCP ports on an allow-listed host.
///
/// Only 127.0.0.1, localhost and scanme.nmap.org may be scanned.
#[derive(Parser, Debug)]
#[command(name = "portgate")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "An allow-listed TCP port prober", long_about = None)]
#[command(after_help = "Examples:\n  portgate 127.0.0.1 20-100\n  portgate scanme.nmap.org 22,80,443")]
pub struct Cli {
    #[command(flatten)]
    pub scan: ScanCommand,

    /// Path to a JSON settings file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log probe activity to stderr
    #[arg(short, long)]
    pub verbose: bool,
}
