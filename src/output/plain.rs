//! Plain text output formatting.
//!
//! Produces the human-readable report, coloured when stdout is a terminal.

use crate::scanner::{ProbeResult, ScanEvent, ScanReport, Verdict};
use chrono::{DateTime, Local};
use console::style;
use std::io::{self, Write};
use std::net::IpAddr;

const RULE: &str = "--------------------------------------------------";
const TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";

fn timestamp(at: &DateTime<Local>) -> String {
    at.format(TIMESTAMP).to_string()
}

/// Write the report in human-readable plain text format.
pub fn write_plain<W: Write>(out: &mut W, report: &ScanReport) -> io::Result<()> {
    write_header(out, &report.target, report.ip_address, &report.started_at)?;
    for result in &report.results {
        write_port_line(out, result)?;
    }
    write_footer(out, report)
}

/// Write the part of the plain report a scan event contributes.
///
/// Feeding every event of a sequential scan and then [`write_footer`]
/// produces the same text as [`write_plain`].
pub fn write_plain_event<W: Write>(out: &mut W, event: &ScanEvent<'_>) -> io::Result<()> {
    match event {
        ScanEvent::Started { target, started_at } => {
            write_header(out, &target.original, target.ip, started_at)
        }
        ScanEvent::Recorded(result) => write_port_line(out, result),
    }
}

fn write_header<W: Write>(
    out: &mut W,
    target: &str,
    ip: IpAddr,
    started_at: &DateTime<Local>,
) -> io::Result<()> {
    writeln!(out, "{}", style(RULE).dim())?;
    writeln!(out, "Scanning Target: {} ({})", style(target).bold(), ip)?;
    writeln!(out, "Scan Started at: {}", timestamp(started_at))?;
    writeln!(out, "{}", style(RULE).dim())
}

fn write_port_line<W: Write>(out: &mut W, result: &ProbeResult) -> io::Result<()> {
    let verdict = match result.verdict {
        Verdict::Open => style(result.verdict.to_string()).green().bold(),
        Verdict::Closed => style(result.verdict.to_string()).red(),
    };
    writeln!(out, "Port {}: {}", result.port, verdict)
}

/// Write the closing summary of the plain report.
pub fn write_footer<W: Write>(out: &mut W, report: &ScanReport) -> io::Result<()> {
    writeln!(out, "{}", style(RULE).dim())?;
    writeln!(out, "Scan Finished at: {}", timestamp(&report.finished_at))?;
    if report.interrupted {
        writeln!(out, "{}", style("Scan aborted by user.").yellow())?;
    }
    if report.open_ports.is_empty() {
        writeln!(out, "Scan Complete. No open ports found in the specified range.")?;
    } else {
        let open: Vec<String> = report.open_ports.iter().map(|p| p.to_string()).collect();
        writeln!(
            out,
            "Scan Complete. Open Ports found: {}",
            style(open.join(", ")).green().bold()
        )?;
    }
    writeln!(out, "{}", style(RULE).dim())
}

/// Print a fatal diagnostic.
pub fn print_error(msg: &str) {
    println!("{} {}", style("ERROR:").red().bold(), msg);
}

/// Print a one-line notice to stderr, keeping stdout machine-readable.
pub fn print_notice(msg: &str) {
    eprintln!("{}", style(msg).yellow());
}
