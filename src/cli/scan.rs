//! Scan command implementation.
//!
//! Runs the gates in order (allow-list, resolution, port specification) and
//! only then starts probing.

use crate::auth::AllowList;
use crate::config::ScanSettings;
use crate::error::CliResult;
use crate::output::{self, OutputFormat};
use crate::scanner::{run_scan_with, Probe, ScanEvent, ScanJob, ScanReport, TcpProber};
use crate::types::{PortSet, Resolve, ResolverKind};
use clap::Args;
use std::future::Future;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Scan a host for open TCP ports.
#[derive(Args, Debug)]
pub struct ScanCommand {
    /// Host to scan (must be on the allow-list)
    #[arg(value_name = "HOST")]
    pub host: String,

    /// Ports to scan: "80", "22,80,443" or "20-100"
    #[arg(value_name = "PORT_SPEC", allow_hyphen_values = true)]
    pub port_spec: String,

    /// Connection timeout per port in milliseconds [default: 500]
    #[arg(short = 't', long)]
    pub timeout_ms: Option<u64>,

    /// Pause after each port in milliseconds, 0 disables [default: 10]
    #[arg(short = 'p', long)]
    pub pacing_ms: Option<u64>,

    /// Maximum number of probes in flight [default: 1]
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,

    /// Output format for the report [default: plain]
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Hostname resolver [default: system]
    #[arg(short, long, value_enum)]
    pub resolver: Option<ResolverKind>,
}

impl ScanCommand {
    /// Merge command-line overrides into loaded settings.
    pub fn settings(&self, config: Option<&Path>) -> CliResult<ScanSettings> {
        let mut settings = ScanSettings::load(config)?;

        if let Some(timeout_ms) = self.timeout_ms {
            settings.timeout_ms = timeout_ms;
        }
        if let Some(pacing_ms) = self.pacing_ms {
            settings.pacing_ms = pacing_ms;
        }
        if let Some(concurrency) = self.concurrency {
            settings.concurrency = concurrency;
        }
        if let Some(format) = self.format {
            settings.format = format;
        }
        if let Some(resolver) = self.resolver {
            settings.resolver = resolver;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Execute the scan command, stopping early on Ctrl-C.
    ///
    /// A sequential plain-text scan prints each port line as its result
    /// arrives; other modes print the report once the scan ends.
    pub async fn execute(&self, config: Option<&Path>) -> CliResult<()> {
        let settings = self.settings(config)?;
        let resolver = settings.resolver.build();
        let prober = Arc::new(TcpProber::new(settings.timeout()));
        let live = settings.format == OutputFormat::Plain && settings.concurrency == 1;

        debug!(
            resolver = %settings.resolver,
            format = %settings.format,
            timeout_ms = settings.timeout_ms,
            live,
            "scan settings"
        );

        if live {
            let mut stdout = io::stdout();
            let mut write_error = None;
            let report = execute_scan_with(
                &self.host,
                &self.port_spec,
                &AllowList::default(),
                resolver.as_ref(),
                prober,
                &settings.job(),
                interrupt(),
                |event| {
                    if let Err(e) = output::write_plain_event(&mut stdout, &event) {
                        write_error.get_or_insert(e);
                    }
                },
            )
            .await?;
            if let Some(e) = write_error {
                return Err(e.into());
            }
            output::write_footer(&mut stdout, &report)?;
            stdout.flush()?;
            return Ok(());
        }

        let report = execute_scan(
            &self.host,
            &self.port_spec,
            &AllowList::default(),
            resolver.as_ref(),
            prober,
            &settings.job(),
            interrupt(),
        )
        .await?;

        output::print_report(&report, settings.format)?;
        if report.interrupted && settings.format != OutputFormat::Plain {
            output::print_notice("Scan aborted by user.");
        }
        Ok(())
    }
}

/// Resolves on Ctrl-C. If the handler cannot be installed, never resolves.
async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("interrupt received, stopping scan");
}

/// Authorize, resolve, parse, then scan.
///
/// Every gate runs before the first probe. A rejected host never reaches the
/// resolver.
pub async fn execute_scan<P, F>(
    host: &str,
    port_spec: &str,
    allow_list: &AllowList,
    resolver: &dyn Resolve,
    prober: Arc<P>,
    job: &ScanJob,
    shutdown: F,
) -> CliResult<ScanReport>
where
    P: Probe + ?Sized + 'static,
    F: Future<Output = ()>,
{
    execute_scan_with(host, port_spec, allow_list, resolver, prober, job, shutdown, |_| {}).await
}

/// Like [`execute_scan`], forwarding scan progress to `observe`.
#[allow(clippy::too_many_arguments)]
pub async fn execute_scan_with<P, F, O>(
    host: &str,
    port_spec: &str,
    allow_list: &AllowList,
    resolver: &dyn Resolve,
    prober: Arc<P>,
    job: &ScanJob,
    shutdown: F,
    observe: O,
) -> CliResult<ScanReport>
where
    P: Probe + ?Sized + 'static,
    F: Future<Output = ()>,
    O: FnMut(ScanEvent<'_>),
{
    allow_list.authorize(host)?;
    let target = resolver.resolve_target(host).await?;
    let ports = PortSet::parse(port_spec)?;

    Ok(run_scan_with(prober, &target, &ports, job, shutdown, observe).await)
}
