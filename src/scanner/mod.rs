//! Scanner module - drives probes over a port set.
//!
//! Probes run in ascending port order. A sequential scan sleeps for the
//! pacing delay after each result; a concurrent scan spaces probe starts
//! with a shared token bucket instead. Per-port failures are
//! recorded in the report and never stop the scan. A shutdown future ends
//! the scan early with whatever results have completed.

pub mod rate_limiter;
pub mod tcp;
pub mod traits;

use crate::types::{Port, PortSet, ScanTarget};
use chrono::{DateTime, Local};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub use rate_limiter::Pacer;
pub use tcp::TcpProber;
pub use traits::{Probe, ProbeError, ProbeResult, Verdict};

/// How a scan walks its ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanJob {
    /// Pause after each result when sequential, or the minimum spacing of
    /// probe starts when concurrent. Zero disables pacing.
    pub pacing: Duration,
    /// Maximum probes in flight. 1 means strictly sequential.
    pub concurrency: usize,
}

impl Default for ScanJob {
    fn default() -> Self {
        Self {
            pacing: Pacer::DEFAULT_PERIOD,
            concurrency: 1,
        }
    }
}

impl ScanJob {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pacing delay.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Set the concurrency level (clamped to at least 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// The finalized outcome of one scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub target: String,
    pub ip_address: IpAddr,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub duration_ms: u64,
    /// Ports in the requested set, scanned or not.
    pub ports_requested: usize,
    /// True when the scan was cancelled before the port set was exhausted.
    pub interrupted: bool,
    /// Open ports, ascending.
    pub open_ports: Vec<Port>,
    /// One entry per completed probe, ascending by port.
    pub results: Vec<ProbeResult>,
}

impl ScanReport {
    pub fn ports_scanned(&self) -> usize {
        self.results.len()
    }

    pub fn open_count(&self) -> usize {
        self.open_ports.len()
    }

    pub fn closed_count(&self) -> usize {
        self.results.len() - self.open_ports.len()
    }

    /// Probes that recorded an unexpected error.
    pub fn error_count(&self) -> usize {
        self.results.iter().filter(|r| r.error.is_some()).count()
    }
}

/// Accumulates results while a scan is running.
#[derive(Debug)]
struct ReportBuilder {
    target: ScanTarget,
    started_at: DateTime<Local>,
    clock: Instant,
    ports_requested: usize,
    results: Vec<ProbeResult>,
}

impl ReportBuilder {
    fn start(target: &ScanTarget, ports_requested: usize) -> Self {
        Self {
            target: target.clone(),
            started_at: Local::now(),
            clock: Instant::now(),
            ports_requested,
            results: Vec::with_capacity(ports_requested),
        }
    }

    fn record(&mut self, result: ProbeResult) {
        if let Some(error) = &result.error {
            warn!(port = %result.port, %error, "probe error, continuing");
        }
        self.results.push(result);
    }

    fn finish(mut self, interrupted: bool) -> ScanReport {
        self.results.sort_by_key(|r| r.port);
        let open_ports = self
            .results
            .iter()
            .filter(|r| r.is_open())
            .map(|r| r.port)
            .collect();

        ScanReport {
            target: self.target.original,
            ip_address: self.target.ip,
            started_at: self.started_at,
            finished_at: Local::now(),
            duration_ms: self.clock.elapsed().as_millis() as u64,
            ports_requested: self.ports_requested,
            interrupted,
            open_ports,
            results: self.results,
        }
    }
}

/// Progress notifications emitted while a scan runs.
#[derive(Debug, Clone, Copy)]
pub enum ScanEvent<'a> {
    /// Emitted once, before the first probe.
    Started {
        target: &'a ScanTarget,
        started_at: DateTime<Local>,
    },
    /// Emitted for each probe as its result is recorded.
    Recorded(&'a ProbeResult),
}

/// Execute a complete scan of `ports` on `target`.
///
/// Resolves once every port has been probed or `shutdown` completes,
/// whichever comes first. Pass `std::future::pending()` to never cancel.
pub async fn run_scan<P, F>(
    prober: Arc<P>,
    target: &ScanTarget,
    ports: &PortSet,
    job: &ScanJob,
    shutdown: F,
) -> ScanReport
where
    P: Probe + ?Sized + 'static,
    F: Future<Output = ()>,
{
    run_scan_with(prober, target, ports, job, shutdown, |_| {}).await
}

/// Like [`run_scan`], calling `observe` as the scan progresses.
pub async fn run_scan_with<P, F, O>(
    prober: Arc<P>,
    target: &ScanTarget,
    ports: &PortSet,
    job: &ScanJob,
    shutdown: F,
    mut observe: O,
) -> ScanReport
where
    P: Probe + ?Sized + 'static,
    F: Future<Output = ()>,
    O: FnMut(ScanEvent<'_>),
{
    let mut report = ReportBuilder::start(target, ports.len());

    debug!(
        target = %target,
        ports = ports.len(),
        concurrency = job.concurrency,
        pacing_ms = job.pacing.as_millis() as u64,
        "scan started"
    );
    observe(ScanEvent::Started {
        target,
        started_at: report.started_at,
    });

    tokio::pin!(shutdown);
    let interrupted = if job.concurrency <= 1 {
        scan_sequential(&*prober, target.ip, ports, job.pacing, shutdown, &mut report, &mut observe)
            .await
    } else {
        scan_pooled(prober, target.ip, ports, job, shutdown, &mut report, &mut observe).await
    };

    let report = report.finish(interrupted);
    info!(
        target = %target,
        scanned = report.ports_scanned(),
        open = report.open_count(),
        errors = report.error_count(),
        interrupted,
        duration_ms = report.duration_ms,
        "scan finished"
    );
    report
}

/// One port at a time: probe, record, then sleep for `pacing`.
///
/// No sleep follows the last port. Returns true when `shutdown` fired.
async fn scan_sequential<P, F, O>(
    prober: &P,
    addr: IpAddr,
    ports: &PortSet,
    pacing: Duration,
    mut shutdown: Pin<&mut F>,
    report: &mut ReportBuilder,
    observe: &mut O,
) -> bool
where
    P: Probe + ?Sized,
    F: Future<Output = ()>,
    O: FnMut(ScanEvent<'_>),
{
    let mut remaining = ports.iter().peekable();
    while let Some(port) = remaining.next() {
        let result = tokio::select! {
            biased;
            _ = shutdown.as_mut() => return true,
            result = prober.probe(addr, port) => result,
        };
        observe(ScanEvent::Recorded(&result));
        report.record(result);

        if pacing.is_zero() || remaining.peek().is_none() {
            continue;
        }
        tokio::select! {
            biased;
            _ = shutdown.as_mut() => return true,
            _ = tokio::time::sleep(pacing) => {}
        }
    }
    false
}

/// Up to `job.concurrency` probes in flight, their starts spaced by a
/// shared [`Pacer`]. Returns true when `shutdown` fired.
async fn scan_pooled<P, F, O>(
    prober: Arc<P>,
    addr: IpAddr,
    ports: &PortSet,
    job: &ScanJob,
    mut shutdown: Pin<&mut F>,
    report: &mut ReportBuilder,
    observe: &mut O,
) -> bool
where
    P: Probe + ?Sized + 'static,
    F: Future<Output = ()>,
    O: FnMut(ScanEvent<'_>),
{
    let pacer = Pacer::new(job.pacing);
    let probes = stream::iter(ports.iter())
        .map(|port| {
            let prober = Arc::clone(&prober);
            let pacer = pacer.clone();
            async move {
                pacer.wait().await;
                prober.probe(addr, port).await
            }
        })
        .buffer_unordered(job.concurrency);
    tokio::pin!(probes);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.as_mut() => return true,
            next = probes.next() => match next {
                Some(result) => {
                    observe(ScanEvent::Recorded(&result));
                    report.record(result);
                }
                None => return false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::future::pending;
    use std::net::Ipv4Addr;
    use std::sync::Mutex;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    /// Probe with scripted verdicts and per-port delays.
    #[derive(Default)]
    struct ScriptedProbe {
        open: Vec<u16>,
        failing: Vec<u16>,
        delays: HashMap<u16, Duration>,
        calls: Mutex<Vec<u16>>,
    }

    #[async_trait]
    impl Probe for ScriptedProbe {
        async fn probe(&self, _addr: IpAddr, port: Port) -> ProbeResult {
            self.calls.lock().unwrap().push(port.as_u16());
            if let Some(delay) = self.delays.get(&port.as_u16()) {
                tokio::time::sleep(*delay).await;
            }
            if self.failing.contains(&port.as_u16()) {
                ProbeResult::failed(port, ProbeError::Connect("scripted".into()))
            } else if self.open.contains(&port.as_u16()) {
                ProbeResult::open(port, 1)
            } else {
                ProbeResult::closed(port)
            }
        }
    }

    fn target() -> ScanTarget {
        ScanTarget::new("127.0.0.1", LOCALHOST)
    }

    fn unpaced() -> ScanJob {
        ScanJob::new().with_pacing(Duration::ZERO)
    }

    fn ports_of(report: &ScanReport) -> Vec<u16> {
        report.results.iter().map(|r| r.port.as_u16()).collect()
    }

    #[tokio::test]
    async fn test_sequential_scan_in_port_order() {
        let probe = Arc::new(ScriptedProbe {
            open: vec![22, 443],
            ..Default::default()
        });
        let ports: PortSet = "443,80,22".parse().unwrap();

        let report = run_scan(probe.clone(), &target(), &ports, &unpaced(), pending()).await;

        assert_eq!(*probe.calls.lock().unwrap(), vec![22, 80, 443]);
        assert_eq!(ports_of(&report), vec![22, 80, 443]);
        assert_eq!(report.open_ports, vec![Port::new(22).unwrap(), Port::new(443).unwrap()]);
        assert_eq!(report.closed_count(), 1);
        assert!(!report.interrupted);
    }

    #[tokio::test]
    async fn test_probe_error_does_not_abort() {
        let probe = Arc::new(ScriptedProbe {
            open: vec![3],
            failing: vec![2],
            ..Default::default()
        });
        let ports: PortSet = "1-3".parse().unwrap();

        let report = run_scan(probe, &target(), &ports, &unpaced(), pending()).await;

        assert_eq!(report.ports_scanned(), 3);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.results[1].verdict, Verdict::Closed);
        assert!(report.results[2].is_open());
    }

    #[tokio::test]
    async fn test_concurrent_scan_still_sorted() {
        let mut delays = HashMap::new();
        delays.insert(1, Duration::from_millis(80));
        delays.insert(2, Duration::from_millis(40));
        let probe = Arc::new(ScriptedProbe {
            delays,
            ..Default::default()
        });
        let ports: PortSet = "1-4".parse().unwrap();
        let job = unpaced().with_concurrency(4);

        let report = run_scan(probe, &target(), &ports, &job, pending()).await;

        assert_eq!(ports_of(&report), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_pacing_spaces_probes() {
        let probe = Arc::new(ScriptedProbe::default());
        let ports: PortSet = "1-5".parse().unwrap();
        let job = ScanJob::new().with_pacing(Duration::from_millis(20));

        let start = Instant::now();
        let report = run_scan(probe, &target(), &ports, &job, pending()).await;

        assert_eq!(report.ports_scanned(), 5);
        assert!(start.elapsed() >= Duration::from_millis(75));
    }

    /// Records when each call began and ended.
    #[derive(Default)]
    struct TimedProbe {
        spans: Mutex<Vec<(Instant, Instant)>>,
    }

    #[async_trait]
    impl Probe for TimedProbe {
        async fn probe(&self, _addr: IpAddr, port: Port) -> ProbeResult {
            let began = Instant::now();
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.spans.lock().unwrap().push((began, Instant::now()));
            ProbeResult::closed(port)
        }
    }

    #[tokio::test]
    async fn test_pacing_waits_after_each_result() {
        let probe = Arc::new(TimedProbe::default());
        let ports: PortSet = "1-4".parse().unwrap();
        let job = ScanJob::new().with_pacing(Duration::from_millis(20));

        run_scan(probe.clone(), &target(), &ports, &job, pending()).await;

        let spans = probe.spans.lock().unwrap();
        assert_eq!(spans.len(), 4);
        for pair in spans.windows(2) {
            let gap = pair[1].0.duration_since(pair[0].1);
            assert!(gap >= Duration::from_millis(18), "gap was {gap:?}");
        }
    }

    #[tokio::test]
    async fn test_shutdown_during_pacing_delay() {
        let probe = Arc::new(ScriptedProbe::default());
        let ports: PortSet = "1-3".parse().unwrap();
        let job = ScanJob::new().with_pacing(Duration::from_secs(10));

        let start = Instant::now();
        let report = run_scan(probe.clone(), &target(), &ports, &job, async {
            tokio::time::sleep(Duration::from_millis(50)).await;
        })
        .await;

        assert!(report.interrupted);
        assert_eq!(ports_of(&report), vec![1]);
        assert_eq!(*probe.calls.lock().unwrap(), vec![1]);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_observer_sees_start_then_each_result() {
        let probe = Arc::new(ScriptedProbe {
            open: vec![2],
            ..Default::default()
        });
        let ports: PortSet = "1-3".parse().unwrap();
        let mut seen = Vec::new();

        let report = run_scan_with(probe, &target(), &ports, &unpaced(), pending(), |event| {
            seen.push(match event {
                ScanEvent::Started { target, .. } => target.original.clone(),
                ScanEvent::Recorded(result) => format!("{}:{}", result.port, result.verdict),
            });
        })
        .await;

        assert_eq!(seen, vec!["127.0.0.1", "1:CLOSED", "2:OPEN", "3:CLOSED"]);
        assert_eq!(report.ports_scanned(), 3);
    }

    #[tokio::test]
    async fn test_pooled_scan_reports_every_result() {
        let probe = Arc::new(ScriptedProbe::default());
        let ports: PortSet = "1-6".parse().unwrap();
        let job = ScanJob::new()
            .with_pacing(Duration::from_millis(5))
            .with_concurrency(3);
        let mut recorded = 0;

        let report = run_scan_with(probe, &target(), &ports, &job, pending(), |event| {
            if let ScanEvent::Recorded(_) = event {
                recorded += 1;
            }
        })
        .await;

        assert_eq!(recorded, 6);
        assert_eq!(ports_of(&report), vec![1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn test_shutdown_yields_partial_report() {
        let mut delays = HashMap::new();
        for port in 1..=10 {
            delays.insert(port, Duration::from_millis(30));
        }
        let probe = Arc::new(ScriptedProbe {
            delays,
            ..Default::default()
        });
        let ports: PortSet = "1-10".parse().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = tx.send(());
        });

        let report = run_scan(probe, &target(), &ports, &unpaced(), async {
            let _ = rx.await;
        })
        .await;

        assert!(report.interrupted);
        assert!(report.ports_scanned() > 0);
        assert!(report.ports_scanned() < 10);
        assert_eq!(report.ports_requested, 10);
        let scanned = ports_of(&report);
        let expected: Vec<u16> = (1..=scanned.len() as u16).collect();
        assert_eq!(scanned, expected);
    }

    #[tokio::test]
    async fn test_single_closed_port_against_localhost() {
        let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let ports: PortSet = format!("{port}-{port}").parse().unwrap();
        let prober = Arc::new(TcpProber::default());
        let report = run_scan(prober, &target(), &ports, &ScanJob::default(), pending()).await;

        assert_eq!(report.ports_scanned(), 1);
        assert_eq!(report.results[0].verdict, Verdict::Closed);
        assert!(report.open_ports.is_empty());
    }

    #[tokio::test]
    async fn test_repeat_scans_agree() {
        let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
        let open = listener.local_addr().unwrap().port();
        let ports: PortSet = format!("{},{}", open, open.saturating_sub(1).max(1))
            .parse()
            .unwrap();
        let prober = Arc::new(TcpProber::default());

        let first = run_scan(prober.clone(), &target(), &ports, &unpaced(), pending()).await;
        let second = run_scan(prober, &target(), &ports, &unpaced(), pending()).await;

        assert_eq!(ports_of(&first), ports_of(&second));
        assert_eq!(first.open_count(), second.open_count());
        assert!(first.open_ports.contains(&Port::new(open).unwrap()));
    }
}
