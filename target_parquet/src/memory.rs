use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

const REPORT_INTERVAL: Duration = Duration::from_secs(30);

/// Logs the resident set size at debug level until cancelled.
pub async fn report_memory(ct: CancellationToken) {
    let mut interval = tokio::time::interval(REPORT_INTERVAL);

    loop {
        tokio::select! {
            biased;
            _ = ct.cancelled() => break,
            _ = interval.tick() => match resident_memory_kb() {
                Some(rss_kb) => debug!(rss_kb, "memory usage"),
                None => debug!("memory usage unavailable on this platform"),
            },
        }
    }
}

#[cfg(target_os = "linux")]
fn resident_memory_kb() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_vm_rss(&status)
}

#[cfg(not(target_os = "linux"))]
fn resident_memory_kb() -> Option<u64> {
    None
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_vm_rss(status: &str) -> Option<u64> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse().ok())
}
