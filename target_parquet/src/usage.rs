use std::time::Duration;

use reqwest::StatusCode;
use tokio::task::JoinHandle;
use tracing::{debug, info};

const COLLECTOR_URL: &str = "http://collector.singer.io/i";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Announces and starts the anonymous usage ping in the background.
///
/// The ping is best effort: failures are logged at debug and the run never
/// waits for it.
pub fn spawn_usage_ping(version: &'static str) -> JoinHandle<()> {
    info!(
        "sending version information to singer.io, set \"disable_collection\" to true to disable anonymous usage data"
    );

    tokio::spawn(async move {
        match send_usage_ping(version).await {
            Ok(status) => debug!(%status, "usage ping sent"),
            Err(err) => debug!(error = %err, "usage ping failed"),
        }
    })
}

async fn send_usage_ping(version: &str) -> Result<StatusCode, reqwest::Error> {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()?;

    let response = client
        .get(COLLECTOR_URL)
        .query(&usage_params(version))
        .send()
        .await?;

    Ok(response.status())
}

fn usage_params(version: &str) -> [(&'static str, &str); 5] {
    [
        ("e", "se"),
        ("aid", "singer"),
        ("se_ca", "target-parquet"),
        ("se_ac", "open"),
        ("se_la", version),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_params() {
        let params = usage_params("0.1.0");
        assert_eq!(params[2], ("se_ca", "target-parquet"));
        assert_eq!(params[4], ("se_la", "0.1.0"));
    }
}
