//! Stats summary retrieval

use super::client::HttpClient;
use super::summary::Summary;
use crate::error::{FetchError, FetchResult};
use reqwest::StatusCode;
use tracing::debug;

/// Path where the kubelet serves its resource usage summary
pub const STATS_SUMMARY_PATH: &str = "/stats/summary";

/// Call the kubelet `/stats/summary` endpoint and decode the response.
///
/// A single attempt is made; retrying is up to the caller.
pub async fn fetch_summary(client: &dyn HttpClient) -> FetchResult<Summary> {
    let response = client.get(STATS_SUMMARY_PATH).await?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(FetchError::Status(status.as_u16()));
    }

    let body = response.bytes().await.map_err(FetchError::Read)?;
    debug!(bytes = body.len(), "Read stats summary body");

    let summary = serde_json::from_slice(&body)?;
    Ok(summary)
}
