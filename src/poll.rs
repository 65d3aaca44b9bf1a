//! Poll loop against the touch endpoint
//!
//! A 200 from the touch endpoint does not mean the batch finished: a task
//! group without results yet comes back with an empty `Results` list. That
//! state is a named outcome here, distinct from both success and failure.

use crate::client::{parse_response, AuroraClient};
use crate::error::{ClientError, Result};
use crate::types::{CenterRequest, CenterResponse};
use reqwest::StatusCode;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

/// How far past the request's advisory `TimeoutDuration` the client keeps
/// polling before giving up, when no explicit deadline is configured.
const POLL_DEADLINE_FACTOR: u32 = 10;

/// Outcome of a single touch attempt
#[derive(Debug)]
pub enum TouchOutcome {
    /// Every task group has results; this is the final response
    Ready(CenterResponse),
    /// At least one task group is still running
    Pending,
}

impl AuroraClient {
    /// Poll the touch endpoint until the batch completes, sleeping
    /// `interval` between attempts.
    ///
    /// Polling is bounded: past the configured deadline (or one derived
    /// from the request's advisory timeout) the loop fails with
    /// [`ClientError::DeadlineExceeded`] instead of spinning forever.
    pub async fn poll_until_ready(
        &self,
        request: &CenterRequest,
        interval: Duration,
    ) -> Result<CenterResponse> {
        let budget = self
            .inner()
            .poll_deadline
            .unwrap_or_else(|| Duration::from_millis(u64::from(request.timeout_duration)) * POLL_DEADLINE_FACTOR);
        let deadline = Instant::now() + budget;
        let mut attempts: u64 = 0;

        loop {
            attempts += 1;
            match self.touch(request).await? {
                TouchOutcome::Ready(response) => {
                    debug!(batch_id = %response.batch_id, attempts, "batch complete");
                    return Ok(response);
                }
                TouchOutcome::Pending => {
                    trace!(batch_id = %request.batch_id, attempts, "batch still running");
                    if Instant::now() >= deadline {
                        return Err(ClientError::DeadlineExceeded(budget));
                    }
                    tokio::time::sleep(interval).await;
                }
            }
        }
    }

    /// Issue one touch request for the batch.
    ///
    /// Fails fast on a service-reported error; never sleeps or retries on
    /// its own.
    pub async fn touch(&self, request: &CenterRequest) -> Result<TouchOutcome> {
        let (status, body, _generation) = self
            .post_composite(&self.inner().touch_url, request)
            .await?;

        match status {
            StatusCode::BAD_REQUEST => Err(ClientError::Service {
                status: status.as_u16(),
                body,
            }),
            StatusCode::BAD_GATEWAY => Err(ClientError::TaskFailed(body)),
            StatusCode::OK => {
                let response = parse_response(&body)?;
                if response.is_complete() {
                    Ok(TouchOutcome::Ready(response))
                } else {
                    Ok(TouchOutcome::Pending)
                }
            }
            _ => Err(ClientError::Service {
                status: status.as_u16(),
                body: format!("unrecognized status: {}", body),
            }),
        }
    }
}
