use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use super::export::SyncPayload;

/// Outbound hook receiving a finished session's rows.
pub trait ResultSink: Send + Sync {
    /// Single best-effort attempt; callers never retry.
    fn push(
        &self,
        payload: &SyncPayload,
    ) -> impl Future<Output = Result<SyncReceipt, SyncError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncReceipt {
    Delivered { status: u16 },
    /// No collection endpoint is configured.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("collection endpoint unreachable: {0}")]
    Transport(String),
    #[error("collection endpoint answered with status {0}")]
    Status(u16),
    #[error("collection endpoint timed out")]
    Timeout,
    #[error("unable to build http client: {0}")]
    Client(String),
}

/// POSTs the payload as JSON to the configured collection endpoint.
#[derive(Debug, Clone)]
pub struct HttpResultSink {
    endpoint: Option<String>,
    http: Client,
}

impl HttpResultSink {
    pub fn new(endpoint: Option<String>, timeout: Duration) -> Result<Self, SyncError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| SyncError::Client(err.to_string()))?;
        Ok(Self { endpoint, http })
    }
}

impl ResultSink for HttpResultSink {
    async fn push(&self, payload: &SyncPayload) -> Result<SyncReceipt, SyncError> {
        let Some(endpoint) = self.endpoint.as_deref() else {
            return Ok(SyncReceipt::Skipped);
        };

        let response = self
            .http
            .post(endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    SyncError::Timeout
                } else {
                    SyncError::Transport(err.to_string())
                }
            })?;

        let status = response.status();
        debug!(endpoint, status = status.as_u16(), rows = payload.data.len(), "sync response");
        if status.is_success() {
            Ok(SyncReceipt::Delivered {
                status: status.as_u16(),
            })
        } else {
            Err(SyncError::Status(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_endpoint_skips_the_push() {
        let sink = HttpResultSink::new(None, Duration::from_secs(1)).expect("client builds");
        let receipt = sink
            .push(&SyncPayload::new(Vec::new()))
            .await
            .expect("skip is not an error");
        assert_eq!(receipt, SyncReceipt::Skipped);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let sink = HttpResultSink::new(
            Some("http://127.0.0.1:9/collect".to_string()),
            Duration::from_secs(2),
        )
        .expect("client builds");
        let err = sink
            .push(&SyncPayload::new(Vec::new()))
            .await
            .expect_err("nothing listens on the discard port");
        assert!(matches!(err, SyncError::Transport(_) | SyncError::Timeout));
    }
}
