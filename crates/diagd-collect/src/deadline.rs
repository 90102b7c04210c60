//! Deadline wrapper for remote source calls
//!
//! Every provider runs its source call through [`with_deadline`]. The call
//! resolves to the value, to `ConnectionError` when the source failed, or to
//! `Timeout` when the deadline fired first. A timed-out future is dropped, so
//! a late answer is never observed.

use std::future::Future;
use std::time::Duration;

use diagd_core::domain::ErrorKind;
use diagd_core::ports::RpcError;
use tracing::debug;

/// Runs `operation` for at most `timeout`.
///
/// # Arguments
/// * `timeout` - Time allowed for the whole operation
/// * `operation` - Source call, including any connection setup
pub async fn with_deadline<T, F>(timeout: Duration, operation: F) -> Result<T, ErrorKind>
where
    F: Future<Output = Result<T, RpcError>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            debug!(error = %e, "Source call failed");
            Err(ErrorKind::ConnectionError)
        }
        Err(_) => Err(ErrorKind::Timeout),
    }
}
