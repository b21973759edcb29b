//! Timeout wrapper for external calls.
//!
//! Every completion issued by the pipeline is bounded by a caller-supplied
//! timeout; expiry surfaces as a `CompletionError` of category `Timeout` so the
//! calling stage treats it like any other failed call.
//!
//! ## Usage
//!
//! ```ignore
//! let completion = with_timeout(
//!     Duration::from_secs(60),
//!     client.complete(&request),
//!     "liver section",
//! ).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::types::CompletionError;

/// Execute a completion future with a timeout
pub async fn with_timeout<T, F>(
    timeout: Duration,
    future: F,
    operation_name: &str,
) -> Result<T, CompletionError>
where
    F: Future<Output = Result<T, CompletionError>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(CompletionError::timeout(operation_name, timeout)),
    }
}
