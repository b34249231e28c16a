//! The per-item work function seam

use crate::utils::error::WorkError;
use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

/// Asynchronous operation applied to each admitted item.
///
/// Implemented for any `Fn(String) -> impl Future<Output = Result<(), E>>`
/// where `E: Display`, so closures work directly:
///
/// ```rust,ignore
/// controller.start(|id: String| async move {
///     compress(&id).await
/// });
/// ```
#[async_trait]
pub trait WorkFn: Send + Sync + 'static {
    async fn execute(&self, item_id: &str) -> Result<(), WorkError>;
}

#[async_trait]
impl<F, Fut, E> WorkFn for F
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send,
    E: Display,
{
    async fn execute(&self, item_id: &str) -> Result<(), WorkError> {
        (self)(item_id.to_string())
            .await
            .map_err(|e| WorkError::failed(e.to_string()))
    }
}

/// Run one attempt, turning panics and timeouts into `WorkError`s
pub(crate) async fn run_attempt(
    work: Arc<dyn WorkFn>,
    item_id: String,
    timeout: Option<Duration>,
) -> Result<(), WorkError> {
    let attempt = AssertUnwindSafe(async move { work.execute(&item_id).await }).catch_unwind();

    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, attempt).await {
            Ok(outcome) => outcome,
            Err(_) => return Err(WorkError::Timeout(limit)),
        },
        None => attempt.await,
    };

    outcome.unwrap_or_else(|payload| Err(WorkError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
