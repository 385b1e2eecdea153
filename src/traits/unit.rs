//! The unit protocol: the uniform shape every registered artifact satisfies.
//!
//! Three kinds of callable artifacts exist:
//!
//! * [`Command`] — a state-changing operation addressed by name.
//! * [`Query`] — a read-only operation addressed by name.
//! * [`Resource`] — addressable, observable state addressed by an
//!   `asms://<domain>[/<id>]` URI.
//!
//! Commands and queries share the same shape; the split is semantic, and
//! hosts may route them differently (a read-only transport exposes only
//! queries). [`ResourceFactory`] creates resources for dynamic URIs the
//! registry has no direct entry for.
//!
//! Implementations must be safe for concurrent invocation: the registry
//! hands out shared references and does not serialize `execute`/`get`.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::context::RequestContext;
use crate::errors::CoreError;
use crate::schema::Schema;

/// A documented input/output pair attached to a command or query.
#[derive(Debug, Clone)]
pub struct Example {
    pub input: Map<String, Value>,
    pub output: Map<String, Value>,
    pub description: String,
}

/// A state-changing operation. `name` is globally unique within a registry.
#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &str;

    fn domain(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn input_schema(&self) -> Schema;

    fn output_schema(&self) -> Schema;

    fn examples(&self) -> Vec<Example> {
        Vec::new()
    }

    async fn execute(
        &self,
        ctx: &RequestContext,
        input: Map<String, Value>,
    ) -> Result<Map<String, Value>, CoreError>;
}

/// A read-only operation. Same shape as [`Command`], semantically
/// side-effect-free.
#[async_trait]
pub trait Query: Send + Sync {
    fn name(&self) -> &str;

    fn domain(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn input_schema(&self) -> Schema;

    fn output_schema(&self) -> Schema;

    fn examples(&self) -> Vec<Example> {
        Vec::new()
    }

    async fn execute(
        &self,
        ctx: &RequestContext,
        input: Map<String, Value>,
    ) -> Result<Map<String, Value>, CoreError>;
}

/// Addressable, observable state behind an `asms://` URI.
#[async_trait]
pub trait Resource: Send + Sync {
    fn uri(&self) -> &str;

    fn domain(&self) -> &str;

    fn schema(&self) -> Schema;

    async fn get(&self, ctx: &RequestContext) -> Result<Value, CoreError>;

    /// A pull-based update stream. Implementations poll on a per-domain
    /// cadence and close the channel when `cancel` fires; consumers are not
    /// assumed to read promptly (small buffer, blocking sends).
    async fn watch(
        &self,
        ctx: &RequestContext,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<Value>, CoreError>;
}

/// Creates resources for URI templates the registry has no direct entry
/// for, e.g. `asms://pipeline/<id>`.
pub trait ResourceFactory: Send + Sync {
    /// Human-readable URI template this factory serves.
    fn pattern(&self) -> &str;

    fn can_create(&self, uri: &str) -> bool;

    /// `Ok(None)` means "not mine after all"; the registry moves on to the
    /// next factory.
    fn create(&self, uri: &str) -> Result<Option<Arc<dyn Resource>>, CoreError>;
}

/// Spawns a detached polling task feeding a bounded channel, for `watch`
/// implementations.
///
/// `fetch` is invoked once per tick; its value is sent to the stream. The
/// task exits, closing the channel, when `cancel` fires or the consumer
/// drops the receiver. Fetch errors are logged and skipped so a transient
/// failure does not end the stream.
pub fn poll_stream<F, Fut>(
    cancel: CancellationToken,
    interval: Duration,
    capacity: usize,
    mut fetch: F,
) -> mpsc::Receiver<Value>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Value, CoreError>> + Send,
{
    let (tx, rx) = mpsc::channel(capacity);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match fetch().await {
                        Ok(value) => {
                            if tx.send(value).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::debug!(error = %e, "watch fetch failed, skipping tick");
                        }
                    }
                }
            }
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn test_poll_stream_emits_on_cadence_and_closes_on_cancel() {
        let cancel = CancellationToken::new();
        let mut counter = 0u64;
        let mut rx = poll_stream(cancel.clone(), Duration::from_secs(30), 8, move || {
            counter += 1;
            let value = json!({ "tick": counter });
            async move { Ok(value) }
        });

        // First tick fires immediately on interval creation.
        assert_eq!(rx.recv().await.unwrap(), json!({ "tick": 1 }));
        assert_eq!(rx.recv().await.unwrap(), json!({ "tick": 2 }));

        cancel.cancel();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_stream_skips_failed_fetches() {
        let cancel = CancellationToken::new();
        let mut counter = 0u64;
        let mut rx = poll_stream(cancel.clone(), Duration::from_secs(1), 8, move || {
            counter += 1;
            let result = if counter == 1 {
                Err(crate::errors::CoreError::new(
                    crate::errors::codes::INTERNAL,
                    "flaky",
                ))
            } else {
                Ok(json!(counter))
            };
            async move { result }
        });

        assert_eq!(rx.recv().await.unwrap(), json!(2));
        cancel.cancel();
    }
}
