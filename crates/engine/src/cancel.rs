//! Cooperative cancellation for in-flight model and action calls.

use std::future::Future;

pub use tokio_util::sync::CancellationToken;

/// Outcome of a future raced against a cancellation token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelAware<T> {
    Value(T),
    Cancelled,
}

pub fn is_cancelled(token: Option<&CancellationToken>) -> bool {
    token.is_some_and(CancellationToken::is_cancelled)
}

/// Run `fut` to completion unless `token` fires first; the future is
/// dropped on cancellation.
pub async fn await_or_cancel<T, F>(token: Option<&CancellationToken>, fut: F) -> CancelAware<T>
where
    F: Future<Output = T>,
{
    match token {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => CancelAware::Cancelled,
            value = fut => CancelAware::Value(value),
        },
        None => CancelAware::Value(fut.await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn returns_value_without_token() {
        assert_eq!(await_or_cancel(None, async { 42 }).await, CancelAware::Value(42));
        assert!(!is_cancelled(None));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_future_is_abandoned() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let out = await_or_cancel(Some(&token), async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            7
        })
        .await;
        assert_eq!(out, CancelAware::Cancelled);
        assert!(is_cancelled(Some(&token)));
    }
}
