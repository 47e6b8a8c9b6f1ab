//! Cancellable waits.
//!
//! [`settle`] is a fixed convergence delay for state that cannot be
//! observed. [`wait_until`] polls an observable condition instead.

use kitsmith_core::WorldError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Sleep for `duration` unless cancelled first.
pub async fn settle(cancel: &CancellationToken, duration: Duration) -> Result<(), WorldError> {
    if cancel.is_cancelled() {
        return Err(WorldError::Cancelled);
    }
    if duration.is_zero() {
        return Ok(());
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(WorldError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

/// Poll `probe` every `interval` until it returns `true` or `timeout`
/// elapses. Returns whether the condition was observed.
pub async fn wait_until<F, Fut>(
    cancel: &CancellationToken,
    interval: Duration,
    timeout: Duration,
    mut probe: F,
) -> Result<bool, WorldError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, WorldError>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if probe().await? {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        settle(cancel, interval).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn wait_until_observes_condition() {
        let cancel = CancellationToken::new();
        let polls = Arc::new(AtomicU32::new(0));
        let counter = polls.clone();

        let seen = wait_until(&cancel, Duration::from_millis(100), Duration::from_secs(2), move || {
            let counter = counter.clone();
            async move { Ok(counter.fetch_add(1, Ordering::SeqCst) >= 3) }
        })
        .await
        .unwrap();

        assert!(seen);
        assert_eq!(polls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_until_times_out() {
        let cancel = CancellationToken::new();
        let seen = wait_until(&cancel, Duration::from_millis(100), Duration::from_millis(500), || async {
            Ok(false)
        })
        .await
        .unwrap();
        assert!(!seen);
    }

    #[tokio::test(start_paused = true)]
    async fn settle_stops_on_cancel() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });
        let result = settle(&cancel, Duration::from_secs(60)).await;
        assert_eq!(result, Err(WorldError::Cancelled));
    }

    #[tokio::test]
    async fn probe_errors_propagate() {
        let cancel = CancellationToken::new();
        let result = wait_until(&cancel, Duration::from_millis(1), Duration::from_millis(5), || async {
            Err(WorldError::Disconnected("gone".into()))
        })
        .await;
        assert!(matches!(result, Err(WorldError::Disconnected(_))));
    }
}
