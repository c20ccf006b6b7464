//! Caller-initiated cancellation for in-flight fetches.

use std::sync::Arc;
use tokio::sync::watch;

/// Create a connected handle/signal pair.
pub fn pair() -> (CancelHandle, CancelSignal) {
  let (tx, rx) = watch::channel(false);
  (CancelHandle { tx: Arc::new(tx) }, CancelSignal { rx })
}

/// Triggers cancellation for every clone of the paired signal.
#[derive(Debug, Clone)]
pub struct CancelHandle {
  tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
  pub fn cancel(&self) {
    self.tx.send_replace(true);
  }
}

/// Observed by the client between and during endpoint attempts.
#[derive(Debug, Clone)]
pub struct CancelSignal {
  rx: watch::Receiver<bool>,
}

impl CancelSignal {
  pub fn is_cancelled(&self) -> bool {
    *self.rx.borrow()
  }

  /// Resolves once cancellation is requested. Never resolves if the handle is
  /// dropped without cancelling.
  pub async fn cancelled(&self) {
    let mut rx = self.rx.clone();
    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
      std::future::pending::<()>().await;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[tokio::test]
  async fn test_cancel_wakes_waiters() {
    let (handle, signal) = pair();
    assert!(!signal.is_cancelled());

    let waiter = tokio::spawn({
      let signal = signal.clone();
      async move { signal.cancelled().await }
    });

    handle.cancel();
    tokio::time::timeout(Duration::from_secs(1), waiter)
      .await
      .expect("waiter should wake")
      .unwrap();
    assert!(signal.is_cancelled());
  }

  #[tokio::test(start_paused = true)]
  async fn test_dropped_handle_is_not_cancellation() {
    let (handle, signal) = pair();
    drop(handle);

    let result = tokio::time::timeout(Duration::from_secs(60), signal.cancelled()).await;
    assert!(result.is_err());
    assert!(!signal.is_cancelled());
  }
}
