//! Value debouncing on the Tokio runtime
//!
//! A [`Debouncer`] accepts a stream of input values and emits a value only
//! once the input has stopped changing for a full quiescence window.
//!
//! **How it works:**
//!
//! 1. Each call to [`update`](Debouncer::update) hands the new value to a
//!    background task and restarts the window.
//!
//! 2. If another value arrives before the window expires, it replaces the
//!    pending one (last-write-wins); intermediate values are never emitted.
//!
//! 3. Once the window passes with no new input, the pending value is sent to
//!    the settled-value receiver.
//!
//! Dropping the `Debouncer` (all clones of it) closes the input channel and
//! terminates the task; a value still pending at that point is discarded, so
//! no emission can fire after teardown.

use std::time::Duration;
use tokio::sync::mpsc;

/// Input handle for a spawned debounce task
///
/// Cheap to clone; all clones feed the same task.
pub struct Debouncer<T> {
    input_tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for Debouncer<T> {
    fn clone(&self) -> Self {
        Self {
            input_tx: self.input_tx.clone(),
        }
    }
}

impl<T: Send + 'static> Debouncer<T> {
    /// Spawn a debounce task with the given quiescence window.
    ///
    /// Returns the input handle and the receiver of settled values. Must be
    /// called from within a Tokio runtime.
    ///
    /// A zero window still defers emission through the timer, so a settled
    /// value is never delivered synchronously from `update`.
    pub fn spawn(window: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (settled_tx, settled_rx) = mpsc::unbounded_channel();

        tokio::spawn(run(window, input_rx, settled_tx));

        (Self { input_tx }, settled_rx)
    }

    /// Feed a new input value, restarting the quiescence window
    pub fn update(&self, value: T) {
        // Send failure means the task is gone because the settled-value
        // receiver was dropped; there is nothing left to settle into.
        let _ = self.input_tx.send(value);
    }
}

/// Debounce loop: hold the most recent value until the input goes quiet
async fn run<T>(
    window: Duration,
    mut input_rx: mpsc::UnboundedReceiver<T>,
    settled_tx: mpsc::UnboundedSender<T>,
) {
    let mut pending: Option<T> = None;

    loop {
        match pending.take() {
            // Nothing pending: block until the next input arrives.
            None => match input_rx.recv().await {
                Some(value) => pending = Some(value),
                None => return,
            },
            // Value pending: emit it after the window unless superseded.
            Some(value) => {
                tokio::select! {
                    next = input_rx.recv() => match next {
                        Some(next) => pending = Some(next),
                        // Input closed: drop the pending value unemitted.
                        None => return,
                    },
                    () = tokio::time::sleep(window) => {
                        if settled_tx.send(value).is_err() {
                            return;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stable_value_settles_after_window() {
        let (debouncer, mut settled) = Debouncer::spawn(Duration::from_millis(50));

        debouncer.update(42u32);
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(settled.try_recv().ok(), Some(42));
    }

    #[tokio::test]
    async fn test_burst_settles_once_to_last_value() {
        let (debouncer, mut settled) = Debouncer::spawn(Duration::from_millis(50));

        for i in 0..5u32 {
            debouncer.update(i);
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        // Only the final value of the burst is emitted, exactly once
        assert_eq!(settled.try_recv().ok(), Some(4));
        assert!(settled.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_new_value_restarts_the_window() {
        let (debouncer, mut settled) = Debouncer::spawn(Duration::from_millis(100));

        debouncer.update(1u32);
        tokio::time::sleep(Duration::from_millis(60)).await;
        debouncer.update(2);
        tokio::time::sleep(Duration::from_millis(60)).await;

        // 120ms after the first update, but only 60ms after the second
        assert!(settled.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(settled.try_recv().ok(), Some(2));
    }

    #[tokio::test]
    async fn test_zero_window_defers_emission() {
        let (debouncer, mut settled) = Debouncer::spawn(Duration::ZERO);

        debouncer.update(7u32);

        // Not delivered synchronously, only after the timer runs
        assert!(settled.try_recv().is_err());
        let value = tokio::time::timeout(Duration::from_millis(200), settled.recv())
            .await
            .unwrap();
        assert_eq!(value, Some(7));
    }

    #[tokio::test]
    async fn test_drop_cancels_pending_value() {
        let (debouncer, mut settled) = Debouncer::spawn(Duration::from_millis(50));

        debouncer.update(1u32);
        drop(debouncer);
        tokio::time::sleep(Duration::from_millis(200)).await;

        // Channel closed without the pending value ever being emitted
        assert_eq!(settled.recv().await, None);
    }
}
