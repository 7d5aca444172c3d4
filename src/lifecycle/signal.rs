//! One-shot completion latch.
//!
//! A [`Signaller`] resolves the latch with a value exactly once; every
//! [`Awaitable`] handle observes that value, whether it started waiting
//! before or after the resolution.
//!
//! # Design Decisions
//! - Backed by a `watch` channel holding `Option<T>`; `None` means unresolved
//! - Resolution uses `send_if_modified`, so the first value sticks and later
//!   calls return `false` without touching the stored value
//! - No error or cancellation state: a latch whose signallers are all dropped
//!   unresolved simply never completes

use std::sync::Arc;
use tokio::sync::watch;

/// Create a linked waiter/resolver pair.
pub fn channel<T>() -> (Awaitable<T>, Signaller<T>)
where
    T: Clone + Send + Sync,
{
    let (tx, rx) = watch::channel(None);
    (Awaitable { rx }, Signaller { tx: Arc::new(tx) })
}

/// Resolver half of the latch.
pub struct Signaller<T> {
    tx: Arc<watch::Sender<Option<T>>>,
}

impl<T> Clone for Signaller<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T> Signaller<T>
where
    T: Clone + Send + Sync,
{
    /// Resolve the latch.
    ///
    /// Returns `true` if this call resolved it, `false` if it was already
    /// resolved. Never blocks.
    pub fn signal(&self, value: T) -> bool {
        self.tx.send_if_modified(move |slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(value);
            true
        })
    }

    /// Whether the latch has been resolved.
    pub fn is_signalled(&self) -> bool {
        self.tx.borrow().is_some()
    }
}

/// Waiter half of the latch.
#[derive(Clone)]
pub struct Awaitable<T> {
    rx: watch::Receiver<Option<T>>,
}

impl<T> Awaitable<T>
where
    T: Clone + Send + Sync,
{
    /// Wait for the latch and return the resolved value.
    ///
    /// Completes immediately if the latch is already resolved.
    pub async fn wait(&self) -> T {
        let mut rx = self.rx.clone();
        let resolved = rx
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|slot| (*slot).clone());

        match resolved {
            Some(value) => value,
            // Every signaller is gone and nothing was sent.
            None => std::future::pending().await,
        }
    }

    /// The resolved value, if any, without waiting.
    pub fn peek(&self) -> Option<T> {
        self.rx.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_first_value_wins() {
        let (waiter, signaller) = channel::<u32>();

        assert!(signaller.signal(1));
        assert!(!signaller.signal(2));
        assert!(!signaller.signal(3));

        assert_eq!(waiter.wait().await, 1);
        assert_eq!(waiter.peek(), Some(1));
    }

    #[tokio::test]
    async fn test_wait_after_resolution_is_immediate() {
        let (waiter, signaller) = channel::<()>();
        signaller.signal(());

        let result = tokio::time::timeout(Duration::from_millis(10), waiter.wait()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_wait_before_resolution() {
        let (waiter, signaller) = channel::<&'static str>();

        let pending = {
            let waiter = waiter.clone();
            tokio::spawn(async move { waiter.wait().await })
        };

        tokio::task::yield_now().await;
        assert!(!signaller.is_signalled());
        signaller.signal("closed");

        assert_eq!(pending.await.unwrap(), "closed");
    }

    #[tokio::test]
    async fn test_many_waiters_see_same_value() {
        let (waiter, signaller) = channel::<u8>();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let waiter = waiter.clone();
                tokio::spawn(async move { waiter.wait().await })
            })
            .collect();

        let racing = signaller.clone();
        signaller.signal(7);
        racing.signal(9);

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 7);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_signaller_never_resolves() {
        let (waiter, signaller) = channel::<()>();
        drop(signaller);

        let result = tokio::time::timeout(Duration::from_secs(60), waiter.wait()).await;
        assert!(result.is_err());
        assert_eq!(waiter.peek(), None);
    }
}
