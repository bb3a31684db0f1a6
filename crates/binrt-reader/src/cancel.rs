use tokio::sync::watch;

/// Owner side of a cooperative cancellation signal.
///
/// Hand out [`CancellationToken`]s with [`token`](Self::token); calling
/// [`cancel`](Self::cancel) makes every pending and future read that
/// observes one of those tokens fail with `StreamError::Cancelled`.
/// Timeouts are composed by the caller, e.g. by cancelling from a task
/// that sleeps first.
#[derive(Debug)]
pub struct CancellationSource {
    tx: watch::Sender<bool>,
}

impl CancellationSource {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    #[must_use]
    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            rx: Some(self.tx.subscribe()),
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for CancellationSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of a cancellation signal.
///
/// The default token is never cancelled. Dropping the
/// [`CancellationSource`] without cancelling also leaves its tokens
/// un-cancelled forever.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    rx: Option<watch::Receiver<bool>>,
}

impl CancellationToken {
    /// A token that can never fire.
    #[must_use]
    pub fn none() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolve once cancellation is requested; pending forever otherwise.
    pub async fn cancelled(&self) {
        let Some(rx) = &self.rx else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // Source dropped without cancelling.
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn default_token_never_fires() {
        assert!(!CancellationToken::default().is_cancelled());
        assert!(!CancellationToken::none().is_cancelled());
    }

    #[test]
    fn cancel_is_visible_to_existing_and_new_tokens() {
        let source = CancellationSource::new();
        let early = source.token();
        assert!(!early.is_cancelled());

        source.cancel();
        assert!(source.is_cancelled());
        assert!(early.is_cancelled());
        assert!(source.token().is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let source = CancellationSource::new();
        let token = source.token();
        let waiter = tokio::spawn(async move { token.cancelled().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        source.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("cancellation should wake the waiter")
            .unwrap();
    }

    #[tokio::test]
    async fn dropped_source_never_resolves() {
        let token = CancellationSource::new().token();
        let waited = tokio::time::timeout(Duration::from_millis(20), token.cancelled()).await;
        assert!(waited.is_err());
    }
}
