use tokio::sync::watch;

/// Owner side of a stop signal. Each scheduler context creates one; it can
/// also be used on its own to cancel a directly driven sweep.
#[derive(Debug)]
pub struct StopSignal {
    tx: watch::Sender<bool>,
}

impl StopSignal {
    pub fn new() -> (Self, StopToken) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, StopToken { rx })
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn token(&self) -> StopToken {
        StopToken { rx: self.tx.subscribe() }
    }
}

/// Read side of a stop signal, handed to every work unit.
///
/// Blocking work polls [`StopToken::is_stopped`] between iterations; suspending
/// work can await [`StopToken::stopped`].
#[derive(Clone, Debug)]
pub struct StopToken {
    rx: watch::Receiver<bool>,
}

impl StopToken {
    /// A token that is never triggered.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the stop signal is set. Pends forever for [`StopToken::never`].
    pub async fn stopped(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|stopped| *stopped).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
