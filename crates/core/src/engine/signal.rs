use std::sync::Arc;

use tokio::sync::watch;

/// Create a connected [`Trigger`]/[`Signal`] pair.
pub fn signal() -> (Trigger, Signal) {
    let (tx, rx) = watch::channel(false);
    (Trigger { tx: Arc::new(tx) }, Signal { rx })
}

/// Firing side of a one-shot event (held by the engine).
#[derive(Debug, Clone)]
pub struct Trigger {
    tx: Arc<watch::Sender<bool>>,
}

impl Trigger {
    /// Fire the event. Firing twice is a no-op.
    pub fn fire(&self) {
        self.tx.send_replace(true);
    }
}

/// Waiting side of a one-shot event (consumed by the client).
///
/// Level-triggered: once fired, every call to [`fired`](Self::fired)
/// completes immediately. If the trigger is dropped without firing, the
/// event can no longer happen and [`fired`](Self::fired) never completes.
#[derive(Debug, Clone)]
pub struct Signal {
    rx: watch::Receiver<bool>,
}

impl Signal {
    /// Wait until the event has fired.
    pub async fn fired(&mut self) {
        if self.rx.wait_for(|fired| *fired).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Whether the event has already fired.
    pub fn is_fired(&self) -> bool {
        *self.rx.borrow()
    }
}
