//! Nullable ticker — ticks fire only when the test says so.

use async_trait::async_trait;
use tokio::sync::mpsc;

use conclave_utils::Ticker;

/// A tick source driven by a [`TickHandle`].
///
/// The ticker is exhausted once its handle is dropped and every sent tick
/// has been consumed.
pub struct NullTicker {
    rx: mpsc::UnboundedReceiver<()>,
}

/// Fires ticks into a [`NullTicker`].
#[derive(Clone)]
pub struct TickHandle {
    tx: mpsc::UnboundedSender<()>,
}

impl NullTicker {
    pub fn new() -> (Self, TickHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, TickHandle { tx })
    }

    /// A ticker that fires `count` times and is then exhausted.
    pub fn finite(count: usize) -> Self {
        let (ticker, handle) = Self::new();
        for _ in 0..count {
            handle.tick();
        }
        ticker
    }
}

impl TickHandle {
    /// Queue one tick. Returns `false` if the ticker is gone.
    pub fn tick(&self) -> bool {
        self.tx.send(()).is_ok()
    }
}

#[async_trait]
impl Ticker for NullTicker {
    async fn tick(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}
