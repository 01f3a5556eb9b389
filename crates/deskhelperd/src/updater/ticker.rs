//! Fixed-delay ticks for the update loop.

use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time;
use tracing::debug;

/// One request to run an update cycle.
///
/// Finishing or dropping the tick tells the ticker the cycle is over; the
/// wait for the next tick starts from that point.
#[derive(Debug, Default)]
pub struct Tick {
    done: Option<oneshot::Sender<()>>,
}

impl Tick {
    /// A tick nobody waits on
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the cycle started by this tick as complete
    pub fn finish(mut self) {
        if let Some(done) = self.done.take() {
            let _ = done.send(());
        }
    }
}

/// Start a task that sends a tick after `initial_delay`, then waits for each
/// cycle to finish and sleeps `period` before the next one.
///
/// Dropping the receiver stops the task.
pub fn spawn_ticker(initial_delay: Duration, period: Duration) -> mpsc::Receiver<Tick> {
    let (tx, rx) = mpsc::channel(1);

    tokio::spawn(async move {
        if !initial_delay.is_zero() {
            time::sleep(initial_delay).await;
        }

        loop {
            let (done_tx, done_rx) = oneshot::channel();
            let tick = Tick {
                done: Some(done_tx),
            };
            if tx.send(tick).await.is_err() {
                debug!("Update loop gone, ticker stopping");
                break;
            }

            // Err means the tick was dropped, which also ends the cycle
            let _ = done_rx.await;
            time::sleep(period).await;
        }
    });

    rx
}
