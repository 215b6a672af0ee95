//! Shutdown signalling for tidal.
//!
//! Every table driver runs an unbounded loop. To let the process stop cleanly
//! each driver holds a `Watcher` and the supervisor holds the single
//! `Broadcaster`. Signalling is a one-time event: once the `Broadcaster` fires
//! every `Watcher` observes it, and `Broadcaster::signal_and_wait` blocks until
//! every registered `Watcher` has either observed the signal or been dropped.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(clippy::unwrap_used)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]

use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use tokio::sync::{
    Notify,
    broadcast::{self, error},
};
use tracing::info;

/// Construct a `Watcher` and `Broadcaster` pair.
#[must_use]
pub fn signal() -> (Watcher, Broadcaster) {
    // The channel never carries a value. Dropping the sender closes it and
    // closure is the signal every receiver observes.
    let (sender, receiver) = broadcast::channel(1);
    let peers = Arc::new(AtomicU32::new(1));
    let notify = Arc::new(Notify::new());

    let watcher = Watcher {
        peers: Arc::clone(&peers),
        receiver,
        notify: Arc::clone(&notify),
        acknowledged: false,
    };
    let broadcaster = Broadcaster {
        peers,
        sender,
        notify,
    };

    (watcher, broadcaster)
}

#[derive(Debug)]
/// Fires the signal for every `Watcher` derived from the same pair.
pub struct Broadcaster {
    /// Count of live, un-acknowledged `Watcher` instances.
    peers: Arc<AtomicU32>,
    sender: broadcast::Sender<()>,
    /// Woken each time a `Watcher` acknowledges.
    notify: Arc<Notify>,
}

impl Broadcaster {
    /// Send the signal without waiting for any `Watcher` to acknowledge.
    pub fn signal(self) {
        drop(self.sender);
    }

    /// Send the signal and wait until every registered `Watcher` has
    /// acknowledged it or been dropped.
    pub async fn signal_and_wait(self) {
        drop(self.sender);

        loop {
            // Register interest before reading the count, otherwise an
            // acknowledgment landing between the two is lost.
            let notified = self.notify.notified();
            let peers = self.peers.load(Ordering::SeqCst);
            if peers == 0 {
                break;
            }
            info!("Waiting for {peers} peers");
            notified.await;
        }
    }
}

#[derive(Debug)]
/// Waits for the signal sent by the paired `Broadcaster`.
pub struct Watcher {
    peers: Arc<AtomicU32>,
    receiver: broadcast::Receiver<()>,
    notify: Arc<Notify>,
    /// Whether this instance has already been subtracted from `peers`.
    acknowledged: bool,
}

impl Watcher {
    fn acknowledge(&mut self) {
        if self.acknowledged {
            return;
        }
        // Saturate at zero rather than wrap.
        let mut old = self.peers.load(Ordering::Relaxed);
        while old > 0 {
            match self.peers.compare_exchange_weak(
                old,
                old - 1,
                Ordering::SeqCst,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    self.notify.notify_waiters();
                    break;
                }
                Err(current) => old = current,
            }
        }
        self.acknowledged = true;
    }

    /// Wait for the signal. Returns immediately if it was already sent.
    ///
    /// # Panics
    ///
    /// Panics if the receiver lagged, which the one-shot channel makes
    /// impossible short of a programming error.
    pub async fn recv(mut self) {
        match self.receiver.recv().await {
            Ok(()) | Err(error::RecvError::Closed) => self.acknowledge(),
            Err(error::RecvError::Lagged(_)) => {
                panic!("Catastrophic programming error: lagged behind");
            }
        }
    }

    /// Derive a new `Watcher` that the `Broadcaster` will wait on.
    #[must_use]
    pub fn register(&self) -> Self {
        self.peers.fetch_add(1, Ordering::SeqCst);
        Self {
            peers: Arc::clone(&self.peers),
            receiver: self.receiver.resubscribe(),
            notify: Arc::clone(&self.notify),
            acknowledged: false,
        }
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.acknowledge();
    }
}
