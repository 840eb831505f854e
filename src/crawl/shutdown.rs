//! Cooperative shutdown coordination
//!
//! One coordinator is shared by the whole pool. Whoever triggers it first
//! fixes the end reason; workers observe the token at defined checkpoints
//! (before claiming and during sleeps) and let in-flight work finish.

use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Why the crawl ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The configured URL budget was reached
    BudgetExhausted,

    /// No eligible work remained in the frontier
    FrontierDrained,

    /// An operator interrupt (Ctrl-C) was received
    Cancelled,
}

/// Process-wide cancellation signal plus the first end reason
#[derive(Clone)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    reason: Arc<Mutex<Option<EndReason>>>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            reason: Arc::new(Mutex::new(None)),
        }
    }

    /// Signals shutdown; the first caller's reason wins
    pub fn trigger(&self, reason: EndReason) {
        let mut slot = self.reason.lock().unwrap();
        if slot.is_none() {
            *slot = Some(reason);
        }
        drop(slot);
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves when shutdown has been triggered
    pub async fn triggered(&self) {
        self.token.cancelled().await;
    }

    pub fn reason(&self) -> Option<EndReason> {
        *self.reason.lock().unwrap()
    }

    /// Spawns a task that triggers on Ctrl-C
    pub fn listen_for_interrupt(&self) {
        let coordinator = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, beginning cooperative shutdown");
                coordinator.trigger(EndReason::Cancelled);
            }
        });
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
