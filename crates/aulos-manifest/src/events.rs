#![forbid(unsafe_code)]

use tokio::sync::broadcast;

/// Why a manifest refresh was performed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateReason {
    /// Periodic refresh driven by the manifest lifetime hint.
    Scheduled,
    /// A segment request failed in a way that suggested a stale index.
    OutOfSync,
    /// The host explicitly asked for a refresh.
    Requested,
}

/// Events emitted by the manifest core.
#[derive(Clone, Debug)]
pub enum ManifestEvent {
    /// The Manifest was reconciled against a fresh snapshot.
    ///
    /// Fired exactly once per successful reconciliation, after the whole
    /// tree is consistent. `reason` is `None` when the refresh trigger did
    /// not state one.
    ManifestUpdate { reason: Option<UpdateReason> },
}

/// Broadcast emitter for manifest events.
///
/// `emit` is a sync call; events are silently dropped when nobody
/// subscribed.
#[derive(Clone, Debug)]
pub struct EventEmitter {
    tx: broadcast::Sender<ManifestEvent>,
}

impl EventEmitter {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ManifestEvent> {
        self.tx.subscribe()
    }

    pub fn emit_manifest_update(&self, reason: Option<UpdateReason>) {
        let _ = self.tx.send(ManifestEvent::ManifestUpdate { reason });
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(16)
    }
}
