//! In-process effect event bus backed by a tokio broadcast channel.

use tokio::sync::broadcast;

use rulehub_domain::effect::EffectEvent;

/// In-process bus carrying [`EffectEvent`]s from effects to their owners.
///
/// Cloning shares the same channel. Publishing succeeds even when there are
/// no active subscribers (the event is simply dropped).
#[derive(Clone)]
pub struct EffectEventBus {
    sender: broadcast::Sender<EffectEvent>,
}

impl EffectEventBus {
    /// Create a new event bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events published *after* this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EffectEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: EffectEvent) {
        // broadcast::send fails only when there are zero receivers,
        // which is fine, so the error is ignored.
        let _ = self.sender.send(event);
    }
}

impl Default for EffectEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
