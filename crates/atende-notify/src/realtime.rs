// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime fan-out hub.
//!
//! Fire-and-forget broadcast of UI notifications. Consumers subscribe and
//! are responsible for reconciliation; slow consumers are lagged, never
//! block the pipeline.

use tokio::sync::broadcast;
use tracing::trace;

use atende_core::traits::notify::{RealtimeEvent, RealtimeSink};

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub implementing the realtime seam.
pub struct RealtimeHub {
    tx: broadcast::Sender<RealtimeEvent>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.tx.subscribe()
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}

impl RealtimeSink for RealtimeHub {
    fn publish(&self, event: RealtimeEvent) {
        // No subscribers is fine; send only fails when there are none.
        let delivered = self.tx.send(event).unwrap_or(0);
        trace!(delivered, "realtime event published");
    }
}
