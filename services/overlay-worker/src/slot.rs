//! Single-slot handoff between the decode worker and the overlay consumer.
//!
//! The producer publishes a complete overlay under the lock; the consumer
//! takes it under the same lock. An undelivered overlay is replaced by the
//! next successful publish, so the consumer only ever sees the newest one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use renderer::Overlay;

use crate::cycle::CycleId;

/// A fully decoded and rasterised overlay for one cycle.
#[derive(Debug, Clone)]
pub struct PublishedOverlay {
    pub cycle: CycleId,
    pub overlay: Overlay,
    /// Straight-alpha RGBA, `overlay.width * overlay.height * 4` bytes
    pub rgba: Vec<u8>,
}

#[derive(Debug, Default)]
struct SlotState {
    pending: Option<PublishedOverlay>,
    has_data: bool,
    last_cycle: Option<CycleId>,
    last_update: Option<DateTime<Utc>>,
}

/// Mutex-guarded mailbox holding at most one unread overlay.
#[derive(Debug, Clone, Default)]
pub struct OverlaySlot {
    inner: Arc<Mutex<SlotState>>,
}

impl OverlaySlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        // State is only ever replaced whole, so a poisoned lock is still consistent
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a new overlay, discarding any previous one not yet taken.
    ///
    /// Returns the discarded overlay, if there was one.
    pub fn publish(&self, overlay: PublishedOverlay) -> Option<PublishedOverlay> {
        let mut state = self.lock();
        state.has_data = true;
        state.last_cycle = Some(overlay.cycle);
        state.last_update = Some(Utc::now());
        state.pending.replace(overlay)
    }

    /// Take the pending overlay. Each published overlay is returned once.
    pub fn take(&self) -> Option<PublishedOverlay> {
        self.lock().pending.take()
    }

    /// True when an overlay is waiting to be taken.
    pub fn has_pending(&self) -> bool {
        self.lock().pending.is_some()
    }

    /// True once any overlay has been published.
    pub fn has_data(&self) -> bool {
        self.lock().has_data
    }

    /// Cycle of the most recently published overlay.
    pub fn last_cycle(&self) -> Option<CycleId> {
        self.lock().last_cycle
    }

    /// When the most recent overlay was published.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.lock().last_update
    }
}
