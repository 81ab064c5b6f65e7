//! Wake-up notification between interrupt context and the engine tasks.
//!
//! Interrupt context only ever sets bits with [`EventFlags::signal`]; the
//! engines consume them with [`EventFlags::try_receive`] when polled. No lock
//! is involved on either side.

use bitflags::bitflags;
use core::sync::atomic::{AtomicU32, Ordering};
use void::Void;

bitflags! {
    pub struct Events: u32 {
        /// The receive engine has completed descriptors to drain.
        const RX_INTERRUPT = 1 << 1;
        /// The transmit engine has completions or errors to service.
        const TX_INTERRUPT = 1 << 2;
        /// The stack queued frames, or the receive engine ran out of buffers.
        const START_TRANSMIT = 1 << 3;
    }
}

pub struct EventFlags {
    pending: AtomicU32,
}

impl EventFlags {
    pub const fn new() -> Self {
        EventFlags {
            pending: AtomicU32::new(0),
        }
    }

    /// Marks `events` as pending. Safe to call from interrupt context.
    pub fn signal(&self, events: Events) {
        self.pending.fetch_or(events.bits(), Ordering::Release);
    }

    /// Takes every pending event contained in `interest`.
    pub fn try_receive(&self, interest: Events) -> nb::Result<Events, Void> {
        let pending = self.pending.fetch_and(!interest.bits(), Ordering::Acquire);
        let received = Events::from_bits_truncate(pending) & interest;
        if received.is_empty() {
            Err(nb::Error::WouldBlock)
        } else {
            Ok(received)
        }
    }

    pub fn is_pending(&self, events: Events) -> bool {
        self.pending.load(Ordering::Relaxed) & events.bits() != 0
    }
}

impl Default for EventFlags {
    fn default() -> Self {
        Self::new()
    }
}
