use crate::{
    event::{EventFlags, Events},
    hal::Hal,
    interrupts::Interrupts,
    statistics::Counters,
};
use core::sync::atomic::{AtomicBool, Ordering};

/// State shared between interrupt context, the receive and transmit engines
/// and the network stack's enqueue path.
///
/// Everything in here is lock free, so a single instance can live in a
/// `static` and be handed out by shared reference.
pub struct Shared {
    pub(crate) rx_events: EventFlags,
    pub(crate) tx_events: EventFlags,
    pub(crate) counters: Counters,
    output_active: AtomicBool,
}

impl Shared {
    pub const fn new() -> Self {
        Shared {
            rx_events: EventFlags::new(),
            tx_events: EventFlags::new(),
            counters: Counters::new(),
            output_active: AtomicBool::new(false),
        }
    }

    pub fn rx_events(&self) -> &EventFlags {
        &self.rx_events
    }

    pub fn tx_events(&self) -> &EventFlags {
        &self.tx_events
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Called by the stack after queueing frames: marks output as active and
    /// wakes the transmit engine.
    pub fn start_output(&self) {
        self.output_active.store(true, Ordering::Release);
        self.tx_events.signal(Events::START_TRANSMIT);
    }

    /// True from [`Shared::start_output`] until the transmit engine finds the
    /// send queue empty.
    pub fn is_output_active(&self) -> bool {
        self.output_active.load(Ordering::Acquire)
    }

    pub(crate) fn output_drained(&self) {
        self.output_active.store(false, Ordering::Release);
    }
}

impl Default for Shared {
    fn default() -> Self {
        Self::new()
    }
}

/// Translates the GMAC interrupt status into engine wake-ups.
///
/// Runs in interrupt context: it never blocks, never logs and never touches
/// descriptors or frame data.
pub struct InterruptHandler<'a, H> {
    hal: &'a H,
    shared: &'a Shared,
}

impl<'a, H: Hal> InterruptHandler<'a, H> {
    pub fn new(hal: &'a H, shared: &'a Shared) -> Self {
        InterruptHandler { hal, shared }
    }

    /// Services one GMAC interrupt.
    ///
    /// The status register is read once. Each class that has a source pending
    /// is masked at the controller and its engine is signalled; the engine
    /// unmasks the class again once it has caught up.
    pub fn on_interrupt(&self) {
        let status = self.hal.interrupt_status();
        let counters = &self.shared.counters;

        let rx = status & Interrupts::RX_CLASS;
        if rx.contains(Interrupts::ROVR) {
            counters.increment_rx_overrun_errors();
        }
        if !rx.is_empty() {
            counters.increment_rx_interrupts();
            self.hal.disable_interrupts(Interrupts::RX_CLASS);
            self.shared.rx_events.signal(Events::RX_INTERRUPT);
        }

        let tx = status & Interrupts::TX_CLASS;
        if tx.contains(Interrupts::TUR) {
            counters.increment_tx_underrun_errors();
        }
        if tx.contains(Interrupts::RLEX) {
            counters.increment_tx_retry_limit_errors();
        }
        if tx.contains(Interrupts::TFC) {
            counters.increment_tx_frame_corruption_errors();
        }
        if tx.contains(Interrupts::HRESP) {
            counters.increment_tx_bus_errors();
        }
        if tx.contains(Interrupts::TCOMP) {
            counters.increment_tx_complete_interrupts();
        }
        if !tx.is_empty() {
            counters.increment_tx_interrupts();
            self.hal.disable_interrupts(Interrupts::TX_CLASS);
            self.shared.tx_events.signal(Events::TX_INTERRUPT);
        }
    }
}
