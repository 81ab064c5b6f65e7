use crate::{hal::HardwareStatistics, link::LinkType};
use core::sync::atomic::{AtomicU32, Ordering};
use paste::paste;

macro_rules! define_counters {
    (
        $( $(#[$meta:meta])* $name:ident, )+
    ) => {
        paste! {
            /// Driver event counters.
            ///
            /// Updated from interrupt context and from the engine tasks, so every
            /// counter is an atomic. Read them through [`Counters::snapshot`].
            pub struct Counters {
                $( $name: AtomicU32, )+
            }

            impl Counters {
                pub const fn new() -> Self {
                    Counters {
                        $( $name: AtomicU32::new(0), )+
                    }
                }

                $(
                    pub(crate) fn [<increment_ $name>](&self) {
                        self.$name.fetch_add(1, Ordering::Relaxed);
                    }
                )+

                pub fn snapshot(&self) -> Statistics {
                    Statistics {
                        $( $name: self.$name.load(Ordering::Relaxed), )+
                    }
                }
            }

            /// A point in time copy of the driver [`Counters`].
            #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, defmt::Format)]
            pub struct Statistics {
                $( $(#[$meta])* pub $name: u32, )+
            }
        }
    };
}

define_counters! {
    /// Interrupts that carried a receive class source
    rx_interrupts,
    rx_overrun_errors,
    /// Frames handed to the network stack
    rx_frames,
    /// Frames discarded because no replacement buffer was available
    rx_dropped_frames,
    /// Completed descriptors without the end-of-frame marker
    rx_fragment_errors,
    /// Interrupts that carried a transmit class source
    tx_interrupts,
    tx_complete_interrupts,
    tx_underrun_errors,
    tx_retry_limit_errors,
    tx_frame_corruption_errors,
    /// HRESP not OK (bus error)
    tx_bus_errors,
    /// Frames whose descriptors were reclaimed after transmission
    tx_frames,
    /// Send attempts that found the transmit ring full
    tx_ring_full,
    /// Frames dropped because they can never fit the transmit ring
    tx_dropped_frames,
}

impl Default for Counters {
    fn default() -> Self {
        Self::new()
    }
}

/// Link state as seen through the PHY.
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub struct MediaStatus {
    pub link_up: bool,
    pub auto_negotiation_complete: bool,
    /// Speed and duplex the MAC is currently programmed for.
    pub link: LinkType,
}

/// Everything the driver knows about itself, for external diagnosis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub struct Report {
    pub counters: Statistics,
    pub hardware: HardwareStatistics,
    pub phy_address: Option<u8>,
    pub phy_identifier: Option<u32>,
    /// `None` when the PHY does not answer.
    pub media: Option<MediaStatus>,
}
