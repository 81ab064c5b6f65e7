//! The hardware abstraction layer the driver is written against.
//!
//! The driver never touches GMAC registers directly. Everything it needs from
//! the controller, the cache and the CPU goes through [`Hal`], which is
//! implemented for the PAC `GMAC` peripheral when a chip feature is selected
//! and by a recording mock in the tests.

use crate::{eui48::Identifier as EthernetAddress, interrupts::Interrupts, link::LinkType};
use fugit::HertzU32;

/// A management frame operation on the MDIO bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum PhyOperation {
    Read,
    Write(u16),
}

/// Divider between the master clock and the MDC management clock.
///
/// The MDC must not exceed 2.5 MHz.
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum MdcClock {
    Mck8 = 0,
    Mck16 = 1,
    Mck32 = 2,
    Mck48 = 3,
    Mck64 = 4,
    Mck96 = 5,
}

impl MdcClock {
    /// Picks the divider for the given master clock, or `None` when the clock is
    /// faster than the GMAC supports.
    pub fn for_master_clock(mck: HertzU32) -> Option<Self> {
        if mck > HertzU32::MHz(240) {
            None
        } else if mck > HertzU32::MHz(160) {
            Some(MdcClock::Mck96)
        } else if mck > HertzU32::MHz(120) {
            Some(MdcClock::Mck64)
        } else if mck > HertzU32::MHz(80) {
            Some(MdcClock::Mck48)
        } else if mck > HertzU32::MHz(40) {
            Some(MdcClock::Mck32)
        } else if mck > HertzU32::MHz(20) {
            Some(MdcClock::Mck16)
        } else {
            Some(MdcClock::Mck8)
        }
    }
}

/// DMA configuration register contents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub struct DmaConfig {
    /// Size of each receive buffer in bytes; must be a multiple of 64.
    pub receive_buffer_size: u16,
}

impl DmaConfig {
    const FIXED_BURST_INCR16: u32 = 4;
    const RX_PACKET_BUFFER_FULL: u32 = 3 << 8;
    const TX_PACKET_BUFFER_FULL: u32 = 1 << 10;

    pub fn bits(&self) -> u32 {
        let drbs = ((self.receive_buffer_size as u32) >> 6) & 0xFF;
        (drbs << 16)
            | Self::RX_PACKET_BUFFER_FULL
            | Self::TX_PACKET_BUFFER_FULL
            | Self::FIXED_BURST_INCR16
    }
}

/// Frame, octet and error totals maintained by the GMAC statistics block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, defmt::Format)]
pub struct HardwareStatistics {
    pub octets_transmitted: u64,
    pub frames_transmitted: u32,
    pub broadcast_frames_transmitted: u32,
    pub multicast_frames_transmitted: u32,
    pub pause_frames_transmitted: u32,
    pub transmit_underruns: u32,
    pub single_collision_frames: u32,
    pub multiple_collision_frames: u32,
    pub excessive_collisions: u32,
    pub late_collisions: u32,
    pub deferred_transmission_frames: u32,
    pub carrier_sense_errors: u32,
    pub octets_received: u64,
    pub frames_received: u32,
    pub broadcast_frames_received: u32,
    pub multicast_frames_received: u32,
    pub pause_frames_received: u32,
    pub undersize_frames_received: u32,
    pub oversize_frames_received: u32,
    pub jabbers_received: u32,
    pub frame_check_sequence_errors: u32,
    pub length_field_frame_errors: u32,
    pub receive_symbol_errors: u32,
    pub alignment_errors: u32,
    pub receive_resource_errors: u32,
    pub receive_overruns: u32,
    pub ip_header_checksum_errors: u32,
    pub tcp_checksum_errors: u32,
    pub udp_checksum_errors: u32,
}

/// Operations the driver consumes from the controller, the data cache and the
/// CPU.
///
/// All methods take `&self`: the same HAL instance is used from interrupt
/// context and from both engine tasks.
pub trait Hal {
    fn enable_receive(&self, enable: bool);
    fn enable_transmit(&self, enable: bool);
    fn set_receive_queue(&self, base_address: u32);
    fn set_transmit_queue(&self, base_address: u32);
    /// Number of bytes the controller skips at the start of each receive buffer.
    fn set_receive_buffer_offset(&self, offset: u8);
    fn configure_dma(&self, config: DmaConfig);
    fn enable_statistics_write(&self, enable: bool);

    fn enable_interrupts(&self, sources: Interrupts);
    fn disable_interrupts(&self, sources: Interrupts);
    /// Reads (and thereby clears) the interrupt status register.
    fn interrupt_status(&self) -> Interrupts;
    fn start_transmission(&self);

    fn enable_management_port(&self, enable: bool);
    fn set_mdc_clock(&self, clock: MdcClock);
    /// Starts a management frame; completion is observed with [`Hal::is_phy_idle`].
    fn phy_maintain(&self, phy_address: u8, register: u8, operation: PhyOperation);
    fn is_phy_idle(&self) -> bool;
    /// Data shifted in by the last read management frame.
    fn phy_data(&self) -> u16;

    fn set_link_speed(&self, link: LinkType);
    /// Programs specific-address register `index` (1 to 4).
    fn set_ethernet_address(&self, index: usize, address: &EthernetAddress);
    fn set_copy_all_frames(&self, enable: bool);
    fn set_no_broadcast(&self, enable: bool);
    fn enable_multicast_hash(&self, enable: bool);
    fn set_multicast_hash(&self, bottom: u32, top: u32);
    fn read_statistics(&self) -> HardwareStatistics;

    fn flush_data_cache(&self, address: usize, length: usize);
    fn invalidate_data_cache(&self, address: usize, length: usize);
    fn data_synchronization_barrier(&self);
}
