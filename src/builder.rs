use crate::{
    controller::Controller,
    eui48::Identifier as EthernetAddress,
    hal::Hal,
    interrupt::Shared,
    rx::RxDescriptorTable,
    stack::PacketBuffer,
    tx::TxDescriptorTable,
};
use embedded_hal::blocking::delay::DelayMs;
use fugit::HertzU32;

/// Receive buffers handed to the controller by default.
pub const DEFAULT_RX_BUFFERS: usize = 8;
/// Transmit descriptors in the ring by default.
pub const DEFAULT_TX_BUFFERS: usize = 64;
/// Idle polls of the management port before a PHY access gives up.
pub const DEFAULT_MDIO_RETRIES: u32 = 10;

const MAX_ALTERNATE_ADDRESSES: usize = 3;

/// Driver configuration, consumed by [`Builder::freeze`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub struct Builder {
    ethernet_address: EthernetAddress,
    alternate_addresses: [Option<EthernetAddress>; MAX_ALTERNATE_ADDRESSES],
    alternate_address_count: usize,
    rx_buffers: usize,
    tx_buffers: usize,
    phy_address: Option<u8>,
    mdio_retries: u32,
    master_clock: HertzU32,
    copy_all_frames: bool,
    disable_broadcast: bool,
}

impl Builder {
    pub fn new() -> Self {
        Builder {
            ethernet_address: EthernetAddress::default(),
            alternate_addresses: [None; MAX_ALTERNATE_ADDRESSES],
            alternate_address_count: 0,
            rx_buffers: DEFAULT_RX_BUFFERS,
            tx_buffers: DEFAULT_TX_BUFFERS,
            phy_address: None,
            mdio_retries: DEFAULT_MDIO_RETRIES,
            master_clock: HertzU32::MHz(120),
            copy_all_frames: true,
            disable_broadcast: false,
        }
    }

    pub fn set_ethernet_address(mut self, ethernet_address: EthernetAddress) -> Self {
        self.ethernet_address = ethernet_address;
        self
    }

    pub fn ethernet_address(&self) -> EthernetAddress {
        self.ethernet_address
    }

    /// Adds one of the three extra addresses the controller matches on.
    /// Further addresses are ignored.
    pub fn add_alternate_ethernet_address(mut self, ethernet_address: EthernetAddress) -> Self {
        if self.alternate_address_count == MAX_ALTERNATE_ADDRESSES {
            defmt::warn!("alternate address {} ignored, all slots in use", ethernet_address);
            return self;
        }

        self.alternate_addresses[self.alternate_address_count] = Some(ethernet_address);
        self.alternate_address_count += 1;
        self
    }

    pub fn alternate_ethernet_address_count(&self) -> usize {
        self.alternate_address_count
    }

    pub fn alternate_ethernet_address(&self, index: usize) -> Option<EthernetAddress> {
        self.alternate_addresses.get(index).copied().flatten()
    }

    pub fn set_rx_buffers(mut self, count: usize) -> Self {
        self.rx_buffers = count;
        self
    }

    pub fn rx_buffers(&self) -> usize {
        self.rx_buffers
    }

    pub fn set_tx_buffers(mut self, count: usize) -> Self {
        self.tx_buffers = count;
        self
    }

    pub fn tx_buffers(&self) -> usize {
        self.tx_buffers
    }

    /// Uses the PHY at `address` instead of probing the management bus.
    pub fn set_phy_address(mut self, address: u8) -> Self {
        self.phy_address = Some(address);
        self
    }

    pub fn phy_address(&self) -> Option<u8> {
        self.phy_address
    }

    pub fn set_mdio_retries(mut self, retries: u32) -> Self {
        self.mdio_retries = retries;
        self
    }

    pub fn mdio_retries(&self) -> u32 {
        self.mdio_retries
    }

    /// Master clock feeding the GMAC, used to derive the MDC divider.
    pub fn set_master_clock(mut self, master_clock: HertzU32) -> Self {
        self.master_clock = master_clock;
        self
    }

    pub fn master_clock(&self) -> HertzU32 {
        self.master_clock
    }

    pub fn copy_all_frames(mut self, enable: bool) -> Self {
        self.copy_all_frames = enable;
        self
    }

    pub fn has_copy_all_frames(&self) -> bool {
        self.copy_all_frames
    }

    pub fn disable_broadcast(mut self) -> Self {
        self.disable_broadcast = true;
        self
    }

    pub fn has_disable_broadcast(&self) -> bool {
        self.disable_broadcast
    }

    pub fn freeze<'a, H, D, B, const RXCOUNT: usize, const TXCOUNT: usize>(
        self,
        hal: &'a H,
        shared: &'a Shared,
        delay: D,
        rx_descriptors: &'a mut RxDescriptorTable<B, RXCOUNT>,
        tx_descriptors: &'a mut TxDescriptorTable<B, TXCOUNT>,
    ) -> Controller<'a, H, D, B, RXCOUNT, TXCOUNT>
    where
        H: Hal,
        D: DelayMs<u32>,
        B: PacketBuffer,
    {
        Controller::new(hal, shared, delay, rx_descriptors, tx_descriptors, self)
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}
