//! Host side stand-ins for the controller, the network stack and the delay
//! provider.

use crate::{
    eui48::Identifier as EthernetAddress,
    hal::{DmaConfig, Hal, HardwareStatistics, MdcClock, PhyOperation},
    interrupts::Interrupts,
    link::LinkType,
    stack::{Chain, NetworkStack, PacketBuffer},
};
use core::cell::{Cell, RefCell};
use embedded_dma::{ReadBuffer, WriteBuffer};
use embedded_hal::blocking::delay::DelayMs;
use std::collections::{BTreeMap, VecDeque};

/// A GMAC that records what the driver asks of it.
///
/// PHYs are modelled as a register file per address; addresses without a PHY
/// read back all ones, like an MDIO bus with nothing pulling the data line low.
pub struct MockHal {
    barriers: Cell<usize>,
    enabled: Cell<Interrupts>,
    status: Cell<Interrupts>,
    transmissions: Cell<usize>,
    receive_enabled: Cell<bool>,
    transmit_enabled: Cell<bool>,
    receive_queue: Cell<Option<u32>>,
    transmit_queue: Cell<Option<u32>>,
    receive_offset: Cell<u8>,
    dma: Cell<Option<DmaConfig>>,
    statistics_write: Cell<bool>,
    management_port: Cell<bool>,
    mdc: Cell<Option<MdcClock>>,
    phys: RefCell<BTreeMap<u8, [u16; 32]>>,
    phy_hung: Cell<bool>,
    phy_polls: Cell<usize>,
    phy_data: Cell<u16>,
    link: Cell<Option<LinkType>>,
    link_writes: Cell<usize>,
    addresses: RefCell<[Option<EthernetAddress>; 4]>,
    copy_all: Cell<bool>,
    no_broadcast: Cell<bool>,
    hash_enabled: Cell<bool>,
    hash: Cell<(u32, u32)>,
    hardware_statistics: Cell<HardwareStatistics>,
    flushed: RefCell<Vec<(usize, usize)>>,
    invalidated: Cell<usize>,
}

impl MockHal {
    pub fn new() -> Self {
        MockHal {
            barriers: Cell::new(0),
            enabled: Cell::new(Interrupts::empty()),
            status: Cell::new(Interrupts::empty()),
            transmissions: Cell::new(0),
            receive_enabled: Cell::new(false),
            transmit_enabled: Cell::new(false),
            receive_queue: Cell::new(None),
            transmit_queue: Cell::new(None),
            receive_offset: Cell::new(0),
            dma: Cell::new(None),
            statistics_write: Cell::new(false),
            management_port: Cell::new(false),
            mdc: Cell::new(None),
            phys: RefCell::new(BTreeMap::new()),
            phy_hung: Cell::new(false),
            phy_polls: Cell::new(0),
            phy_data: Cell::new(0),
            link: Cell::new(None),
            link_writes: Cell::new(0),
            addresses: RefCell::new([None; 4]),
            copy_all: Cell::new(false),
            no_broadcast: Cell::new(false),
            hash_enabled: Cell::new(false),
            hash: Cell::new((0, 0)),
            hardware_statistics: Cell::new(HardwareStatistics::default()),
            flushed: RefCell::new(Vec::new()),
            invalidated: Cell::new(0),
        }
    }

    /// A mock with a PHY answering at `address` with the given identifier.
    pub fn with_phy(address: u8, identifier: u32) -> Self {
        let hal = Self::new();
        hal.attach_phy(address, identifier);
        hal
    }

    pub fn attach_phy(&self, address: u8, identifier: u32) {
        let mut registers = [0u16; 32];
        registers[2] = (identifier >> 16) as u16;
        registers[3] = identifier as u16;
        self.phys.borrow_mut().insert(address, registers);
    }

    pub fn set_phy_register(&self, address: u8, register: u8, value: u16) {
        if let Some(registers) = self.phys.borrow_mut().get_mut(&address) {
            registers[register as usize] = value;
        }
    }

    pub fn phy_register(&self, address: u8, register: u8) -> Option<u16> {
        self.phys
            .borrow()
            .get(&address)
            .map(|registers| registers[register as usize])
    }

    /// Makes the management port report busy forever.
    pub fn hang_phy(&self, hung: bool) {
        self.phy_hung.set(hung);
    }

    pub fn phy_polls(&self) -> usize {
        self.phy_polls.get()
    }

    /// Latches interrupt sources into the status register.
    pub fn raise(&self, sources: Interrupts) {
        self.status.set(self.status.get() | sources);
    }

    pub fn barriers(&self) -> usize {
        self.barriers.get()
    }

    pub fn enabled_interrupts(&self) -> Interrupts {
        self.enabled.get()
    }

    pub fn transmissions(&self) -> usize {
        self.transmissions.get()
    }

    pub fn is_receiving(&self) -> bool {
        self.receive_enabled.get()
    }

    pub fn is_transmitting(&self) -> bool {
        self.transmit_enabled.get()
    }

    pub fn receive_queue(&self) -> Option<u32> {
        self.receive_queue.get()
    }

    pub fn transmit_queue(&self) -> Option<u32> {
        self.transmit_queue.get()
    }

    pub fn receive_offset(&self) -> u8 {
        self.receive_offset.get()
    }

    pub fn dma(&self) -> Option<DmaConfig> {
        self.dma.get()
    }

    pub fn statistics_write_enabled(&self) -> bool {
        self.statistics_write.get()
    }

    pub fn management_port_enabled(&self) -> bool {
        self.management_port.get()
    }

    pub fn mdc(&self) -> Option<MdcClock> {
        self.mdc.get()
    }

    pub fn link(&self) -> Option<LinkType> {
        self.link.get()
    }

    pub fn link_writes(&self) -> usize {
        self.link_writes.get()
    }

    pub fn address(&self, index: usize) -> Option<EthernetAddress> {
        self.addresses.borrow()[index - 1]
    }

    pub fn copies_all_frames(&self) -> bool {
        self.copy_all.get()
    }

    pub fn ignores_broadcast(&self) -> bool {
        self.no_broadcast.get()
    }

    pub fn multicast_hash_enabled(&self) -> bool {
        self.hash_enabled.get()
    }

    pub fn multicast_hash(&self) -> (u32, u32) {
        self.hash.get()
    }

    pub fn set_hardware_statistics(&self, statistics: HardwareStatistics) {
        self.hardware_statistics.set(statistics);
    }

    pub fn flushed(&self) -> Vec<(usize, usize)> {
        self.flushed.borrow().clone()
    }

    pub fn invalidations(&self) -> usize {
        self.invalidated.get()
    }
}

impl Default for MockHal {
    fn default() -> Self {
        Self::new()
    }
}

impl Hal for MockHal {
    fn enable_receive(&self, enable: bool) {
        self.receive_enabled.set(enable);
    }

    fn enable_transmit(&self, enable: bool) {
        self.transmit_enabled.set(enable);
    }

    fn set_receive_queue(&self, base_address: u32) {
        self.receive_queue.set(Some(base_address));
    }

    fn set_transmit_queue(&self, base_address: u32) {
        self.transmit_queue.set(Some(base_address));
    }

    fn set_receive_buffer_offset(&self, offset: u8) {
        self.receive_offset.set(offset);
    }

    fn configure_dma(&self, config: DmaConfig) {
        self.dma.set(Some(config));
    }

    fn enable_statistics_write(&self, enable: bool) {
        self.statistics_write.set(enable);
    }

    fn enable_interrupts(&self, sources: Interrupts) {
        self.enabled.set(self.enabled.get() | sources);
    }

    fn disable_interrupts(&self, sources: Interrupts) {
        self.enabled.set(self.enabled.get() - sources);
    }

    fn interrupt_status(&self) -> Interrupts {
        self.status.replace(Interrupts::empty())
    }

    fn start_transmission(&self) {
        self.transmissions.set(self.transmissions.get() + 1);
    }

    fn enable_management_port(&self, enable: bool) {
        self.management_port.set(enable);
    }

    fn set_mdc_clock(&self, clock: MdcClock) {
        self.mdc.set(Some(clock));
    }

    fn phy_maintain(&self, phy_address: u8, register: u8, operation: PhyOperation) {
        let mut phys = self.phys.borrow_mut();
        let registers = match phys.get_mut(&phy_address) {
            Some(registers) => registers,
            None => {
                self.phy_data.set(0xFFFF);
                return;
            }
        };
        match operation {
            PhyOperation::Read => self.phy_data.set(registers[register as usize]),
            // Reset and restart auto-negotiation are self clearing.
            PhyOperation::Write(value) if register == 0 => {
                registers[0] = value & !((1 << 15) | (1 << 9));
            }
            PhyOperation::Write(value) => registers[register as usize] = value,
        }
    }

    fn is_phy_idle(&self) -> bool {
        self.phy_polls.set(self.phy_polls.get() + 1);
        !self.phy_hung.get()
    }

    fn phy_data(&self) -> u16 {
        self.phy_data.get()
    }

    fn set_link_speed(&self, link: LinkType) {
        self.link.set(Some(link));
        self.link_writes.set(self.link_writes.get() + 1);
    }

    fn set_ethernet_address(&self, index: usize, address: &EthernetAddress) {
        self.addresses.borrow_mut()[index - 1] = Some(*address);
    }

    fn set_copy_all_frames(&self, enable: bool) {
        self.copy_all.set(enable);
    }

    fn set_no_broadcast(&self, enable: bool) {
        self.no_broadcast.set(enable);
    }

    fn enable_multicast_hash(&self, enable: bool) {
        self.hash_enabled.set(enable);
    }

    fn set_multicast_hash(&self, bottom: u32, top: u32) {
        self.hash.set((bottom, top));
    }

    fn read_statistics(&self) -> HardwareStatistics {
        self.hardware_statistics.get()
    }

    fn flush_data_cache(&self, address: usize, length: usize) {
        self.flushed.borrow_mut().push((address, length));
    }

    fn invalidate_data_cache(&self, _address: usize, _length: usize) {
        self.invalidated.set(self.invalidated.get() + 1);
    }

    fn data_synchronization_barrier(&self) {
        self.barriers.set(self.barriers.get() + 1);
    }
}

/// A heap backed packet buffer with an identity, so tests can follow it
/// through the driver.
#[derive(Debug)]
pub struct TestBuffer {
    pub id: usize,
    storage: Box<[u8]>,
    length: usize,
    frame: Option<(usize, usize)>,
}

impl TestBuffer {
    pub fn new(id: usize, capacity: usize) -> Self {
        TestBuffer {
            id,
            storage: vec![0; capacity].into_boxed_slice(),
            length: capacity,
            frame: None,
        }
    }

    /// A buffer holding `length` bytes of outgoing data.
    pub fn segment(id: usize, length: usize) -> Self {
        let mut buffer = Self::new(id, length.max(1));
        buffer.length = length;
        buffer
    }

    /// Offset and length of the received frame, once delivered.
    pub fn frame(&self) -> Option<(usize, usize)> {
        self.frame
    }
}

unsafe impl ReadBuffer for TestBuffer {
    type Word = u8;

    unsafe fn read_buffer(&self) -> (*const u8, usize) {
        (self.storage.as_ptr(), self.length)
    }
}

unsafe impl WriteBuffer for TestBuffer {
    type Word = u8;

    unsafe fn write_buffer(&mut self) -> (*mut u8, usize) {
        (self.storage.as_mut_ptr(), self.storage.len())
    }
}

impl PacketBuffer for TestBuffer {
    fn set_frame(&mut self, offset: usize, length: usize) {
        self.frame = Some((offset, length));
    }
}

/// A network stack with a bounded pool of receive buffers.
pub struct TestStack {
    pool: VecDeque<TestBuffer>,
    next_id: usize,
    exhausted: bool,
    pub delivered: Vec<TestBuffer>,
    pub freed: Vec<usize>,
    pub send_queue: VecDeque<Chain<TestBuffer>>,
}

impl TestStack {
    pub fn with_buffers(count: usize, capacity: usize) -> Self {
        TestStack {
            pool: (0..count).map(|id| TestBuffer::new(id, capacity)).collect(),
            next_id: count,
            exhausted: false,
            delivered: Vec::new(),
            freed: Vec::new(),
            send_queue: VecDeque::new(),
        }
    }

    /// Makes every allocation fail while set.
    pub fn exhaust(&mut self, exhausted: bool) {
        self.exhausted = exhausted;
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// Builds an outgoing frame out of fresh buffers with the given segment
    /// lengths.
    pub fn frame(&mut self, segments: &[usize]) -> Chain<TestBuffer> {
        let mut chain = Chain::new();
        for &length in segments {
            let buffer = TestBuffer::segment(self.next_id, length);
            self.next_id += 1;
            assert!(chain.push(buffer).is_ok());
        }
        chain
    }

    pub fn queue(&mut self, segments: &[usize]) {
        let frame = self.frame(segments);
        self.send_queue.push_back(frame);
    }
}

impl NetworkStack for TestStack {
    type Buffer = TestBuffer;

    fn allocate_buffer(&mut self) -> Option<TestBuffer> {
        if self.exhausted {
            None
        } else {
            self.pool.pop_front()
        }
    }

    fn free_buffer(&mut self, buffer: TestBuffer) {
        self.freed.push(buffer.id);
        self.pool.push_back(buffer);
    }

    fn input(&mut self, frame: TestBuffer) {
        self.delivered.push(frame);
    }

    fn dequeue(&mut self) -> Option<Chain<TestBuffer>> {
        self.send_queue.pop_front()
    }
}

pub struct NoopDelay;

impl DelayMs<u32> for NoopDelay {
    fn delay_ms(&mut self, _ms: u32) {}
}
