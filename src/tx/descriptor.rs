use super::{Descriptor, Hal, VolatileReadWrite};

enum Word1BitNumbers {
    LastBuffer = 15,

    LateCollision = 26,
    FrameCorrupted = 27,
    Underrun = 28,
    RetryLimitExceeded = 29,
    Wrap = 30,
    Used = 31,
}

const LENGTH_MASK: u32 = 0x0000_3FFF;

/// A transmit buffer descriptor.
///
/// The used bit in word 1 decides ownership: set, the slot belongs to
/// software; clear, the GMAC may transmit from it. After a frame went out the
/// controller sets the used bit of the first descriptor of that frame only.
#[repr(C, align(8))]
#[derive(Clone, Copy)]
pub struct TxDescriptor {
    // NOTE: Only read or write these fields using volatile operations
    word0: u32,
    word1: u32,
}

impl TxDescriptor {
    pub const fn const_default() -> Self {
        TxDescriptor { word0: 0, word1: 0 }
    }

    /// An empty, software owned descriptor.
    pub(crate) fn new(wrap: bool) -> Self {
        let mut descriptor = Self::const_default();
        descriptor.write(|w| w.set_used().set_wrap(wrap));
        descriptor
    }

    pub fn read(&self) -> TxDescriptorReader {
        TxDescriptorReader(self.word0.read_volatile(), self.word1.read_volatile())
    }

    fn modify<F: FnOnce(TxDescriptorWriter) -> TxDescriptorWriter>(&mut self, f: F) {
        let w = TxDescriptorWriter(self.word0.read_volatile(), self.word1.read_volatile());
        let result = f(w);
        self.word0.write_volatile(result.0);
        self.word1.write_volatile(result.1);
    }

    fn write<F: FnOnce(TxDescriptorWriter) -> TxDescriptorWriter>(&mut self, f: F) {
        let w = TxDescriptorWriter(0, 0);
        let result = f(w);
        self.word0.write_volatile(result.0);
        self.word1.write_volatile(result.1);
    }

    /// Returns the descriptor status if the slot is back in software hands,
    /// with a barrier between observing the used bit and anything after it.
    pub(crate) fn completed<H: Hal>(&self, hal: &H) -> Option<TxDescriptorReader> {
        let status = self.read();
        if !status.is_used() {
            return None;
        }
        hal.data_synchronization_barrier();
        Some(status)
    }

    /// Points the slot at a segment. The wrap marker is kept; the status bits
    /// written back by the controller are cleared.
    ///
    /// The first descriptor of a frame stays software owned until
    /// [`TxDescriptor::release`]; every later one is handed over right away,
    /// since the controller cannot reach it past an owned first descriptor.
    pub(crate) fn prepare(&mut self, buffer_address: u32, length: u16, start_of_frame: bool) {
        let wrap = self.read().is_wrap();
        self.write(|w| {
            let w = w
                .set_address(buffer_address)
                .set_buffer_length(length)
                .set_wrap(wrap);
            if start_of_frame {
                w.set_used()
            } else {
                w
            }
        })
    }

    /// Marks the final descriptor of a frame and hands it to the controller.
    pub(crate) fn finish_frame<H: Hal>(&mut self, hal: &H) {
        self.modify(|w| w.set_last_buffer());
        hal.data_synchronization_barrier();
        self.modify(|w| w.clear_used());
    }

    /// Hands the slot to the controller.
    pub(crate) fn release(&mut self) {
        self.modify(|w| w.clear_used())
    }

    /// Takes the slot back into software ownership.
    pub(crate) fn reclaim(&mut self) {
        self.modify(|w| w.set_used())
    }

    /// What the controller does to the first descriptor of a transmitted frame.
    #[cfg(test)]
    pub(crate) fn complete(&mut self) {
        self.modify(|w| w.set_used())
    }
}

impl Default for TxDescriptor {
    fn default() -> Self {
        Self::const_default()
    }
}

impl Descriptor for TxDescriptor {
    fn is_wrap(&self) -> bool {
        self.read().is_wrap()
    }
}

pub struct TxDescriptorReader(u32, u32);
impl TxDescriptorReader {
    pub fn buffer_address(&self) -> u32 {
        self.0
    }

    pub fn buffer_length(&self) -> u16 {
        (self.1 & LENGTH_MASK) as u16
    }

    pub fn is_last_buffer(&self) -> bool {
        self.1 & (1 << Word1BitNumbers::LastBuffer as u32) != 0
    }

    pub fn collided(&self) -> bool {
        self.1 & (1 << Word1BitNumbers::LateCollision as u32) != 0
    }

    pub fn corrupted(&self) -> bool {
        self.1 & (1 << Word1BitNumbers::FrameCorrupted as u32) != 0
    }

    pub fn underran(&self) -> bool {
        self.1 & (1 << Word1BitNumbers::Underrun as u32) != 0
    }

    pub fn retry_exceeded(&self) -> bool {
        self.1 & (1 << Word1BitNumbers::RetryLimitExceeded as u32) != 0
    }

    pub fn is_wrap(&self) -> bool {
        self.1 & (1 << Word1BitNumbers::Wrap as u32) != 0
    }

    pub fn is_used(&self) -> bool {
        self.1 & (1 << Word1BitNumbers::Used as u32) != 0
    }
}

struct TxDescriptorWriter(u32, u32);
impl TxDescriptorWriter {
    fn set_address(self, address: u32) -> Self {
        TxDescriptorWriter(address, self.1)
    }

    fn set_buffer_length(self, byte_length: u16) -> Self {
        TxDescriptorWriter(self.0, (self.1 & !LENGTH_MASK) | (byte_length as u32 & LENGTH_MASK))
    }

    fn set_last_buffer(self) -> Self {
        TxDescriptorWriter(self.0, self.1 | (1 << Word1BitNumbers::LastBuffer as u32))
    }

    fn set_wrap(self, wrap: bool) -> Self {
        let bit = 1 << Word1BitNumbers::Wrap as u32;
        if wrap {
            TxDescriptorWriter(self.0, self.1 | bit)
        } else {
            TxDescriptorWriter(self.0, self.1 & !bit)
        }
    }

    fn set_used(self) -> Self {
        TxDescriptorWriter(self.0, self.1 | (1 << Word1BitNumbers::Used as u32))
    }

    fn clear_used(self) -> Self {
        TxDescriptorWriter(self.0, self.1 & !(1 << Word1BitNumbers::Used as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::TxDescriptor;
    use crate::mock::MockHal;

    #[test]
    fn new_descriptors_belong_to_software() {
        let descriptor = TxDescriptor::new(true);
        let status = descriptor.read();
        assert!(status.is_used());
        assert!(status.is_wrap());
        assert!(!status.is_last_buffer());
    }

    #[test]
    fn single_segment_frame_lifecycle() {
        let hal = MockHal::new();
        let mut descriptor = TxDescriptor::new(true);

        descriptor.prepare(0x2000_0040, 60, true);
        let status = descriptor.read();
        assert!(status.is_used());
        assert!(status.is_wrap());
        assert_eq!(status.buffer_length(), 60);
        assert_eq!(status.buffer_address(), 0x2000_0040);

        descriptor.finish_frame(&hal);
        let status = descriptor.read();
        assert!(!status.is_used());
        assert!(status.is_last_buffer());
        assert!(descriptor.completed(&hal).is_none());

        descriptor.complete();
        assert!(descriptor.completed(&hal).is_some());
        assert_eq!(hal.barriers(), 2);
    }

    #[test]
    fn prepare_clears_stale_status() {
        let mut descriptor = TxDescriptor::new(false);
        descriptor.prepare(0x2000_0000, 1514, true);
        descriptor.modify(|w| w.set_last_buffer());
        descriptor.prepare(0x2000_0800, 42, false);

        let status = descriptor.read();
        assert!(!status.is_used());
        assert!(!status.is_last_buffer());
        assert!(!status.is_wrap());
        assert_eq!(status.buffer_length(), 42);
    }
}
