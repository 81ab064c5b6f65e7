use super::{Descriptor, Hal, VolatileReadWrite};

enum Word0BitNumbers {
    Ownership = 0,
    Wrap = 1,
}

enum Word1BitNumbers {
    StartOfFrame = 14,
    EndOfFrame = 15,
}

const ADDRESS_MASK: u32 = 0xFFFF_FFFC;
const LENGTH_MASK: u32 = 0x0000_1FFF;

/// A receive buffer descriptor.
///
/// The ownership bit in word 0 is the only field touched concurrently by the
/// GMAC. While it is clear the controller owns the slot and may write the
/// attached buffer; the controller sets it once a frame has been stored.
#[repr(C, align(8))]
#[derive(Clone, Copy)]
pub struct RxDescriptor {
    // NOTE: Only read or write these fields using volatile operations
    word0: u32,
    word1: u32,
}

impl RxDescriptor {
    pub const fn const_default() -> Self {
        RxDescriptor { word0: 0, word1: 0 }
    }

    /// A descriptor owned by the controller and pointing at `buffer_address`.
    pub(crate) fn new(buffer_address: u32, wrap: bool) -> Self {
        let w = RxDescriptorWriter(0, 0)
            .set_address(buffer_address)
            .set_wrap(wrap);
        RxDescriptor {
            word0: w.0,
            word1: w.1,
        }
    }

    pub fn read(&self) -> RxDescriptorReader {
        RxDescriptorReader(self.word0.read_volatile(), self.word1.read_volatile())
    }

    /// Returns the descriptor status if the controller has handed the slot back.
    ///
    /// The barrier after observing the ownership bit keeps the status word and
    /// the buffer contents from being read ahead of it.
    pub(crate) fn completed<H: Hal>(&self, hal: &H) -> Option<RxDescriptorReader> {
        let word0 = self.word0.read_volatile();
        if word0 & (1 << Word0BitNumbers::Ownership as u32) == 0 {
            return None;
        }
        hal.data_synchronization_barrier();
        Some(RxDescriptorReader(word0, self.word1.read_volatile()))
    }

    /// Points the slot at `buffer_address` and returns it to the controller.
    ///
    /// The status word is cleared first; the ownership bit is released only
    /// after a barrier.
    pub(crate) fn give_to_hardware<H: Hal>(&mut self, hal: &H, buffer_address: u32, wrap: bool) {
        let w = RxDescriptorWriter(self.word0.read_volatile(), 0)
            .set_address(buffer_address)
            .set_wrap(wrap)
            .clear_ownership();
        self.word1.write_volatile(w.1);
        hal.data_synchronization_barrier();
        self.word0.write_volatile(w.0);
    }

    /// What the controller does when it stores a frame into this slot.
    #[cfg(test)]
    pub(crate) fn complete(&mut self, length: u16, end_of_frame: bool) {
        let mut status = (length as u32) & LENGTH_MASK;
        status |= 1 << Word1BitNumbers::StartOfFrame as u32;
        if end_of_frame {
            status |= 1 << Word1BitNumbers::EndOfFrame as u32;
        }
        self.word1.write_volatile(status);
        self.word0
            .set_bits_volatile(1 << Word0BitNumbers::Ownership as u32);
    }
}

impl Default for RxDescriptor {
    fn default() -> Self {
        Self::const_default()
    }
}

impl Descriptor for RxDescriptor {
    fn is_wrap(&self) -> bool {
        self.read().is_wrap()
    }
}

pub struct RxDescriptorReader(u32, u32);
impl RxDescriptorReader {
    pub fn is_software_owned(&self) -> bool {
        self.0 & (1 << Word0BitNumbers::Ownership as u32) != 0
    }

    pub fn is_wrap(&self) -> bool {
        self.0 & (1 << Word0BitNumbers::Wrap as u32) != 0
    }

    pub fn buffer_address(&self) -> u32 {
        self.0 & ADDRESS_MASK
    }

    pub fn frame_length(&self) -> u16 {
        (self.1 & LENGTH_MASK) as u16
    }

    pub fn is_start_of_frame(&self) -> bool {
        self.1 & (1 << Word1BitNumbers::StartOfFrame as u32) != 0
    }

    pub fn is_end_of_frame(&self) -> bool {
        self.1 & (1 << Word1BitNumbers::EndOfFrame as u32) != 0
    }
}

struct RxDescriptorWriter(u32, u32);
impl RxDescriptorWriter {
    fn set_address(self, address: u32) -> Self {
        RxDescriptorWriter((self.0 & !ADDRESS_MASK) | (address & ADDRESS_MASK), self.1)
    }

    fn set_wrap(self, wrap: bool) -> Self {
        let bit = 1 << Word0BitNumbers::Wrap as u32;
        if wrap {
            RxDescriptorWriter(self.0 | bit, self.1)
        } else {
            RxDescriptorWriter(self.0 & !bit, self.1)
        }
    }

    fn clear_ownership(self) -> Self {
        RxDescriptorWriter(self.0 & !(1 << Word0BitNumbers::Ownership as u32), self.1)
    }
}
