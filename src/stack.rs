//! The host network stack as seen by the driver.
//!
//! The stack owns the packet buffer pool, accepts received frames and queues
//! frames for transmission. Buffers cross the boundary by value: whoever holds
//! a buffer owns it, and a buffer attached to a descriptor belongs to the
//! driver until the controller is done with it.

use embedded_dma::{ReadBuffer, WriteBuffer};
use heapless::Deque;

/// Most segments a single outgoing frame may be split into.
pub const MAX_SEGMENTS: usize = 8;

/// A packet buffer from the stack's pool.
///
/// [`ReadBuffer`] yields the bytes of an outgoing segment, [`WriteBuffer`] the
/// full capacity the controller may receive into.
pub trait PacketBuffer: ReadBuffer<Word = u8> + WriteBuffer<Word = u8> {
    /// Records that the buffer holds a received frame of `length` bytes
    /// starting `offset` bytes into the buffer.
    fn set_frame(&mut self, offset: usize, length: usize);
}

/// The segments of one outgoing frame, in transmission order.
pub struct Chain<B> {
    segments: Deque<B, MAX_SEGMENTS>,
}

impl<B> Chain<B> {
    pub const fn new() -> Self {
        Chain {
            segments: Deque::new(),
        }
    }

    /// Appends a segment, handing it back if the chain is full.
    pub fn push(&mut self, segment: B) -> Result<(), B> {
        self.segments.push_back(segment)
    }

    pub(crate) fn push_front(&mut self, segment: B) -> Result<(), B> {
        self.segments.push_front(segment)
    }

    pub fn pop(&mut self) -> Option<B> {
        self.segments.pop_front()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl<B> Default for Chain<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> From<B> for Chain<B> {
    fn from(segment: B) -> Self {
        let mut chain = Chain::new();
        // A fresh chain always has room for one segment.
        let _ = chain.push(segment);
        chain
    }
}

pub trait NetworkStack {
    type Buffer: PacketBuffer;

    /// Takes a buffer from the pool without waiting.
    fn allocate_buffer(&mut self) -> Option<Self::Buffer>;
    /// Returns a buffer to the pool.
    fn free_buffer(&mut self, buffer: Self::Buffer);
    /// Hands a received frame to the stack.
    fn input(&mut self, frame: Self::Buffer);
    /// Takes the next frame from the interface send queue.
    fn dequeue(&mut self) -> Option<Chain<Self::Buffer>>;
}

/// Address and length of the data in an outgoing segment.
pub(crate) fn segment_of<B: PacketBuffer>(buffer: &B) -> (usize, usize) {
    // SAFETY: only the address and length are used, to program a descriptor
    // while the driver owns the buffer.
    let (pointer, length) = unsafe { buffer.read_buffer() };
    (pointer as usize, length)
}

/// Address and capacity of a buffer the controller will receive into.
pub(crate) fn receive_area_of<B: PacketBuffer>(buffer: &mut B) -> (usize, usize) {
    // SAFETY: as above; the buffer stays attached to a descriptor, and so owned
    // by the driver, for as long as the controller may write it.
    let (pointer, capacity) = unsafe { buffer.write_buffer() };
    (pointer as usize, capacity)
}
