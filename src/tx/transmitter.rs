use super::{Hal, TxDescriptor, TxDescriptorTable, TxRing};
use crate::{
    event::Events,
    interrupt::Shared,
    interrupts::Interrupts,
    stack::{segment_of, Chain, NetworkStack, PacketBuffer},
    Error, MTU,
};
use void::Void;

const CACHE_LINE_SIZE: usize = 32;

/// The transmit engine.
///
/// Turns frames from the stack's send queue into runs of descriptors and
/// returns the buffers of transmitted frames to the pool. A frame that did
/// not fit is kept aside and goes out first once slots have been reclaimed.
pub struct Transmitter<'tx, H, B, const COUNT: usize> {
    hal: &'tx H,
    shared: &'tx Shared,
    descriptors: &'tx mut TxDescriptorTable<B, COUNT>,
    ring: TxRing,
    pending: Option<Chain<B>>,
}

impl<'tx, H: Hal, B: PacketBuffer, const COUNT: usize> Transmitter<'tx, H, B, COUNT> {
    pub fn new(hal: &'tx H, shared: &'tx Shared, descriptors: &'tx mut TxDescriptorTable<B, COUNT>) -> Self {
        Transmitter {
            hal,
            shared,
            descriptors,
            ring: TxRing::new(0),
            pending: None,
        }
    }

    pub fn ring(&self) -> &TxRing {
        &self.ring
    }

    pub fn descriptors(&self) -> &TxDescriptorTable<B, COUNT> {
        &*self.descriptors
    }

    pub fn has_pending_frame(&self) -> bool {
        self.pending.is_some()
    }

    /// Builds an empty ring of `count` descriptors and points the controller
    /// at it. Buffers left over from a previous run go back to the pool.
    pub fn initialize<S>(&mut self, stack: &mut S, count: usize) -> Result<(), Error>
    where
        S: NetworkStack<Buffer = B>,
    {
        self.hal.enable_transmit(false);
        self.hal.disable_interrupts(Interrupts::TX_CLASS);
        self.release(stack);

        self.descriptors.allocate(count, TxDescriptor::new)?;
        self.ring = TxRing::new(count);

        self.hal.data_synchronization_barrier();
        self.hal.set_transmit_queue(self.descriptors.base_address());
        self.hal.enable_transmit(true);

        defmt::debug!("TX ring of {=usize} descriptors", count);
        Ok(())
    }

    pub fn stop(&mut self) {
        self.hal.enable_transmit(false);
        self.hal.disable_interrupts(Interrupts::TX_CLASS);
    }

    /// Returns every buffer the engine holds to the pool.
    pub fn release<S>(&mut self, stack: &mut S)
    where
        S: NetworkStack<Buffer = B>,
    {
        for buffer in self.descriptors.detach_all() {
            stack.free_buffer(buffer);
        }
        if let Some(mut frame) = self.pending.take() {
            while let Some(segment) = frame.pop() {
                stack.free_buffer(segment);
            }
        }
        self.ring = TxRing::new(self.descriptors.len());
    }

    /// Reclaims the descriptors of every transmitted frame, oldest first.
    ///
    /// The controller only marks the first descriptor of a frame, so once one
    /// is found the walk continues unconditionally up to that frame's last
    /// buffer. Returns the number of frames retired.
    pub fn reclaim<S>(&mut self, stack: &mut S) -> usize
    where
        S: NetworkStack<Buffer = B>,
    {
        let mut frames = 0;
        let mut end_of_frame_needed = false;

        while !self.ring.is_empty() {
            let index = self.ring.free();
            let status = if end_of_frame_needed {
                self.descriptors.descriptor(index).read()
            } else {
                match self.descriptors.descriptor(index).completed(self.hal) {
                    Some(status) => status,
                    None => break,
                }
            };

            if !end_of_frame_needed && (status.underran() || status.retry_exceeded() || status.corrupted()) {
                defmt::debug!("TX descriptor {=usize} completed with errors", index);
            }

            end_of_frame_needed = true;
            self.descriptors.descriptor_mut(index).reclaim();
            if let Some(buffer) = self.descriptors.detach(index) {
                stack.free_buffer(buffer);
            }
            self.ring.retire();

            if status.is_last_buffer() {
                end_of_frame_needed = false;
                frames += 1;
                self.shared.counters.increment_tx_frames();
            }
        }

        frames
    }

    /// Queues one frame for transmission.
    ///
    /// Empty segments are returned to the pool first. Frames longer than
    /// [`MTU`] or with more segments than the ring holds are dropped, so every
    /// segment fits the descriptor length field.
    ///
    /// On a full ring the descriptors written so far are taken back, the
    /// transmit interrupts are enabled so that reclaiming resumes on the next
    /// completion, and the frame is handed back untouched.
    pub fn send_packet<S>(&mut self, stack: &mut S, mut chain: Chain<B>) -> Result<(), Chain<B>>
    where
        S: NetworkStack<Buffer = B>,
    {
        let mut frame = Chain::new();
        let mut frame_length = 0;
        while let Some(segment) = chain.pop() {
            let length = segment_of(&segment).1;
            if length == 0 {
                stack.free_buffer(segment);
            } else if let Err(segment) = frame.push(segment) {
                stack.free_buffer(segment);
            } else {
                frame_length += length;
            }
        }

        if frame.is_empty() {
            return Ok(());
        }

        if frame.len() > self.ring.capacity() || frame_length > MTU {
            defmt::warn!(
                "dropping frame of {=usize} bytes in {=usize} segments, ring holds {=usize}",
                frame_length,
                frame.len(),
                self.ring.capacity()
            );
            self.shared.counters.increment_tx_dropped_frames();
            while let Some(segment) = frame.pop() {
                stack.free_buffer(segment);
            }
            return Ok(());
        }

        let start = self.ring.used();
        let mut last = start;
        let mut position = 0;
        while let Some(segment) = frame.pop() {
            let index = match self.ring.take() {
                Some(index) => index,
                None => {
                    // Cannot fail, the segment was just popped.
                    let _ = frame.push_front(segment);
                    self.rewind(start, &mut frame);
                    self.hal.enable_interrupts(Interrupts::TX_CLASS);
                    self.shared.counters.increment_tx_ring_full();
                    defmt::trace!("TX ring full");
                    return Err(frame);
                }
            };

            let (address, length) = segment_of(&segment);
            let adjustment = address % CACHE_LINE_SIZE;
            self.hal.flush_data_cache(address - adjustment, length + adjustment);

            self.descriptors
                .descriptor_mut(index)
                .prepare(address as u32, length as u16, position == 0);
            self.descriptors.attach(index, segment);

            last = index;
            position += 1;
        }

        self.descriptors.descriptor_mut(last).finish_frame(self.hal);
        self.descriptors.descriptor_mut(start).release();
        self.hal.data_synchronization_barrier();
        self.hal.start_transmission();

        defmt::trace!("TX frame in descriptors {=usize}..={=usize}", start, last);
        Ok(())
    }

    /// Reclaims and sends until the send queue is empty or the ring is full.
    pub fn service<S>(&mut self, stack: &mut S)
    where
        S: NetworkStack<Buffer = B>,
    {
        loop {
            self.reclaim(stack);

            let frame = match self.pending.take().or_else(|| stack.dequeue()) {
                Some(frame) => frame,
                None => {
                    self.shared.output_drained();
                    break;
                }
            };

            if let Err(frame) = self.send_packet(stack, frame) {
                self.pending = Some(frame);
                break;
            }
        }
    }

    /// Runs [`Transmitter::service`] if a transmit event is pending.
    pub fn poll<S>(&mut self, stack: &mut S) -> nb::Result<(), Void>
    where
        S: NetworkStack<Buffer = B>,
    {
        self.shared
            .tx_events
            .try_receive(Events::START_TRANSMIT | Events::TX_INTERRUPT)?;
        self.service(stack);
        Ok(())
    }

    fn rewind(&mut self, start: usize, frame: &mut Chain<B>) {
        while self.ring.used() != start {
            let index = match self.ring.untake() {
                Some(index) => index,
                None => break,
            };
            self.descriptors.descriptor_mut(index).reclaim();
            if let Some(segment) = self.descriptors.detach(index) {
                let _ = frame.push_front(segment);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn descriptors_mut(&mut self) -> &mut TxDescriptorTable<B, COUNT> {
        &mut *self.descriptors
    }
}
