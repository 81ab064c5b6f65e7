use super::{Hal, RxDescriptor, RxDescriptorTable};
use crate::{
    event::Events,
    interrupt::Shared,
    interrupts::Interrupts,
    stack::{receive_area_of, NetworkStack, PacketBuffer},
    Error, RX_BUFFER_SIZE, RX_DATA_OFFSET,
};
use void::Void;

/// The receive engine.
///
/// Every descriptor in the ring always has a buffer attached. A completed
/// frame is only handed to the stack once a replacement buffer has been
/// attached in its place; without one the frame is dropped and its buffer
/// goes straight back to the controller.
pub struct Receiver<'rx, H, B, const COUNT: usize> {
    hal: &'rx H,
    shared: &'rx Shared,
    descriptors: &'rx mut RxDescriptorTable<B, COUNT>,
    fill_index: usize,
}

impl<'rx, H: Hal, B: PacketBuffer, const COUNT: usize> Receiver<'rx, H, B, COUNT> {
    pub fn new(hal: &'rx H, shared: &'rx Shared, descriptors: &'rx mut RxDescriptorTable<B, COUNT>) -> Self {
        Receiver {
            hal,
            shared,
            descriptors,
            fill_index: 0,
        }
    }

    pub fn fill_index(&self) -> usize {
        self.fill_index
    }

    pub fn descriptors(&self) -> &RxDescriptorTable<B, COUNT> {
        &*self.descriptors
    }

    /// Fills a ring of `count` descriptors with fresh buffers, points the
    /// controller at it and starts reception.
    pub fn initialize<S>(&mut self, stack: &mut S, count: usize) -> Result<(), Error>
    where
        S: NetworkStack<Buffer = B>,
    {
        self.hal.enable_receive(false);
        self.hal.disable_interrupts(Interrupts::RX_CLASS);
        self.release(stack);

        self.descriptors.allocate(count, |_| RxDescriptor::const_default())?;
        for index in 0..count {
            let mut buffer = match self.allocate_buffer(stack) {
                Some(buffer) => buffer,
                None => {
                    self.release(stack);
                    return Err(Error::BufferAllocation);
                }
            };
            let (address, _) = receive_area_of(&mut buffer);
            let wrap = self.descriptors.is_last(index);
            *self.descriptors.descriptor_mut(index) = RxDescriptor::new(address as u32, wrap);
            self.descriptors.attach(index, buffer);
        }
        self.fill_index = 0;

        self.hal.set_receive_buffer_offset(RX_DATA_OFFSET as u8);
        self.hal.data_synchronization_barrier();
        self.hal.set_receive_queue(self.descriptors.base_address());
        self.hal.enable_receive(true);
        self.hal.enable_interrupts(Interrupts::RX_CLASS);

        defmt::debug!("RX ring of {=usize} descriptors", count);
        Ok(())
    }

    pub fn stop(&mut self) {
        self.hal.enable_receive(false);
        self.hal.disable_interrupts(Interrupts::RX_CLASS);
    }

    /// Returns every attached buffer to the pool.
    pub fn release<S>(&mut self, stack: &mut S)
    where
        S: NetworkStack<Buffer = B>,
    {
        for buffer in self.descriptors.detach_all() {
            stack.free_buffer(buffer);
        }
    }

    /// Hands every completed frame to the stack, then unmasks the receive
    /// interrupts. Returns the number of frames delivered.
    pub fn drain<S>(&mut self, stack: &mut S) -> usize
    where
        S: NetworkStack<Buffer = B>,
    {
        let mut delivered = 0;
        let mut starved = false;

        while !self.descriptors.is_empty() {
            let index = self.fill_index;
            let status = match self.descriptors.descriptor(index).completed(self.hal) {
                Some(status) => status,
                None => break,
            };
            let wrap = self.descriptors.is_last(index);

            if !status.is_end_of_frame() {
                defmt::warn!("RX descriptor {=usize} without end of frame", index);
                self.shared.counters.increment_rx_fragment_errors();
                self.recycle(index, status.buffer_address(), wrap);
            } else if let Some(mut replacement) = self.allocate_buffer(stack) {
                let (address, _) = receive_area_of(&mut replacement);
                let frame = self.descriptors.attach(index, replacement);
                self.descriptors
                    .descriptor_mut(index)
                    .give_to_hardware(self.hal, address as u32, wrap);

                if let Some(mut frame) = frame {
                    let length = status.frame_length() as usize;
                    defmt::trace!("RX frame of {=usize} bytes in descriptor {=usize}", length, index);
                    frame.set_frame(RX_DATA_OFFSET, length);
                    stack.input(frame);
                    self.shared.counters.increment_rx_frames();
                    delivered += 1;
                }
            } else {
                self.shared.counters.increment_rx_dropped_frames();
                starved = true;
                self.recycle(index, status.buffer_address(), wrap);
            }

            self.fill_index = self.descriptors.next_index(index);
        }

        if starved {
            self.shared.tx_events.signal(Events::START_TRANSMIT);
        }
        self.hal.enable_interrupts(Interrupts::RX_CLASS);
        delivered
    }

    /// Runs [`Receiver::drain`] if a receive event is pending.
    pub fn poll<S>(&mut self, stack: &mut S) -> nb::Result<usize, Void>
    where
        S: NetworkStack<Buffer = B>,
    {
        self.shared.rx_events.try_receive(Events::RX_INTERRUPT)?;
        Ok(self.drain(stack))
    }

    /// Takes a buffer from the pool that can hold a full frame. The buffer's
    /// cache lines are invalidated before the controller writes into it.
    fn allocate_buffer<S>(&self, stack: &mut S) -> Option<B>
    where
        S: NetworkStack<Buffer = B>,
    {
        let mut buffer = stack.allocate_buffer()?;
        let (address, capacity) = receive_area_of(&mut buffer);
        if capacity < RX_BUFFER_SIZE {
            defmt::warn!("RX buffer of {=usize} bytes is too small", capacity);
            stack.free_buffer(buffer);
            return None;
        }
        self.hal.invalidate_data_cache(address, RX_BUFFER_SIZE);
        Some(buffer)
    }

    /// Gives a descriptor back to the controller with its current buffer.
    fn recycle(&mut self, index: usize, buffer_address: u32, wrap: bool) {
        self.hal
            .invalidate_data_cache(buffer_address as usize, RX_BUFFER_SIZE);
        self.descriptors
            .descriptor_mut(index)
            .give_to_hardware(self.hal, buffer_address, wrap);
    }

    #[cfg(test)]
    pub(crate) fn descriptors_mut(&mut self) -> &mut RxDescriptorTable<B, COUNT> {
        &mut *self.descriptors
    }
}

#[cfg(test)]
mod tests {
    use super::Receiver;
    use crate::{
        event::Events,
        hal::Hal,
        interrupt::{InterruptHandler, Shared},
        interrupts::Interrupts,
        mock::{MockHal, TestBuffer, TestStack},
        rx::RxDescriptorTable,
        RX_BUFFER_SIZE, RX_DATA_OFFSET,
    };

    fn complete(receiver: &mut Receiver<'_, MockHal, TestBuffer, 8>, index: usize, length: u16) {
        receiver
            .descriptors_mut()
            .descriptor_mut(index)
            .complete(length, true);
    }

    #[test]
    fn initialize_fills_the_ring_and_starts_reception() {
        let hal = MockHal::new();
        let shared = Shared::new();
        let mut table: RxDescriptorTable<TestBuffer, 8> = RxDescriptorTable::new();
        let mut stack = TestStack::with_buffers(10, RX_BUFFER_SIZE);
        let mut receiver = Receiver::new(&hal, &shared, &mut table);

        receiver.initialize(&mut stack, 6).unwrap();

        assert_eq!(stack.pool_size(), 4);
        assert_eq!(receiver.descriptors().len(), 6);
        assert_eq!(receiver.descriptors().wrap_count(), 1);
        assert!(receiver.descriptors().descriptors()[5].read().is_wrap());
        assert!(receiver
            .descriptors()
            .descriptors()
            .iter()
            .all(|d| !d.read().is_software_owned()));
        assert!(hal.is_receiving());
        assert_eq!(hal.receive_offset(), RX_DATA_OFFSET as u8);
        assert_eq!(hal.receive_queue(), Some(receiver.descriptors().base_address()));
        assert!(hal.enabled_interrupts().contains(Interrupts::RX_CLASS));
        assert_eq!(hal.invalidations(), 6);
    }

    #[test]
    fn initial_fill_fails_without_buffers() {
        let hal = MockHal::new();
        let shared = Shared::new();
        let mut table: RxDescriptorTable<TestBuffer, 8> = RxDescriptorTable::new();
        let mut stack = TestStack::with_buffers(3, RX_BUFFER_SIZE);
        let mut receiver = Receiver::new(&hal, &shared, &mut table);

        assert_eq!(
            receiver.initialize(&mut stack, 4),
            Err(crate::Error::BufferAllocation)
        );
        assert_eq!(stack.pool_size(), 3);
        assert!(!hal.is_receiving());
    }

    #[test]
    fn small_buffers_are_refused() {
        let hal = MockHal::new();
        let shared = Shared::new();
        let mut table: RxDescriptorTable<TestBuffer, 8> = RxDescriptorTable::new();
        let mut stack = TestStack::with_buffers(8, 512);
        let mut receiver = Receiver::new(&hal, &shared, &mut table);

        assert_eq!(
            receiver.initialize(&mut stack, 2),
            Err(crate::Error::BufferAllocation)
        );
        assert_eq!(stack.pool_size(), 8);
    }

    #[test]
    fn completed_frames_are_delivered_in_order() {
        let hal = MockHal::new();
        let shared = Shared::new();
        let mut table: RxDescriptorTable<TestBuffer, 8> = RxDescriptorTable::new();
        let mut stack = TestStack::with_buffers(12, RX_BUFFER_SIZE);
        let mut receiver = Receiver::new(&hal, &shared, &mut table);
        receiver.initialize(&mut stack, 4).unwrap();

        let first = receiver.descriptors().buffer(0).unwrap().id;
        let second = receiver.descriptors().buffer(1).unwrap().id;
        complete(&mut receiver, 0, 64);
        complete(&mut receiver, 1, 1514);
        hal.disable_interrupts(Interrupts::RX_CLASS);

        shared.rx_events().signal(Events::RX_INTERRUPT);
        assert!(matches!(receiver.poll(&mut stack), Ok(2)));

        assert_eq!(stack.delivered.len(), 2);
        assert_eq!(stack.delivered[0].id, first);
        assert_eq!(stack.delivered[0].frame(), Some((RX_DATA_OFFSET, 64)));
        assert_eq!(stack.delivered[1].id, second);
        assert_eq!(stack.delivered[1].frame(), Some((RX_DATA_OFFSET, 1514)));
        assert_eq!(receiver.fill_index(), 2);
        assert!(receiver
            .descriptors()
            .descriptors()
            .iter()
            .all(|d| !d.read().is_software_owned()));
        assert!(hal.enabled_interrupts().contains(Interrupts::RX_CLASS));
        assert_eq!(shared.counters().snapshot().rx_frames, 2);
    }

    #[test]
    fn receive_interrupt_wakes_the_engine() {
        let hal = MockHal::new();
        let shared = Shared::new();
        let mut table: RxDescriptorTable<TestBuffer, 8> = RxDescriptorTable::new();
        let mut stack = TestStack::with_buffers(8, RX_BUFFER_SIZE);
        let mut receiver = Receiver::new(&hal, &shared, &mut table);
        receiver.initialize(&mut stack, 4).unwrap();
        let handler = InterruptHandler::new(&hal, &shared);

        assert!(receiver.poll(&mut stack).is_err());

        complete(&mut receiver, 0, 128);
        hal.raise(Interrupts::RCOMP);
        handler.on_interrupt();
        assert!(!hal.enabled_interrupts().intersects(Interrupts::RX_CLASS));

        assert!(matches!(receiver.poll(&mut stack), Ok(1)));
        assert_eq!(stack.delivered.len(), 1);
        assert_eq!(stack.delivered[0].frame(), Some((RX_DATA_OFFSET, 128)));
        assert!(hal.enabled_interrupts().contains(Interrupts::RX_CLASS));
        assert!(receiver.poll(&mut stack).is_err());

        let statistics = shared.counters().snapshot();
        assert_eq!(statistics.rx_interrupts, 1);
        assert_eq!(statistics.rx_frames, 1);
    }

    #[test]
    fn fill_index_wraps_to_the_start() {
        let hal = MockHal::new();
        let shared = Shared::new();
        let mut table: RxDescriptorTable<TestBuffer, 8> = RxDescriptorTable::new();
        let mut stack = TestStack::with_buffers(16, RX_BUFFER_SIZE);
        let mut receiver = Receiver::new(&hal, &shared, &mut table);
        receiver.initialize(&mut stack, 3).unwrap();

        for round in 0..5 {
            let index = receiver.fill_index();
            complete(&mut receiver, index, 60);
            assert_eq!(receiver.drain(&mut stack), 1, "round {}", round);
            assert_eq!(receiver.descriptors().wrap_count(), 1);
            assert!(receiver.descriptors().descriptors()[2].read().is_wrap());
        }
        assert_eq!(receiver.fill_index(), 2);
        assert_eq!(stack.delivered.len(), 5);
    }

    #[test]
    fn starvation_drops_exactly_the_starved_frames_and_wakes_the_transmitter() {
        let hal = MockHal::new();
        let shared = Shared::new();
        let mut table: RxDescriptorTable<TestBuffer, 8> = RxDescriptorTable::new();
        let mut stack = TestStack::with_buffers(9, RX_BUFFER_SIZE);
        let mut receiver = Receiver::new(&hal, &shared, &mut table);
        receiver.initialize(&mut stack, 8).unwrap();

        let attached: Vec<usize> = (0..8)
            .map(|index| receiver.descriptors().buffer(index).unwrap().id)
            .collect();
        for index in 0..5 {
            complete(&mut receiver, index, 100);
        }

        stack.exhaust(true);
        assert_eq!(receiver.drain(&mut stack), 0);

        let statistics = shared.counters().snapshot();
        assert_eq!(statistics.rx_dropped_frames, 5);
        assert_eq!(statistics.rx_frames, 0);
        assert!(stack.delivered.is_empty());
        assert!(shared.tx_events().is_pending(Events::START_TRANSMIT));

        // Every slot is back with the controller, still holding its buffer.
        assert_eq!(receiver.fill_index(), 5);
        for (index, id) in attached.iter().enumerate() {
            assert_eq!(receiver.descriptors().buffer(index).unwrap().id, *id);
            assert!(!receiver.descriptors().descriptors()[index].read().is_software_owned());
        }
        assert_eq!(receiver.descriptors().wrap_count(), 1);

        // Reception resumes once buffers are available again.
        stack.exhaust(false);
        complete(&mut receiver, 5, 100);
        assert_eq!(receiver.drain(&mut stack), 1);
    }

    #[test]
    fn fragments_are_counted_and_recycled() {
        let hal = MockHal::new();
        let shared = Shared::new();
        let mut table: RxDescriptorTable<TestBuffer, 8> = RxDescriptorTable::new();
        let mut stack = TestStack::with_buffers(8, RX_BUFFER_SIZE);
        let mut receiver = Receiver::new(&hal, &shared, &mut table);
        receiver.initialize(&mut stack, 4).unwrap();

        receiver
            .descriptors_mut()
            .descriptor_mut(0)
            .complete(1536, false);
        assert_eq!(receiver.drain(&mut stack), 0);
        assert_eq!(shared.counters().snapshot().rx_fragment_errors, 1);
        assert_eq!(receiver.fill_index(), 1);
        assert!(!receiver.descriptors().descriptors()[0].read().is_software_owned());
    }

    #[test]
    fn restart_does_not_leak_buffers() {
        let hal = MockHal::new();
        let shared = Shared::new();
        let mut table: RxDescriptorTable<TestBuffer, 8> = RxDescriptorTable::new();
        let mut stack = TestStack::with_buffers(8, RX_BUFFER_SIZE);
        let mut receiver = Receiver::new(&hal, &shared, &mut table);

        for _ in 0..3 {
            receiver.initialize(&mut stack, 8).unwrap();
            assert_eq!(stack.pool_size(), 0);
            receiver.stop();
            assert!(!hal.is_receiving());
        }
    }
}
