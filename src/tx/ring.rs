/// Slot bookkeeping of the transmit descriptor ring.
///
/// `used` is the next slot to fill, `free` the oldest slot not yet reclaimed.
/// The ring is empty when both are equal and full when advancing `used` would
/// reach `free`, so at most `length - 1` slots are ever in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub struct TxRing {
    used: usize,
    free: usize,
    length: usize,
}

impl TxRing {
    pub const fn new(length: usize) -> Self {
        TxRing {
            used: 0,
            free: 0,
            length,
        }
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn free(&self) -> usize {
        self.free
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Slots a single frame may occupy at most.
    pub fn capacity(&self) -> usize {
        self.length.saturating_sub(1)
    }

    pub fn advance(&self, index: usize) -> usize {
        (index + 1) % self.length
    }

    pub fn is_empty(&self) -> bool {
        self.used == self.free
    }

    pub fn is_full(&self) -> bool {
        self.length == 0 || self.advance(self.used) == self.free
    }

    pub fn in_flight(&self) -> usize {
        (self.used + self.length - self.free) % self.length.max(1)
    }

    /// Claims the slot at `used`, or `None` if the ring is full.
    pub(crate) fn take(&mut self) -> Option<usize> {
        if self.is_full() {
            return None;
        }
        let index = self.used;
        self.used = self.advance(index);
        Some(index)
    }

    /// Gives back the most recently claimed slot.
    pub(crate) fn untake(&mut self) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        self.used = (self.used + self.length - 1) % self.length;
        Some(self.used)
    }

    /// Retires the slot at `free`, or `None` if nothing is in flight.
    pub(crate) fn retire(&mut self) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        let index = self.free;
        self.free = self.advance(index);
        Some(index)
    }
}
