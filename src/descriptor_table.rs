use crate::Error;
use heapless::Vec;

/// The parts of a descriptor the generic table needs to know about.
pub trait Descriptor {
    fn is_wrap(&self) -> bool;
}

/// A ring of hardware visible descriptors with one attached packet buffer
/// handle per slot.
///
/// Storage for `COUNT` slots is reserved up front (usually in a `static`), the
/// ring itself is allocated at interface start with the configured length. The
/// descriptor array must not move once its base address has been handed to
/// the controller.
#[repr(C)]
pub struct DescriptorTable<D, B, const COUNT: usize> {
    descriptors: Vec<D, COUNT>,
    buffers: Vec<Option<B>, COUNT>,
}

impl<D: Descriptor, B, const COUNT: usize> DescriptorTable<D, B, COUNT> {
    pub const fn new() -> Self {
        DescriptorTable {
            descriptors: Vec::new(),
            buffers: Vec::new(),
        }
    }

    /// Builds a ring of `length` descriptors. `make` is told whether the slot
    /// it creates is the last one, which is the only slot that may carry the
    /// wrap marker.
    ///
    /// Any buffer still attached from a previous allocation must have been
    /// detached before; stale handles are dropped.
    pub(crate) fn allocate<F>(&mut self, length: usize, mut make: F) -> Result<(), Error>
    where
        F: FnMut(bool) -> D,
    {
        if length < 2 || length > COUNT {
            return Err(Error::RingAllocation);
        }

        self.descriptors.clear();
        self.buffers.clear();
        for index in 0..length {
            self.descriptors
                .push(make(index == length - 1))
                .map_err(|_| Error::RingAllocation)?;
            self.buffers.push(None).map_err(|_| Error::RingAllocation)?;
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn is_last(&self, index: usize) -> bool {
        index + 1 == self.len()
    }

    pub fn next_index(&self, index: usize) -> usize {
        if self.is_last(index) {
            0
        } else {
            index + 1
        }
    }

    pub fn base_address(&self) -> u32 {
        self.descriptors.as_ptr() as usize as u32
    }

    pub fn descriptors(&self) -> &[D] {
        &self.descriptors
    }

    pub(crate) fn descriptor(&self, index: usize) -> &D {
        &self.descriptors[index]
    }

    pub(crate) fn descriptor_mut(&mut self, index: usize) -> &mut D {
        &mut self.descriptors[index]
    }

    /// Attaches `buffer` to slot `index`, returning the buffer it replaces.
    pub(crate) fn attach(&mut self, index: usize, buffer: B) -> Option<B> {
        self.buffers[index].replace(buffer)
    }

    pub(crate) fn detach(&mut self, index: usize) -> Option<B> {
        self.buffers[index].take()
    }

    pub(crate) fn buffer(&self, index: usize) -> Option<&B> {
        self.buffers[index].as_ref()
    }

    /// Detaches every buffer still attached to the ring.
    pub(crate) fn detach_all(&mut self) -> impl Iterator<Item = B> + '_ {
        self.buffers.iter_mut().filter_map(Option::take)
    }

    /// Number of descriptors carrying the wrap marker.
    pub fn wrap_count(&self) -> usize {
        self.descriptors.iter().filter(|d| d.is_wrap()).count()
    }
}

impl<D: Descriptor, B, const COUNT: usize> Default for DescriptorTable<D, B, COUNT> {
    fn default() -> Self {
        Self::new()
    }
}
