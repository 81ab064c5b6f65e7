use crate::{eui48::Identifier as EthernetAddress, Error};
use heapless::Vec;

/// Most distinct multicast ranges the filter keeps track of.
pub const MAX_RANGES: usize = 16;

const INDEX_BITS: u32 = 6;
const GROUPS: u32 = 8;

/// Position of `address` in the 64-bit multicast hash.
///
/// Bit `i` of the index is the exclusive or of every sixth address bit
/// starting at bit `i`, with the address taken as it is sent on the wire (the
/// first octet holds the least significant bits).
pub fn hash_index(address: &EthernetAddress) -> u8 {
    let value = address.to_le_u64();
    let mut index = 0;
    for bit in 0..INDEX_BITS {
        let folded = (0..GROUPS).fold(0, |folded, group| {
            folded ^ ((value >> (bit + INDEX_BITS * group)) & 1)
        });
        index |= (folded as u8) << bit;
    }
    index
}

/// An inclusive range of multicast addresses the interface is a member of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub struct MulticastRange {
    pub low: EthernetAddress,
    pub high: EthernetAddress,
    references: u32,
}

impl MulticastRange {
    pub fn references(&self) -> u32 {
        self.references
    }
}

/// Multicast membership list and the hash derived from it.
///
/// The list is authoritative: the hash is recomputed from scratch whenever
/// membership changes, never patched.
#[derive(Clone, Debug, Default)]
pub struct MulticastFilter {
    ranges: Vec<MulticastRange, MAX_RANGES>,
}

impl MulticastFilter {
    pub const fn new() -> Self {
        MulticastFilter { ranges: Vec::new() }
    }

    /// Joins the range `low..=high`.
    ///
    /// Returns `true` when the list changed and the hardware filter has to be
    /// rebuilt, `false` when an existing range merely gained a reference.
    pub fn add(&mut self, low: EthernetAddress, high: EthernetAddress) -> Result<bool, Error> {
        if !low.is_multicast() || low > high {
            return Err(Error::InvalidMulticastAddress);
        }

        if let Some(range) = self.find_mut(&low, &high) {
            range.references += 1;
            return Ok(false);
        }

        self.ranges
            .push(MulticastRange {
                low,
                high,
                references: 1,
            })
            .map_err(|_| Error::MulticastListFull)?;
        Ok(true)
    }

    /// Leaves the range `low..=high`; returns `true` once the last reference
    /// is gone and the range was dropped from the list.
    pub fn remove(&mut self, low: EthernetAddress, high: EthernetAddress) -> Result<bool, Error> {
        let position = self
            .ranges
            .iter()
            .position(|range| range.low == low && range.high == high)
            .ok_or(Error::MulticastAddressNotFound)?;

        let range = &mut self.ranges[position];
        range.references -= 1;
        if range.references > 0 {
            return Ok(false);
        }

        self.ranges.swap_remove(position);
        Ok(true)
    }

    /// Bottom and top halves of the hash covering every member address.
    pub fn hash(&self) -> (u32, u32) {
        let mut hash = 0u64;
        'ranges: for range in &self.ranges {
            let high = range.high.to_be_u64();
            let mut address = range.low.to_be_u64();
            while address <= high {
                hash |= 1 << hash_index(&EthernetAddress::from_be_u64(address));
                if hash == u64::MAX {
                    break 'ranges;
                }
                address += 1;
            }
        }
        (hash as u32, (hash >> 32) as u32)
    }

    pub fn ranges(&self) -> &[MulticastRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    fn find_mut(&mut self, low: &EthernetAddress, high: &EthernetAddress) -> Option<&mut MulticastRange> {
        self.ranges
            .iter_mut()
            .find(|range| range.low == *low && range.high == *high)
    }
}
