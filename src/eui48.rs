/// A 48-bit Ethernet (MAC) address, stored in transmission order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, defmt::Format)]
pub struct Identifier([u8; 6]);

impl Identifier {
    pub const BROADCAST: Identifier = Identifier([0xFF; 6]);

    pub const fn new(bytes: [u8; 6]) -> Self {
        Identifier(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// The address as the controller sees it: the first transmitted octet is the
    /// least significant byte.
    pub fn to_le_u64(&self) -> u64 {
        let b = &self.0;
        (b[0] as u64)
            | (b[1] as u64) << 8
            | (b[2] as u64) << 16
            | (b[3] as u64) << 24
            | (b[4] as u64) << 32
            | (b[5] as u64) << 40
    }

    /// The address as a number in network byte order, so that consecutive
    /// addresses differ in the last octet.
    pub fn to_be_u64(&self) -> u64 {
        let b = &self.0;
        (b[0] as u64) << 40
            | (b[1] as u64) << 32
            | (b[2] as u64) << 24
            | (b[3] as u64) << 16
            | (b[4] as u64) << 8
            | (b[5] as u64)
    }

    pub fn from_be_u64(value: u64) -> Self {
        Identifier([
            (value >> 40) as u8,
            (value >> 32) as u8,
            (value >> 24) as u8,
            (value >> 16) as u8,
            (value >> 8) as u8,
            value as u8,
        ])
    }

    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl From<[u8; 6]> for Identifier {
    fn from(bytes: [u8; 6]) -> Self {
        Identifier(bytes)
    }
}
