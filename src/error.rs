/// Errors reported by the PHY management interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum PhyError {
    /// The management port did not become idle within the retry budget.
    Timeout,
    /// The PHY address is out of range, or no PHY was found during discovery.
    InvalidAddress,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum Error {
    /// The requested ring length does not fit the descriptor table.
    RingAllocation,
    /// No packet buffer was available while filling the receive ring.
    BufferAllocation,
    /// The low address of a multicast range is not a multicast address, or the
    /// range is reversed.
    InvalidMulticastAddress,
    MulticastListFull,
    MulticastAddressNotFound,
    Phy(PhyError),
}

impl From<PhyError> for Error {
    fn from(e: PhyError) -> Self {
        Error::Phy(e)
    }
}
