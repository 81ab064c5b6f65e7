enum BitNumber {
    Speed10MbpsHalfDuplex = 5,  // 10BASE-T Half Duplex Support
    Speed10MbpsFullDuplex = 6,  // 10BASE-T Full Duplex Support
    Speed100MbpsHalfDuplex = 7, // 100BASE-TX Half Duplex Support
    Speed100MbpsFullDuplex = 8, // 100BASE-TX Full Duplex Support
}

/// Auto-Negotiation Link Partner Ability Register
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub struct Anlpar(u16);
impl Anlpar {
    pub fn new(initial_value: u16) -> Self {
        Anlpar(initial_value)
    }

    pub fn half_duplex_10base_t_capable(&self) -> bool {
        self.0 & (1 << BitNumber::Speed10MbpsHalfDuplex as u32) != 0
    }

    pub fn full_duplex_10base_t_capable(&self) -> bool {
        self.0 & (1 << BitNumber::Speed10MbpsFullDuplex as u32) != 0
    }

    pub fn half_duplex_100base_tx_capable(&self) -> bool {
        self.0 & (1 << BitNumber::Speed100MbpsHalfDuplex as u32) != 0
    }

    pub fn full_duplex_100base_tx_capable(&self) -> bool {
        self.0 & (1 << BitNumber::Speed100MbpsFullDuplex as u32) != 0
    }
}
