enum BitNumber {
    FullDuplex = 8,
    RestartAutoNegotiation = 9,
    EnableAutoNegotiation = 12,
    Speed100Mbps = 13,
    Reset = 15,
}

/// Basic Mode Control Register
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub struct Bmcr(pub(super) u16);
impl Bmcr {
    pub fn new(initial_value: u16) -> Self {
        Bmcr(initial_value)
    }

    pub fn bits(&self) -> u16 {
        self.0
    }

    pub fn is_reset(&self) -> bool {
        self.0 & (1 << BitNumber::Reset as u32) != 0
    }

    pub fn is_auto_negotiation_enabled(&self) -> bool {
        self.0 & (1 << BitNumber::EnableAutoNegotiation as u32) != 0
    }

    pub fn is_full_duplex(&self) -> bool {
        self.0 & (1 << BitNumber::FullDuplex as u32) != 0
    }

    pub fn is_100mbit(&self) -> bool {
        self.0 & (1 << BitNumber::Speed100Mbps as u32) != 0
    }

    pub fn set_full_duplex(self, full_duplex: bool) -> Self {
        self.assign(BitNumber::FullDuplex, full_duplex)
    }

    pub fn set_auto_negotiation_restart(self) -> Self {
        Self(self.0 | (1 << BitNumber::RestartAutoNegotiation as u32))
    }

    pub fn set_enable_auto_negotiation(self, enable: bool) -> Self {
        self.assign(BitNumber::EnableAutoNegotiation, enable)
    }

    pub fn set_speed_100(self, speed_100: bool) -> Self {
        self.assign(BitNumber::Speed100Mbps, speed_100)
    }

    pub fn set_reset(self) -> Self {
        Self(self.0 | (1 << BitNumber::Reset as u32))
    }

    fn assign(self, bit: BitNumber, value: bool) -> Self {
        let mask = 1 << bit as u32;
        if value {
            Self(self.0 | mask)
        } else {
            Self(self.0 & !mask)
        }
    }
}
