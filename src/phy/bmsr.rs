use bitflags::bitflags;

bitflags! {
    /// Basic Mode Status Register
    #[derive(Default)]
    pub struct Bmsr: u16 {
        const EXTENDED_CAPABILITY = 1 << 0;
        const JABBER_DETECTED = 1 << 1;
        /// Latched low: a link loss since the previous read reads as down once.
        const LINK_STATUS = 1 << 2;
        const AUTO_NEGOTIATION_ABILITY = 1 << 3;
        const REMOTE_FAULT = 1 << 4;
        const AUTO_NEGOTIATION_COMPLETE = 1 << 5;
        const PREAMBLE_SUPPRESSION = 1 << 6;
        const HALF_DUPLEX_10BASE_T = 1 << 11;
        const FULL_DUPLEX_10BASE_T = 1 << 12;
        const HALF_DUPLEX_100BASE_TX = 1 << 13;
        const FULL_DUPLEX_100BASE_TX = 1 << 14;
    }
}

impl Bmsr {
    /// Keeps the defined bits of a raw register value.
    pub fn new(value: u16) -> Self {
        Bmsr::from_bits_truncate(value)
    }

    pub fn link_detected(&self) -> bool {
        self.contains(Bmsr::LINK_STATUS)
    }

    pub fn auto_negotiation_complete(&self) -> bool {
        self.contains(Bmsr::AUTO_NEGOTIATION_COMPLETE)
    }
}

impl defmt::Format for Bmsr {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Bmsr({=u16:#x})", self.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::Bmsr;

    #[test]
    fn decodes_link_state() {
        let status = Bmsr::new(0x786D);
        assert!(status.link_detected());
        assert!(status.auto_negotiation_complete());
        assert!(status.contains(Bmsr::FULL_DUPLEX_100BASE_TX));

        let status = Bmsr::new(0x7849);
        assert!(!status.link_detected());
        assert!(!status.auto_negotiation_complete());
    }
}
