use bitflags::bitflags;

bitflags! {
    /// GMAC interrupt sources, laid out as in the interrupt enable, disable and
    /// status registers.
    #[derive(Default)]
    pub struct Interrupts: u32 {
        /// Management frame sent
        const MFS = 1 << 0;
        /// Receive complete
        const RCOMP = 1 << 1;
        /// RX used bit read
        const RXUBR = 1 << 2;
        /// TX used bit read
        const TXUBR = 1 << 3;
        /// Transmit underrun
        const TUR = 1 << 4;
        /// Retry limit exceeded
        const RLEX = 1 << 5;
        /// Transmit frame corruption due to AHB error
        const TFC = 1 << 6;
        /// Transmit complete
        const TCOMP = 1 << 7;
        /// Receive overrun
        const ROVR = 1 << 10;
        /// HRESP not OK
        const HRESP = 1 << 11;
        /// Pause frame with non-zero pause quantum received
        const PFNZ = 1 << 12;
        /// Pause time zero
        const PTZ = 1 << 13;
        /// Pause frame transmitted
        const PFTR = 1 << 14;

        /// Sources serviced by the receive engine.
        const RX_CLASS = Self::RCOMP.bits | Self::ROVR.bits;
        /// Sources serviced by the transmit engine.
        const TX_CLASS = Self::TUR.bits
            | Self::RLEX.bits
            | Self::TFC.bits
            | Self::HRESP.bits
            | Self::TCOMP.bits;
    }
}

impl defmt::Format for Interrupts {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Interrupts({=u32:#x})", self.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::Interrupts;

    #[test]
    fn classes_do_not_overlap() {
        assert!((Interrupts::RX_CLASS & Interrupts::TX_CLASS).is_empty());
        assert_eq!(Interrupts::RX_CLASS.bits(), 0x0000_0402);
        assert_eq!(Interrupts::TX_CLASS.bits(), 0x0000_08F0);
    }
}
