//! MII management of the external PHY.

use crate::{
    error::PhyError,
    hal::{Hal, PhyOperation},
};
use embedded_hal::blocking::delay::DelayMs;

mod anlpar; // Auto-Negotiation Link Partner Ability Register
pub use anlpar::Anlpar;

mod bmcr; // Basic Mode Control Register
pub use bmcr::Bmcr;

mod bmsr; // Basic Mode Status Register
pub use bmsr::Bmsr;

/// Highest address on the management bus.
pub const MAX_ADDRESS: u8 = 31;

const RESET_POLLS: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum Register {
    Bmcr = 0x00,
    Bmsr = 0x01,
    PhyIdr1 = 0x02,
    PhyIdr2 = 0x03,
    Anar = 0x04,
    Anlpar = 0x05,
}

/// The PHY on the management bus.
///
/// Every access is a management frame followed by a bounded wait for the
/// management port to become idle. An unknown address is a terminal state:
/// all accesses then fail with [`PhyError::InvalidAddress`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub struct Phy {
    address: Option<u8>,
    retries: u32,
    identifier: Option<u32>,
}

impl Phy {
    pub const fn new(address: Option<u8>, retries: u32) -> Self {
        Phy {
            address,
            retries,
            identifier: None,
        }
    }

    pub fn address(&self) -> Option<u8> {
        self.address
    }

    /// PHYIDR1 in the upper and PHYIDR2 in the lower half, once read.
    pub fn identifier(&self) -> Option<u32> {
        self.identifier
    }

    pub fn is_valid(&self) -> bool {
        self.address.is_some()
    }

    pub fn invalidate(&mut self) {
        self.address = None;
        self.identifier = None;
    }

    pub fn read<H: Hal, D: DelayMs<u32>>(
        &self,
        hal: &H,
        delay: &mut D,
        register: Register,
    ) -> Result<u16, PhyError> {
        let address = self.address.ok_or(PhyError::InvalidAddress)?;
        self.read_at(hal, delay, address, register)
    }

    pub fn write<H: Hal, D: DelayMs<u32>>(
        &self,
        hal: &H,
        delay: &mut D,
        register: Register,
        value: u16,
    ) -> Result<(), PhyError> {
        let address = self.address.ok_or(PhyError::InvalidAddress)?;
        self.maintain(hal, delay, address, register, PhyOperation::Write(value))
    }

    /// Read-modify-write of the control register.
    pub fn modify<H, D, F>(&self, hal: &H, delay: &mut D, f: F) -> Result<(), PhyError>
    where
        H: Hal,
        D: DelayMs<u32>,
        F: FnOnce(Bmcr) -> Bmcr,
    {
        let bmcr = Bmcr::new(self.read(hal, delay, Register::Bmcr)?);
        self.write(hal, delay, Register::Bmcr, f(bmcr).0)
    }

    pub fn status<H: Hal, D: DelayMs<u32>>(&self, hal: &H, delay: &mut D) -> Result<Bmsr, PhyError> {
        self.read(hal, delay, Register::Bmsr).map(Bmsr::new)
    }

    /// Finds the PHY if no address was configured.
    ///
    /// Addresses are probed from 31 down to 0; the first one whose PHYIDR1
    /// reads as neither all zeros nor all ones is taken. The identifier is
    /// read from the chosen address either way.
    pub fn discover<H: Hal, D: DelayMs<u32>>(&mut self, hal: &H, delay: &mut D) -> Option<u8> {
        if self.address.is_none() {
            self.address = (0..=MAX_ADDRESS).rev().find(|&address| {
                matches!(
                    self.read_at(hal, delay, address, Register::PhyIdr1),
                    Ok(value) if value != 0 && value != 0xFFFF
                )
            });
        }

        match self.address {
            Some(address) => {
                self.identifier = self.read_identifier(hal, delay).ok();
                defmt::info!("PHY at address {=u8}, id {}", address, self.identifier);
            }
            None => defmt::warn!("no PHY answered on the management bus"),
        }
        self.address
    }

    /// Resets the PHY and waits for the reset bit to clear.
    pub fn reset<H: Hal, D: DelayMs<u32>>(&self, hal: &H, delay: &mut D) -> Result<(), PhyError> {
        self.write(hal, delay, Register::Bmcr, Bmcr::new(0).set_reset().0)?;
        for _ in 0..RESET_POLLS {
            if !Bmcr::new(self.read(hal, delay, Register::Bmcr)?).is_reset() {
                return Ok(());
            }
        }
        Err(PhyError::Timeout)
    }

    pub fn enable_auto_negotiation<H: Hal, D: DelayMs<u32>>(
        &self,
        hal: &H,
        delay: &mut D,
    ) -> Result<(), PhyError> {
        self.modify(hal, delay, |w| w.set_enable_auto_negotiation(true))
    }

    fn read_identifier<H: Hal, D: DelayMs<u32>>(&self, hal: &H, delay: &mut D) -> Result<u32, PhyError> {
        let high = self.read(hal, delay, Register::PhyIdr1)?;
        let low = self.read(hal, delay, Register::PhyIdr2)?;
        Ok((high as u32) << 16 | low as u32)
    }

    fn read_at<H: Hal, D: DelayMs<u32>>(
        &self,
        hal: &H,
        delay: &mut D,
        address: u8,
        register: Register,
    ) -> Result<u16, PhyError> {
        self.maintain(hal, delay, address, register, PhyOperation::Read)?;
        Ok(hal.phy_data())
    }

    fn maintain<H: Hal, D: DelayMs<u32>>(
        &self,
        hal: &H,
        delay: &mut D,
        address: u8,
        register: Register,
        operation: PhyOperation,
    ) -> Result<(), PhyError> {
        if address > MAX_ADDRESS {
            return Err(PhyError::InvalidAddress);
        }

        hal.phy_maintain(address, register as u8, operation);

        let polls = self.retries.max(1);
        for poll in 0..polls {
            if hal.is_phy_idle() {
                return Ok(());
            }
            if poll + 1 < polls {
                delay.delay_ms(1);
            }
        }
        Err(PhyError::Timeout)
    }
}
