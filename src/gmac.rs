//! [`Hal`] for the GMAC peripheral of the ATSAM4E parts.

use crate::{
    eui48::Identifier as EthernetAddress,
    hal::{DmaConfig, Hal, HardwareStatistics, MdcClock, PhyOperation},
    interrupts::Interrupts,
    link::LinkType,
    pac::GMAC,
};
use paste::paste;

// Management frame encoding
const MAN_WRITE_TEN: u8 = 0b10;
const MAN_OPERATION_READ: u8 = 0b10;
const MAN_OPERATION_WRITE: u8 = 0b01;

macro_rules! define_ethernet_address_function {
    (
        $($address_number:literal),+
    ) => {
        paste! {
            fn write_ethernet_address(&self, index: usize, ethernet_address: &EthernetAddress) {
                let bytes = ethernet_address.as_bytes();
                let bottom = (bytes[0] as u32)
                    | (bytes[1] as u32) << 8
                    | (bytes[2] as u32) << 16
                    | (bytes[3] as u32) << 24;
                let top = (bytes[4] as u32) | (bytes[5] as u32) << 8;

                match index {
                    $(
                        $address_number => {
                            self.[<sab $address_number>].write(|w| unsafe { w.bits(bottom) });
                            // NOTE: Writing the top bits (e.g. satX) enables the address in the hardware.
                            self.[<sat $address_number>].write(|w| unsafe { w.bits(top) });
                        }
                    )+
                    _ => defmt::warn!("no specific address register {=usize}", index),
                }
            }
        }
    };
}

trait SpecificAddress {
    fn write_ethernet_address(&self, index: usize, ethernet_address: &EthernetAddress);
}

impl SpecificAddress for GMAC {
    define_ethernet_address_function!(1, 2, 3, 4);
}

impl Hal for GMAC {
    fn enable_receive(&self, enable: bool) {
        self.ncr.modify(|_, w| w.rxen().bit(enable));
    }

    fn enable_transmit(&self, enable: bool) {
        self.ncr.modify(|_, w| w.txen().bit(enable));
    }

    fn set_receive_queue(&self, base_address: u32) {
        self.rbqb.write(|w| unsafe { w.bits(base_address) });
    }

    fn set_transmit_queue(&self, base_address: u32) {
        self.tbqb.write(|w| unsafe { w.bits(base_address) });
    }

    fn set_receive_buffer_offset(&self, offset: u8) {
        self.ncfgr.modify(|_, w| unsafe { w.rxbufo().bits(offset) });
    }

    fn configure_dma(&self, config: DmaConfig) {
        self.dcfgr.write(|w| unsafe { w.bits(config.bits()) });
    }

    fn enable_statistics_write(&self, enable: bool) {
        self.ncr.modify(|_, w| w.westat().bit(enable));
    }

    fn enable_interrupts(&self, sources: Interrupts) {
        self.ier.write_with_zero(|w| unsafe { w.bits(sources.bits()) });
    }

    fn disable_interrupts(&self, sources: Interrupts) {
        self.idr.write_with_zero(|w| unsafe { w.bits(sources.bits()) });
    }

    fn interrupt_status(&self) -> Interrupts {
        Interrupts::from_bits_truncate(self.isr.read().bits())
    }

    fn start_transmission(&self) {
        self.ncr.modify(|_, w| w.tstart().set_bit());
    }

    fn enable_management_port(&self, enable: bool) {
        self.ncr.modify(|_, w| w.mpe().bit(enable));
    }

    fn set_mdc_clock(&self, clock: MdcClock) {
        self.ncfgr.modify(|_, w| match clock {
            MdcClock::Mck8 => w.clk().mck_8(),
            MdcClock::Mck16 => w.clk().mck_16(),
            MdcClock::Mck32 => w.clk().mck_32(),
            MdcClock::Mck48 => w.clk().mck_48(),
            MdcClock::Mck64 => w.clk().mck_64(),
            MdcClock::Mck96 => w.clk().mck_96(),
        });
    }

    fn phy_maintain(&self, phy_address: u8, register: u8, operation: PhyOperation) {
        let (op, data) = match operation {
            PhyOperation::Read => (MAN_OPERATION_READ, 0),
            PhyOperation::Write(data) => (MAN_OPERATION_WRITE, data),
        };
        self.man.write(|w| unsafe {
            w.wtn()
                .bits(MAN_WRITE_TEN)
                .rega()
                .bits(register)
                .phya()
                .bits(phy_address)
                .op()
                .bits(op)
                .cltto()
                .set_bit()
                .wzo()
                .clear_bit()
                .data()
                .bits(data)
        });
    }

    fn is_phy_idle(&self) -> bool {
        self.nsr.read().idle().bit()
    }

    fn phy_data(&self) -> u16 {
        self.man.read().data().bits()
    }

    fn set_link_speed(&self, link: LinkType) {
        self.ncfgr.modify(|_, w| {
            w.spd()
                .bit(link.is_100mbit())
                .fd()
                .bit(link.is_full_duplex())
        });
    }

    fn set_ethernet_address(&self, index: usize, address: &EthernetAddress) {
        self.write_ethernet_address(index, address);
    }

    fn set_copy_all_frames(&self, enable: bool) {
        self.ncfgr.modify(|_, w| w.caf().bit(enable));
    }

    fn set_no_broadcast(&self, enable: bool) {
        self.ncfgr.modify(|_, w| w.nbc().bit(enable));
    }

    fn enable_multicast_hash(&self, enable: bool) {
        self.ncfgr.modify(|_, w| w.mtihen().bit(enable));
    }

    fn set_multicast_hash(&self, bottom: u32, top: u32) {
        self.hrb.write(|w| unsafe { w.bits(bottom) });
        self.hrt.write(|w| unsafe { w.bits(top) });
    }

    fn read_statistics(&self) -> HardwareStatistics {
        HardwareStatistics {
            octets_transmitted: (self.othi.read().bits() as u64) << 32 | self.otlo.read().bits() as u64,
            frames_transmitted: self.ft.read().bits(),
            broadcast_frames_transmitted: self.bcft.read().bits(),
            multicast_frames_transmitted: self.mft.read().bits(),
            pause_frames_transmitted: self.pft.read().bits(),
            transmit_underruns: self.tur.read().bits(),
            single_collision_frames: self.scf.read().bits(),
            multiple_collision_frames: self.mcf.read().bits(),
            excessive_collisions: self.ec.read().bits(),
            late_collisions: self.lc.read().bits(),
            deferred_transmission_frames: self.dtf.read().bits(),
            carrier_sense_errors: self.cse.read().bits(),
            octets_received: (self.orhi.read().bits() as u64) << 32 | self.orlo.read().bits() as u64,
            frames_received: self.fr.read().bits(),
            broadcast_frames_received: self.bcfr.read().bits(),
            multicast_frames_received: self.mfr.read().bits(),
            pause_frames_received: self.pfr.read().bits(),
            undersize_frames_received: self.ufr.read().bits(),
            oversize_frames_received: self.ofr.read().bits(),
            jabbers_received: self.jr.read().bits(),
            frame_check_sequence_errors: self.fcse.read().bits(),
            length_field_frame_errors: self.lffe.read().bits(),
            receive_symbol_errors: self.rse.read().bits(),
            alignment_errors: self.ae.read().bits(),
            receive_resource_errors: self.rre.read().bits(),
            receive_overruns: self.roe.read().bits(),
            ip_header_checksum_errors: self.ihce.read().bits(),
            tcp_checksum_errors: self.tce.read().bits(),
            udp_checksum_errors: self.uce.read().bits(),
        }
    }

    // The Cortex-M4 core of the SAM4E has no data cache.
    fn flush_data_cache(&self, _address: usize, _length: usize) {}

    fn invalidate_data_cache(&self, _address: usize, _length: usize) {}

    fn data_synchronization_barrier(&self) {
        cortex_m::asm::dsb();
    }
}
