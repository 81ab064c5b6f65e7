//! Interrupt driven driver for the GMAC Ethernet controller of the ATSAM4E
//! microcontrollers
//!
//! Frames move between the controller's receive and transmit descriptor rings
//! and the buffer pool of a host network stack. The hardware is reached only
//! through the [`Hal`] trait, implemented for the PAC `GMAC` peripheral when one
//! of the chip features (e.g. `atsam4e16e`) is enabled.
//!
//! # Usage
//!
//! Configure the interface with a [`Builder`] and `freeze` it into a
//! [`Controller`], passing statically allocated descriptor tables and a
//! [`Shared`] instance that the GMAC interrupt can reach. Then:
//!
//! - call [`Controller::init`] (or send [`Request::Up`]) to start the rings,
//! - call [`InterruptHandler::on_interrupt`] from the GMAC interrupt,
//! - call [`Controller::poll`] after every interrupt, from the task it wakes
//!   or from a main loop that sleeps with `wfi` while nothing is pending,
//! - call [`Controller::tick`] once per second for link supervision.
//!
//! The interrupt only masks sources and sets event bits, so the engines do
//! all their work in the context that polls them.

#![cfg_attr(not(test), no_std)]

#[cfg(feature = "atsam4e8c")]
pub use atsam4e8c_pac as pac;
#[cfg(feature = "atsam4e8e")]
pub use atsam4e8e_pac as pac;
#[cfg(feature = "atsam4e16c")]
pub use atsam4e16c_pac as pac;
#[cfg(feature = "atsam4e16e")]
pub use atsam4e16e_pac as pac;

use fugit::SecsDurationU32;

mod builder;
pub use builder::Builder;

mod controller;
pub use controller::{Controller, InterfaceFlags, Media, Request, Response};

mod descriptor_table;
pub use descriptor_table::DescriptorTable;

mod error;
pub use error::{Error, PhyError};

mod eui48;
pub use eui48::Identifier as EthernetAddress;

mod event;
pub use event::{EventFlags, Events};

#[cfg(feature = "atsam4e")]
mod gmac;

pub mod hal;
pub use hal::Hal;

mod interrupt;
pub use interrupt::{InterruptHandler, Shared};

mod interrupts;
pub use interrupts::Interrupts;

mod link;
pub use link::{LinkNegotiation, LinkType};

mod multicast;
pub use multicast::{hash_index, MulticastFilter, MulticastRange};

pub mod phy;

pub mod rx;
pub use rx::{Receiver, RxDescriptorTable};

mod stack;
pub use stack::{Chain, NetworkStack, PacketBuffer, MAX_SEGMENTS};

mod statistics;
pub use statistics::{Counters, MediaStatus, Report, Statistics};

pub mod tx;
pub use tx::{Transmitter, TxDescriptorTable};

mod volatile_read_write;

#[cfg(test)]
mod mock;

/// Largest frame the controller handles, VLAN tag included.
pub const MTU: usize = 1522;

/// Size of every receive buffer handed to the controller.
pub const RX_BUFFER_SIZE: usize = 1536;

/// Bytes the controller skips at the start of a receive buffer, so that the IP
/// header following the 14 byte Ethernet header is word aligned.
pub const RX_DATA_OFFSET: usize = 2;

/// Interval between link checks.
pub const WATCHDOG_PERIOD: SecsDurationU32 = SecsDurationU32::secs(5);
