use super::{
    descriptor_table::{Descriptor, DescriptorTable},
    hal::Hal,
    volatile_read_write::VolatileReadWrite,
};

mod descriptor;
pub use descriptor::{TxDescriptor, TxDescriptorReader};

mod ring;
pub use ring::TxRing;

mod transmitter;
pub use transmitter::Transmitter;

/// Transmit descriptors plus the buffers attached to them.
pub type TxDescriptorTable<B, const COUNT: usize> = DescriptorTable<TxDescriptor, B, COUNT>;
