use super::{
    descriptor_table::{Descriptor, DescriptorTable},
    hal::Hal,
    volatile_read_write::VolatileReadWrite,
};

mod descriptor;
pub use descriptor::{RxDescriptor, RxDescriptorReader};

mod receiver;
pub use receiver::Receiver;

/// Receive descriptors plus the buffers attached to them.
pub type RxDescriptorTable<B, const COUNT: usize> = DescriptorTable<RxDescriptor, B, COUNT>;
