/// Volatile access to a hardware visible descriptor word.
///
/// Descriptor words are shared with the GMAC DMA engine, so every access goes
/// through a volatile read or write. The flag helpers read the word, change only
/// the requested bits and write the result back.
pub trait VolatileReadWrite {
    fn read_volatile(&self) -> u32;
    fn write_volatile(&mut self, new_value: u32);

    fn set_bits_volatile(&mut self, mask: u32) {
        let value = self.read_volatile();
        self.write_volatile(value | mask);
    }

    fn clear_bits_volatile(&mut self, mask: u32) {
        let value = self.read_volatile();
        self.write_volatile(value & !mask);
    }
}

impl VolatileReadWrite for u32 {
    fn read_volatile(&self) -> u32 {
        unsafe { core::ptr::read_volatile(self) }
    }

    fn write_volatile(&mut self, new_value: u32) {
        unsafe {
            core::ptr::write_volatile(self, new_value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::VolatileReadWrite;

    #[test]
    fn flag_helpers_preserve_other_bits() {
        let mut word = 0x8000_1234u32;
        word.set_bits_volatile(0x0000_0001);
        assert_eq!(word.read_volatile(), 0x8000_1235);

        word.clear_bits_volatile(0x8000_0000);
        assert_eq!(word.read_volatile(), 0x0000_1235);
    }
}
