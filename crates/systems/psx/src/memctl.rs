//! Memory control window and RAM_SIZE register
//!
//! The BIOS configures expansion base addresses and bus timings through
//! the 36-byte window at 0x1f801000. None of it affects this model; the
//! expansion bases are pinned by the address map. Writes are accepted so
//! the values read back, and anything unexpected in the base registers is
//! flagged because it would imply the BIOS remapped a region.

use emu_core::logging::{log, LogCategory, LogLevel};

/// Expected write to offset 0 (expansion 1 base).
const EXPANSION_1_BASE: u32 = 0x1f00_0000;

/// Expected write to offset 4 (expansion 2 base).
const EXPANSION_2_BASE: u32 = 0x1f80_2000;

pub struct MemControl {
    /// The 9 word registers of the control window
    regs: [u32; 9],
    /// RAM_SIZE register at 0x1f801060
    ram_size: u32,
}

impl MemControl {
    pub fn new() -> Self {
        MemControl {
            regs: [0; 9],
            ram_size: 0,
        }
    }

    pub fn load(&self, offset: u32) -> u32 {
        self.regs[(offset >> 2) as usize]
    }

    pub fn store(&mut self, offset: u32, value: u32) {
        match offset {
            0 if value != EXPANSION_1_BASE => {
                log(LogCategory::Stubs, LogLevel::Warn, || {
                    format!("unexpected expansion 1 base: 0x{:08x}", value)
                });
            }
            4 if value != EXPANSION_2_BASE => {
                log(LogCategory::Stubs, LogLevel::Warn, || {
                    format!("unexpected expansion 2 base: 0x{:08x}", value)
                });
            }
            _ => log(LogCategory::Stubs, LogLevel::Trace, || {
                format!("write 0x{:08x} to memory control 0x{:02x}", value, offset)
            }),
        }
        self.regs[(offset >> 2) as usize] = value;
    }

    pub fn ram_size(&self) -> u32 {
        self.ram_size
    }

    pub fn set_ram_size(&mut self, value: u32) {
        log(LogCategory::Stubs, LogLevel::Trace, || {
            format!("write 0x{:08x} to RAM_SIZE", value)
        });
        self.ram_size = value;
    }
}

impl Default for MemControl {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_read_back() {
        let mut mc = MemControl::new();
        mc.store(0, EXPANSION_1_BASE);
        mc.store(4, EXPANSION_2_BASE);
        mc.store(8, 0x0013_243f);
        assert_eq!(mc.load(0), EXPANSION_1_BASE);
        assert_eq!(mc.load(4), EXPANSION_2_BASE);
        assert_eq!(mc.load(8), 0x0013_243f);
    }

    #[test]
    fn test_ram_size_register() {
        let mut mc = MemControl::new();
        mc.set_ram_size(0x0000_0b88);
        assert_eq!(mc.ram_size(), 0x0000_0b88);
    }
}
