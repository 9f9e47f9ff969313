//! DMA register block
//!
//! Register-level model only: channel setup, the control register and the
//! interrupt register are readable and writable, but no transfers are
//! performed. The BIOS programs the control register during boot and
//! expects its reset value back beforehand.

use emu_core::logging::{log, LogCategory, LogLevel};

/// Reset value of the DMA control register (channel priorities).
pub const CONTROL_RESET: u32 = 0x0765_4321;

/// Per-channel register set: base address, block control, channel control.
#[derive(Debug, Clone, Copy, Default)]
struct Channel {
    base: u32,
    block: u32,
    control: u32,
}

pub struct Dma {
    channels: [Channel; 7],
    control: u32,
    /// Interrupt register, bit 15 force, bits 16-22 per-channel enable,
    /// bit 23 master enable, bits 24-30 per-channel flags
    irq_en: bool,
    channel_irq_en: u8,
    channel_irq_flags: u8,
    force_irq: bool,
    irq_dummy: u8,
}

impl Dma {
    pub fn new() -> Self {
        Dma {
            channels: [Channel::default(); 7],
            control: CONTROL_RESET,
            irq_en: false,
            channel_irq_en: 0,
            channel_irq_flags: 0,
            force_irq: false,
            irq_dummy: 0,
        }
    }

    pub fn control(&self) -> u32 {
        self.control
    }

    pub fn set_control(&mut self, value: u32) {
        self.control = value;
    }

    /// Bit 31 of the interrupt register: master IRQ flag.
    fn irq_active(&self) -> bool {
        let channel_irq = self.channel_irq_flags & self.channel_irq_en;
        self.force_irq || (self.irq_en && channel_irq != 0)
    }

    pub fn interrupt(&self) -> u32 {
        let mut r = self.irq_dummy as u32;
        r |= (self.force_irq as u32) << 15;
        r |= (self.channel_irq_en as u32) << 16;
        r |= (self.irq_en as u32) << 23;
        r |= (self.channel_irq_flags as u32) << 24;
        r |= (self.irq_active() as u32) << 31;
        r
    }

    /// Writing 1 to a flag bit (24-30) acknowledges it.
    pub fn set_interrupt(&mut self, value: u32) {
        self.irq_dummy = (value & 0x3f) as u8;
        self.force_irq = (value >> 15) & 1 != 0;
        self.channel_irq_en = ((value >> 16) & 0x7f) as u8;
        self.irq_en = (value >> 23) & 1 != 0;

        let ack = ((value >> 24) & 0x7f) as u8;
        self.channel_irq_flags &= !ack;
    }

    /// Read a register by window offset (0x00..0x80).
    pub fn load(&self, offset: u32) -> u32 {
        match offset {
            0x70 => self.control(),
            0x74 => self.interrupt(),
            0x78..=0x7f => {
                log(LogCategory::Stubs, LogLevel::Warn, || {
                    format!("read from unknown DMA register 0x{:02x}", offset)
                });
                0
            }
            _ => {
                let channel = &self.channels[(offset >> 4) as usize];
                match offset & 0xf {
                    0x0 => channel.base,
                    0x4 => channel.block,
                    0x8 => channel.control,
                    _ => {
                        log(LogCategory::Stubs, LogLevel::Warn, || {
                            format!("read from unknown DMA register 0x{:02x}", offset)
                        });
                        0
                    }
                }
            }
        }
    }

    /// Write a register by window offset (0x00..0x80).
    pub fn store(&mut self, offset: u32, value: u32) {
        match offset {
            0x70 => self.set_control(value),
            0x74 => self.set_interrupt(value),
            0x78..=0x7f => log(LogCategory::Stubs, LogLevel::Warn, || {
                format!("write 0x{:08x} to unknown DMA register 0x{:02x}", value, offset)
            }),
            _ => {
                let index = (offset >> 4) as usize;
                match offset & 0xf {
                    0x0 => self.channels[index].base = value & 0xff_ffff,
                    0x4 => self.channels[index].block = value,
                    0x8 => {
                        self.channels[index].control = value;
                        // Bit 24 would start a transfer; none are performed
                        if value & (1 << 24) != 0 {
                            log(LogCategory::Stubs, LogLevel::Warn, || {
                                format!(
                                    "DMA channel {} started with control 0x{:08x}, no transfer performed",
                                    index, value
                                )
                            });
                        }
                    }
                    _ => log(LogCategory::Stubs, LogLevel::Warn, || {
                        format!("write 0x{:08x} to unknown DMA register 0x{:02x}", value, offset)
                    }),
                }
            }
        }
    }
}

impl Default for Dma {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_reset_value() {
        let dma = Dma::new();
        assert_eq!(dma.load(0x70), CONTROL_RESET);
    }

    #[test]
    fn test_control_write_read() {
        let mut dma = Dma::new();
        dma.store(0x70, 0x1234_5678);
        assert_eq!(dma.load(0x70), 0x1234_5678);
    }

    #[test]
    fn test_interrupt_register_roundtrip() {
        let mut dma = Dma::new();
        // Enable all channel IRQs plus the master bit
        dma.store(0x74, (1 << 23) | (0x7f << 16));
        let r = dma.load(0x74);
        assert_eq!((r >> 16) & 0x7f, 0x7f);
        assert_ne!(r & (1 << 23), 0);
        // No flags pending, so bit 31 stays clear
        assert_eq!(r >> 31, 0);
    }

    #[test]
    fn test_force_irq_sets_master_flag() {
        let mut dma = Dma::new();
        dma.store(0x74, 1 << 15);
        assert_ne!(dma.load(0x74) >> 31, 0);
    }

    #[test]
    fn test_channel_registers() {
        let mut dma = Dma::new();
        // Channel 2 (GPU): base, block, control
        dma.store(0x20, 0x0012_3456);
        dma.store(0x24, 0x0010_0010);
        assert_eq!(dma.load(0x20), 0x0012_3456);
        assert_eq!(dma.load(0x24), 0x0010_0010);
    }

    #[test]
    fn test_channel_base_is_masked() {
        let mut dma = Dma::new();
        dma.store(0x00, 0xff12_3456);
        assert_eq!(dma.load(0x00), 0x0012_3456);
    }
}
