//! SPU register window
//!
//! Audio synthesis is out of scope. The SPU is modeled as its full
//! 640-byte register file (320 half-word registers): writes stick and read
//! back, which is enough for the BIOS init sequence that sweeps the voice
//! and volume registers. A handful of registers are named so log output is
//! readable; everything else is an anonymous slot.
//!
//! SPUCNT and SPUSTAT are half-word registers on real hardware and the bus
//! is expected to reject word access to them (see [`half_word_only`]).

use emu_core::logging::{log, LogCategory, LogLevel};

/// 640 bytes of register space at 0x1f801c00.
pub const SPU_WINDOW: usize = 640;

/// Named register offsets (relative to the window base)
pub const MAIN_VOLUME_LEFT: u32 = 0x180;
pub const MAIN_VOLUME_RIGHT: u32 = 0x182;
pub const VOICE_KEY_ON: u32 = 0x188;
pub const VOICE_KEY_OFF: u32 = 0x18c;
pub const PITCH_MOD_ENABLE: u32 = 0x190;
pub const NOISE_MODE_ENABLE: u32 = 0x194;
pub const REVERB_MODE: u32 = 0x198;
pub const CONTROL: u32 = 0x1aa; // SPUCNT
pub const STATUS: u32 = 0x1ae; // SPUSTAT
pub const CD_VOLUME_LEFT: u32 = 0x1b0;
pub const CD_VOLUME_RIGHT: u32 = 0x1b2;

/// True when the word containing `offset` holds a register that only
/// tolerates half-word access. The bus probes with the word-aligned
/// offset, so the whole word is protected.
pub fn half_word_only(offset: u32) -> bool {
    matches!(offset | 2, CONTROL | STATUS)
}

fn register_name(offset: u32) -> Option<&'static str> {
    match offset {
        MAIN_VOLUME_LEFT => Some("main volume left"),
        MAIN_VOLUME_RIGHT => Some("main volume right"),
        VOICE_KEY_ON => Some("voice key on"),
        VOICE_KEY_OFF => Some("voice key off"),
        PITCH_MOD_ENABLE => Some("pitch modulation enable"),
        NOISE_MODE_ENABLE => Some("noise mode enable"),
        REVERB_MODE => Some("reverb mode"),
        CONTROL => Some("SPUCNT"),
        STATUS => Some("SPUSTAT"),
        CD_VOLUME_LEFT => Some("CD volume left"),
        CD_VOLUME_RIGHT => Some("CD volume right"),
        _ => None,
    }
}

pub struct Spu {
    regs: [u16; SPU_WINDOW / 2],
}

impl Spu {
    pub fn new() -> Self {
        Spu {
            regs: [0; SPU_WINDOW / 2],
        }
    }

    /// Half-word read; `offset` must be even and inside the window.
    pub fn load16(&self, offset: u32) -> u16 {
        self.regs[(offset as usize) / 2]
    }

    /// Half-word write; `offset` must be even and inside the window.
    pub fn store16(&mut self, offset: u32, value: u16) {
        match register_name(offset) {
            Some(name) => log(LogCategory::Spu, LogLevel::Debug, || {
                format!("write 0x{:04x} to {}", value, name)
            }),
            None => log(LogCategory::Stubs, LogLevel::Trace, || {
                format!("write 0x{:04x} to SPU register 0x{:03x}", value, offset)
            }),
        }
        self.regs[(offset as usize) / 2] = value;
    }

    pub fn control(&self) -> u16 {
        self.load16(CONTROL)
    }

    pub fn status(&self) -> u16 {
        self.load16(STATUS)
    }
}

impl Default for Spu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registers_stick() {
        let mut spu = Spu::new();
        spu.store16(VOICE_KEY_OFF, 0xffff);
        spu.store16(VOICE_KEY_OFF + 2, 0x00ff);
        assert_eq!(spu.load16(VOICE_KEY_OFF), 0xffff);
        assert_eq!(spu.load16(VOICE_KEY_OFF + 2), 0x00ff);
    }

    #[test]
    fn test_control_register() {
        let mut spu = Spu::new();
        assert_eq!(spu.control(), 0);
        spu.store16(CONTROL, 0xc000);
        assert_eq!(spu.control(), 0xc000);
        assert_eq!(spu.status(), 0);
    }

    #[test]
    fn test_half_word_only_registers() {
        assert!(half_word_only(CONTROL));
        assert!(half_word_only(STATUS));
        // Word-aligned offsets of the containing words are protected too
        assert!(half_word_only(CONTROL & !3));
        assert!(half_word_only(STATUS & !3));
        assert!(!half_word_only(VOICE_KEY_OFF));
        assert!(!half_word_only(MAIN_VOLUME_LEFT));
    }
}
