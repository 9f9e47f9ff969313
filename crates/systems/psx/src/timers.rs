//! Root counters (timers)
//!
//! Three 16-bit counters at 0x1f801100, 16 bytes apart, each with a
//! counter, a mode register and a target. The frame loop steps them in
//! system-clock units; clock-source selection and IRQ generation are not
//! modeled, every counter just counts system clocks.

use emu_core::logging::{log, LogCategory, LogLevel};

/// Mode bit 3: reset the counter when it reaches the target instead of
/// wrapping at 0xffff.
const MODE_RESET_AT_TARGET: u16 = 1 << 3;

/// Mode bit 11: counter reached its target (read-clears on hardware; here
/// it is cleared on mode write, which is what the BIOS does anyway).
const MODE_REACHED_TARGET: u16 = 1 << 11;

#[derive(Debug, Clone, Copy, Default)]
struct Timer {
    counter: u16,
    mode: u16,
    target: u16,
}

impl Timer {
    fn step(&mut self, cycles: u32) {
        let next = self.counter as u32 + cycles;

        if self.mode & MODE_RESET_AT_TARGET != 0 && self.target > 0 {
            if next >= self.target as u32 {
                self.counter = (next % self.target as u32) as u16;
                self.mode |= MODE_REACHED_TARGET;
            } else {
                self.counter = next as u16;
            }
        } else {
            if next >= self.target as u32 && self.target > 0 {
                self.mode |= MODE_REACHED_TARGET;
            }
            self.counter = (next & 0xffff) as u16;
        }
    }
}

pub struct Timers {
    timers: [Timer; 3],
}

impl Timers {
    pub fn new() -> Self {
        Timers {
            timers: [Timer::default(); 3],
        }
    }

    /// Advance all three counters by `cycles` system clocks.
    pub fn step(&mut self, cycles: u32) {
        for timer in self.timers.iter_mut() {
            timer.step(cycles);
        }
    }

    /// Read a register by window offset (0x00..0x30).
    pub fn load(&self, offset: u32) -> u16 {
        let timer = &self.timers[(offset >> 4) as usize];
        match offset & 0xf {
            0x0 => timer.counter,
            0x4 => timer.mode,
            0x8 => timer.target,
            _ => {
                log(LogCategory::Stubs, LogLevel::Warn, || {
                    format!("read from unknown timer register 0x{:02x}", offset)
                });
                0
            }
        }
    }

    /// Write a register by window offset (0x00..0x30). Writing the mode
    /// register resets the counter.
    pub fn store(&mut self, offset: u32, value: u16) {
        let timer = &mut self.timers[(offset >> 4) as usize];
        match offset & 0xf {
            0x0 => timer.counter = value,
            0x4 => {
                timer.mode = value & !MODE_REACHED_TARGET;
                timer.counter = 0;
            }
            0x8 => timer.target = value,
            _ => log(LogCategory::Stubs, LogLevel::Warn, || {
                format!("write 0x{:04x} to unknown timer register 0x{:02x}", value, offset)
            }),
        }
    }
}

impl Default for Timers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_advance() {
        let mut timers = Timers::new();
        timers.step(100);
        assert_eq!(timers.load(0x00), 100);
        assert_eq!(timers.load(0x10), 100);
        assert_eq!(timers.load(0x20), 100);
    }

    #[test]
    fn test_counter_wraps_at_16_bits() {
        let mut timers = Timers::new();
        timers.store(0x00, 0xfffe);
        timers.step(3);
        assert_eq!(timers.load(0x00), 1);
    }

    #[test]
    fn test_reset_at_target() {
        let mut timers = Timers::new();
        timers.store(0x08, 100); // target
        timers.store(0x04, MODE_RESET_AT_TARGET); // mode (also zeroes counter)
        timers.step(250);
        assert_eq!(timers.load(0x00), 50);
        assert_ne!(timers.load(0x04) & MODE_REACHED_TARGET, 0);
    }

    #[test]
    fn test_mode_write_resets_counter() {
        let mut timers = Timers::new();
        timers.step(500);
        timers.store(0x14, 0);
        assert_eq!(timers.load(0x10), 0);
        // Other timers untouched
        assert_eq!(timers.load(0x00), 500);
    }

    #[test]
    fn test_timers_are_independent() {
        let mut timers = Timers::new();
        timers.store(0x20, 42);
        assert_eq!(timers.load(0x20), 42);
        assert_eq!(timers.load(0x00), 0);
        assert_eq!(timers.load(0x10), 0);
    }
}
