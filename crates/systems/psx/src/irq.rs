//! Interrupt controller (I_STAT / I_MASK)
//!
//! Two registers at 0x1f801070: status at offset 0, mask at offset 4.
//! Devices raise bits through [`InterruptController::trigger`]; the CPU
//! side never takes the interrupt (no exception vector is modeled), but
//! software can still poll and acknowledge, which is what the BIOS does
//! during early boot.

use emu_core::logging::{log, LogCategory, LogLevel};

/// Interrupt line numbers (bit positions in I_STAT/I_MASK).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    VBlank = 0,
    Gpu = 1,
    Cdrom = 2,
    Dma = 3,
    Timer0 = 4,
    Timer1 = 5,
    Timer2 = 6,
}

pub struct InterruptController {
    status: u16,
    mask: u16,
}

impl InterruptController {
    pub fn new() -> Self {
        InterruptController { status: 0, mask: 0 }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn mask(&self) -> u16 {
        self.mask
    }

    /// Acknowledge: writing 0 to a status bit clears it, writing 1 keeps
    /// it pending.
    pub fn acknowledge(&mut self, value: u16) {
        self.status &= value;
    }

    pub fn set_mask(&mut self, value: u16) {
        self.mask = value;
    }

    /// Raise an interrupt line.
    pub fn trigger(&mut self, interrupt: Interrupt) {
        log(LogCategory::Irq, LogLevel::Debug, || {
            format!("triggering {:?}", interrupt)
        });
        self.status |= 1 << interrupt as u16;
    }

    /// True if any unmasked interrupt is pending.
    pub fn pending(&self) -> bool {
        self.status & self.mask != 0
    }
}

impl Default for InterruptController {
    fn default() -> Self {
        Self::new()
    }
}
