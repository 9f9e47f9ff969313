//! GPU register window (GP0/GP1)
//!
//! Rendering is out of scope; the GPU here is the bus-visible register
//! pair plus a blank framebuffer handed back once per frame. GP0 (draw
//! commands) and GP1 (display control) writes are accepted and logged,
//! GPUSTAT reads back a fixed "idle and ready" status so the BIOS boot
//! sequence never stalls waiting on it.

use emu_core::logging::{log, LogCategory, LogLevel};
use emu_core::types::Frame;

/// Display output dimensions for the returned framebuffer.
const DISPLAY_WIDTH: u32 = 640;
const DISPLAY_HEIGHT: u32 = 480;

/// GPUSTAT with bits 26 (ready for command), 27 (ready to send VRAM) and
/// 28 (ready for DMA block) permanently set.
const GPUSTAT_READY: u32 = 0x1c00_0000;

pub struct Gpu {
    frame: Frame,
}

impl Gpu {
    pub fn new() -> Self {
        Gpu {
            frame: Frame::new(DISPLAY_WIDTH, DISPLAY_HEIGHT),
        }
    }

    /// GPUREAD (offset 0); no VRAM transfers are modeled so there is never
    /// response data pending
    pub fn read(&self) -> u32 {
        0
    }

    /// GPUSTAT (offset 4)
    pub fn status(&self) -> u32 {
        GPUSTAT_READY
    }

    /// GP0 (offset 0): draw command FIFO
    pub fn gp0(&mut self, value: u32) {
        log(LogCategory::Gpu, LogLevel::Debug, || {
            format!("GP0 command 0x{:08x} (op 0x{:02x})", value, value >> 24)
        });
    }

    /// GP1 (offset 4): display control
    pub fn gp1(&mut self, value: u32) {
        log(LogCategory::Gpu, LogLevel::Debug, || {
            format!("GP1 command 0x{:08x} (op 0x{:02x})", value, value >> 24)
        });
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }
}

impl Default for Gpu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reports_ready() {
        let gpu = Gpu::new();
        assert_ne!(gpu.status() & (1 << 26), 0);
        assert_ne!(gpu.status() & (1 << 28), 0);
    }

    #[test]
    fn test_frame_dimensions() {
        let gpu = Gpu::new();
        assert_eq!(gpu.frame().width, 640);
        assert_eq!(gpu.frame().height, 480);
        assert_eq!(gpu.frame().pixels.len(), 640 * 480);
    }

    #[test]
    fn test_commands_are_accepted() {
        let mut gpu = Gpu::new();
        gpu.gp0(0xe100_0000);
        gpu.gp1(0x0000_0000);
        assert_eq!(gpu.read(), 0);
    }
}
