//! PSX memory bus (the Interconnect)
//!
//! Every CPU access goes through three stages: fold KSEG0/KSEG1 mirrors
//! onto the physical range, classify the physical address against the
//! fixed map, then dispatch to the owning device at the same width.
//! Nothing is guessed: an address outside every range is a fault, and
//! width-sensitive register windows fault instead of coercing. Devices
//! only ever see window-local offsets.

use crate::bios::Bios;
use crate::dma::Dma;
use crate::gpu::Gpu;
use crate::irq::InterruptController;
use crate::map;
use crate::memctl::MemControl;
use crate::ram::{Ram, Scratchpad, RAM_SIZE};
use crate::spu::{self, Spu};
use crate::timers::Timers;
use crate::PsxError;
use emu_core::cpu_mips_r3000::{AccessWidth, Bus, BusFault};
use emu_core::logging::{log, LogCategory, LogLevel};

pub struct PsxBus {
    bios: Option<Bios>,
    ram: Ram,
    scratchpad: Scratchpad,
    gpu: Gpu,
    spu: Spu,
    dma: Dma,
    timers: Timers,
    irq: InterruptController,
    memctl: MemControl,
    cache_control: u32,
}

impl PsxBus {
    pub fn new() -> Self {
        PsxBus {
            bios: None,
            ram: Ram::new(),
            scratchpad: Scratchpad::new(),
            gpu: Gpu::new(),
            spu: Spu::new(),
            dma: Dma::new(),
            timers: Timers::new(),
            irq: InterruptController::new(),
            memctl: MemControl::new(),
            cache_control: 0,
        }
    }

    pub fn set_bios(&mut self, bios: Bios) {
        self.bios = Some(bios);
    }

    pub fn clear_bios(&mut self) {
        self.bios = None;
    }

    pub fn take_bios(&mut self) -> Option<Bios> {
        self.bios.take()
    }

    pub fn has_bios(&self) -> bool {
        self.bios.is_some()
    }

    pub fn gpu(&self) -> &Gpu {
        &self.gpu
    }

    pub fn irq(&self) -> &InterruptController {
        &self.irq
    }

    pub fn irq_mut(&mut self) -> &mut InterruptController {
        &mut self.irq
    }

    pub fn timers_mut(&mut self) -> &mut Timers {
        &mut self.timers
    }

    /// Sideload a binary blob into main RAM at a physical destination.
    pub fn transfer_to_ram(&mut self, data: &[u8], destination: u32) -> Result<(), PsxError> {
        let dest = map::mask_region(destination);
        let end = dest as u64 + data.len() as u64;
        if map::RAM.contains(dest).is_none() || end > RAM_SIZE as u64 {
            return Err(PsxError::TransferOutOfBounds {
                destination,
                size: data.len(),
            });
        }
        self.ram.write_block(dest, data);
        Ok(())
    }

    fn unaligned(addr: u32, width: AccessWidth) -> BusFault {
        BusFault::Unaligned { addr, width }
    }

    fn unmapped(addr: u32, width: AccessWidth) -> BusFault {
        BusFault::Unmapped { addr, width }
    }

    /// Register windows that only tolerate word access.
    fn word_only_window(physical: u32) -> bool {
        map::DMA.contains(physical).is_some()
            || map::GPU.contains(physical).is_some()
            || map::MEM_CONTROL.contains(physical).is_some()
            || map::RAM_SIZE.contains(physical).is_some()
            || map::CACHE_CONTROL.contains(physical).is_some()
    }

    /// Register windows accessed as half-words or words, never bytes.
    fn half_word_window(physical: u32) -> bool {
        map::SPU.contains(physical).is_some()
            || map::IRQ_CONTROL.contains(physical).is_some()
            || map::TIMERS.contains(physical).is_some()
    }
}

impl Default for PsxBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for PsxBus {
    fn load8(&mut self, addr: u32) -> Result<u8, BusFault> {
        const WIDTH: AccessWidth = AccessWidth::Byte;
        let physical = map::mask_region(addr);

        if let Some(offset) = map::RAM.contains(physical) {
            return Ok(self.ram.load8(offset));
        }
        if let Some(offset) = map::SCRATCHPAD.contains(physical) {
            if map::in_kseg1(addr) {
                return Err(Self::unmapped(addr, WIDTH));
            }
            return Ok(self.scratchpad.load8(offset));
        }
        if let Some(offset) = map::BIOS.contains(physical) {
            return match &self.bios {
                Some(bios) => Ok(bios.load8(offset)),
                None => Err(Self::unmapped(addr, WIDTH)),
            };
        }
        if map::EXPANSION_1.contains(physical).is_some() {
            // No expansion device fitted; the open bus reads all-ones
            return Ok(0xff);
        }
        if map::EXPANSION_2.contains(physical).is_some() {
            log(LogCategory::Stubs, LogLevel::Warn, || {
                format!("byte read from expansion 2 at 0x{:08x}", addr)
            });
            return Ok(0);
        }
        if Self::word_only_window(physical) || Self::half_word_window(physical) {
            return Err(BusFault::WidthMismatch { addr, width: WIDTH });
        }

        Err(Self::unmapped(addr, WIDTH))
    }

    fn load16(&mut self, addr: u32) -> Result<u16, BusFault> {
        const WIDTH: AccessWidth = AccessWidth::HalfWord;
        if addr % 2 != 0 {
            return Err(Self::unaligned(addr, WIDTH));
        }
        let physical = map::mask_region(addr);

        if let Some(offset) = map::RAM.contains(physical) {
            return Ok(self.ram.load16(offset));
        }
        if let Some(offset) = map::SCRATCHPAD.contains(physical) {
            if map::in_kseg1(addr) {
                return Err(Self::unmapped(addr, WIDTH));
            }
            return Ok(self.scratchpad.load16(offset));
        }
        if let Some(offset) = map::BIOS.contains(physical) {
            return match &self.bios {
                Some(bios) => Ok(bios.load16(offset)),
                None => Err(Self::unmapped(addr, WIDTH)),
            };
        }
        if let Some(offset) = map::SPU.contains(physical) {
            return Ok(self.spu.load16(offset));
        }
        if let Some(offset) = map::IRQ_CONTROL.contains(physical) {
            return Ok(match offset {
                0 => self.irq.status(),
                4 => self.irq.mask(),
                _ => 0,
            });
        }
        if let Some(offset) = map::TIMERS.contains(physical) {
            return Ok(self.timers.load(offset));
        }
        if map::EXPANSION_1.contains(physical).is_some() {
            return Ok(0xffff);
        }
        if map::EXPANSION_2.contains(physical).is_some() {
            log(LogCategory::Stubs, LogLevel::Warn, || {
                format!("half-word read from expansion 2 at 0x{:08x}", addr)
            });
            return Ok(0);
        }
        if Self::word_only_window(physical) {
            return Err(BusFault::WidthMismatch { addr, width: WIDTH });
        }

        Err(Self::unmapped(addr, WIDTH))
    }

    fn load32(&mut self, addr: u32) -> Result<u32, BusFault> {
        const WIDTH: AccessWidth = AccessWidth::Word;
        if addr % 4 != 0 {
            return Err(Self::unaligned(addr, WIDTH));
        }
        let physical = map::mask_region(addr);

        if let Some(offset) = map::RAM.contains(physical) {
            return Ok(self.ram.load32(offset));
        }
        if let Some(offset) = map::SCRATCHPAD.contains(physical) {
            if map::in_kseg1(addr) {
                return Err(Self::unmapped(addr, WIDTH));
            }
            return Ok(self.scratchpad.load32(offset));
        }
        if let Some(offset) = map::BIOS.contains(physical) {
            return match &self.bios {
                Some(bios) => Ok(bios.load32(offset)),
                None => Err(Self::unmapped(addr, WIDTH)),
            };
        }
        if let Some(offset) = map::IRQ_CONTROL.contains(physical) {
            return Ok(match offset {
                0 => self.irq.status() as u32,
                4 => self.irq.mask() as u32,
                _ => 0,
            });
        }
        if let Some(offset) = map::DMA.contains(physical) {
            return Ok(self.dma.load(offset));
        }
        if let Some(offset) = map::TIMERS.contains(physical) {
            return Ok(self.timers.load(offset) as u32);
        }
        if let Some(offset) = map::GPU.contains(physical) {
            return Ok(match offset {
                0 => self.gpu.read(),
                _ => self.gpu.status(),
            });
        }
        if let Some(offset) = map::SPU.contains(physical) {
            if spu::half_word_only(offset) {
                return Err(BusFault::WidthMismatch { addr, width: WIDTH });
            }
            let lo = self.spu.load16(offset) as u32;
            let hi = self.spu.load16(offset + 2) as u32;
            return Ok(lo | (hi << 16));
        }
        if let Some(offset) = map::MEM_CONTROL.contains(physical) {
            return Ok(self.memctl.load(offset));
        }
        if map::RAM_SIZE.contains(physical).is_some() {
            return Ok(self.memctl.ram_size());
        }
        if map::CACHE_CONTROL.contains(physical).is_some() {
            return Ok(self.cache_control);
        }
        if map::EXPANSION_1.contains(physical).is_some() {
            return Ok(0xffff_ffff);
        }

        Err(Self::unmapped(addr, WIDTH))
    }

    fn store8(&mut self, addr: u32, val: u8) -> Result<(), BusFault> {
        const WIDTH: AccessWidth = AccessWidth::Byte;
        let physical = map::mask_region(addr);

        if let Some(offset) = map::RAM.contains(physical) {
            self.ram.store8(offset, val);
            return Ok(());
        }
        if let Some(offset) = map::SCRATCHPAD.contains(physical) {
            if map::in_kseg1(addr) {
                return Err(Self::unmapped(addr, WIDTH));
            }
            self.scratchpad.store8(offset, val);
            return Ok(());
        }
        if map::EXPANSION_2.contains(physical).is_some() {
            // POST register and friends; no expansion 2 device fitted
            log(LogCategory::Stubs, LogLevel::Trace, || {
                format!("byte write 0x{:02x} to expansion 2 at 0x{:08x}", val, addr)
            });
            return Ok(());
        }
        if map::EXPANSION_1.contains(physical).is_some() {
            log(LogCategory::Stubs, LogLevel::Warn, || {
                format!("byte write 0x{:02x} to expansion 1 at 0x{:08x}", val, addr)
            });
            return Ok(());
        }
        if Self::word_only_window(physical) || Self::half_word_window(physical) {
            return Err(BusFault::WidthMismatch { addr, width: WIDTH });
        }

        Err(Self::unmapped(addr, WIDTH))
    }

    fn store16(&mut self, addr: u32, val: u16) -> Result<(), BusFault> {
        const WIDTH: AccessWidth = AccessWidth::HalfWord;
        if addr % 2 != 0 {
            return Err(Self::unaligned(addr, WIDTH));
        }
        let physical = map::mask_region(addr);

        if let Some(offset) = map::RAM.contains(physical) {
            self.ram.store16(offset, val);
            return Ok(());
        }
        if let Some(offset) = map::SCRATCHPAD.contains(physical) {
            if map::in_kseg1(addr) {
                return Err(Self::unmapped(addr, WIDTH));
            }
            self.scratchpad.store16(offset, val);
            return Ok(());
        }
        if let Some(offset) = map::SPU.contains(physical) {
            self.spu.store16(offset, val);
            return Ok(());
        }
        if let Some(offset) = map::IRQ_CONTROL.contains(physical) {
            match offset {
                0 => self.irq.acknowledge(val),
                4 => self.irq.set_mask(val),
                _ => {}
            }
            return Ok(());
        }
        if let Some(offset) = map::TIMERS.contains(physical) {
            self.timers.store(offset, val);
            return Ok(());
        }
        if map::EXPANSION_2.contains(physical).is_some() {
            log(LogCategory::Stubs, LogLevel::Trace, || {
                format!(
                    "half-word write 0x{:04x} to expansion 2 at 0x{:08x}",
                    val, addr
                )
            });
            return Ok(());
        }
        if Self::word_only_window(physical) {
            return Err(BusFault::WidthMismatch { addr, width: WIDTH });
        }

        Err(Self::unmapped(addr, WIDTH))
    }

    fn store32(&mut self, addr: u32, val: u32) -> Result<(), BusFault> {
        const WIDTH: AccessWidth = AccessWidth::Word;
        if addr % 4 != 0 {
            return Err(Self::unaligned(addr, WIDTH));
        }
        let physical = map::mask_region(addr);

        if let Some(offset) = map::RAM.contains(physical) {
            self.ram.store32(offset, val);
            return Ok(());
        }
        if let Some(offset) = map::SCRATCHPAD.contains(physical) {
            if map::in_kseg1(addr) {
                return Err(Self::unmapped(addr, WIDTH));
            }
            self.scratchpad.store32(offset, val);
            return Ok(());
        }
        if let Some(offset) = map::IRQ_CONTROL.contains(physical) {
            match offset {
                0 => self.irq.acknowledge(val as u16),
                4 => self.irq.set_mask(val as u16),
                _ => {}
            }
            return Ok(());
        }
        if let Some(offset) = map::DMA.contains(physical) {
            self.dma.store(offset, val);
            return Ok(());
        }
        if let Some(offset) = map::TIMERS.contains(physical) {
            self.timers.store(offset, val as u16);
            return Ok(());
        }
        if let Some(offset) = map::GPU.contains(physical) {
            match offset {
                0 => self.gpu.gp0(val),
                _ => self.gpu.gp1(val),
            }
            return Ok(());
        }
        if let Some(offset) = map::SPU.contains(physical) {
            if spu::half_word_only(offset) {
                return Err(BusFault::WidthMismatch { addr, width: WIDTH });
            }
            self.spu.store16(offset, val as u16);
            self.spu.store16(offset + 2, (val >> 16) as u16);
            return Ok(());
        }
        if let Some(offset) = map::MEM_CONTROL.contains(physical) {
            self.memctl.store(offset, val);
            return Ok(());
        }
        if map::RAM_SIZE.contains(physical).is_some() {
            self.memctl.set_ram_size(val);
            return Ok(());
        }
        if map::CACHE_CONTROL.contains(physical).is_some() {
            log(LogCategory::Bus, LogLevel::Debug, || {
                format!("cache control set to 0x{:08x}", val)
            });
            self.cache_control = val;
            return Ok(());
        }
        if map::BIOS.contains(physical).is_some() {
            log(LogCategory::Stubs, LogLevel::Warn, || {
                format!("ignoring word write 0x{:08x} to BIOS ROM at 0x{:08x}", val, addr)
            });
            return Ok(());
        }

        Err(Self::unmapped(addr, WIDTH))
    }
}
