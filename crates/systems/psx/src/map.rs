//! PSX physical address map
//!
//! The CPU's 4GB address space is split into segments by the top 3 bits:
//! KUSEG (0x00000000), KSEG0 (0x80000000, cached mirror) and KSEG1
//! (0xa0000000, uncached mirror) all decode to the same physical range.
//! KSEG2 (0xfffe0000) is not mirrored and only hosts the cache control
//! register.
//!
//! ## Memory Map (physical)
//!
//! - 0x00000000: 2MB main RAM
//! - 0x1f000000: 512KB expansion region 1
//! - 0x1f800000: 1KB scratchpad (D-cache used as fast RAM)
//! - 0x1f801000: memory control window (36 bytes)
//! - 0x1f801060: RAM_SIZE register
//! - 0x1f801070: interrupt control (status + mask)
//! - 0x1f801080: DMA registers (7 channels + control/interrupt)
//! - 0x1f801100: timers (3 of them, 16 bytes each)
//! - 0x1f801810: GPU registers (GP0/GP1)
//! - 0x1f801c00: SPU registers (640 bytes)
//! - 0x1f802000: expansion region 2 (I/O, 66 bytes)
//! - 0x1fc00000: 512KB BIOS ROM
//! - 0xfffe0130: cache control (KSEG2, unmasked)

/// A half-open `[base, base + length)` address range.
///
/// Ranges re-base a matching address to a device-local offset, so devices
/// never see absolute bus addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub base: u32,
    pub length: u32,
}

impl Range {
    pub const fn new(base: u32, length: u32) -> Self {
        Range { base, length }
    }

    /// Returns the offset of `addr` into the range, or `None` if it falls
    /// outside.
    pub fn contains(self, addr: u32) -> Option<u32> {
        if addr >= self.base && addr < self.base.wrapping_add(self.length) {
            Some(addr - self.base)
        } else {
            None
        }
    }
}

/// Segment mask table indexed by the top 3 address bits.
///
/// KUSEG (0..4) passes through, KSEG0 (4) drops the top bit, KSEG1 (5)
/// drops the top 3 bits, KSEG2 (6, 7) passes through unmasked so the cache
/// control register keeps its architectural address.
const REGION_MASK: [u32; 8] = [
    // KUSEG: 2048MB
    0xffff_ffff,
    0xffff_ffff,
    0xffff_ffff,
    0xffff_ffff,
    // KSEG0: 512MB
    0x7fff_ffff,
    // KSEG1: 512MB
    0x1fff_ffff,
    // KSEG2: 1024MB
    0xffff_ffff,
    0xffff_ffff,
];

/// Fold a KSEG0/KSEG1 mirror address onto the KUSEG physical range.
pub fn mask_region(addr: u32) -> u32 {
    addr & REGION_MASK[(addr >> 29) as usize]
}

/// True if `addr` (unmasked) lies in KSEG1, the uncached mirror. The
/// scratchpad is not reachable through it.
pub fn in_kseg1(addr: u32) -> bool {
    addr >> 29 == 0b101
}

pub const RAM: Range = Range::new(0x0000_0000, 2 * 1024 * 1024);
pub const EXPANSION_1: Range = Range::new(0x1f00_0000, 512 * 1024);
pub const SCRATCHPAD: Range = Range::new(0x1f80_0000, 1024);
pub const MEM_CONTROL: Range = Range::new(0x1f80_1000, 36);
pub const RAM_SIZE: Range = Range::new(0x1f80_1060, 4);
pub const IRQ_CONTROL: Range = Range::new(0x1f80_1070, 8);
pub const DMA: Range = Range::new(0x1f80_1080, 0x80);
pub const TIMERS: Range = Range::new(0x1f80_1100, 48);
pub const GPU: Range = Range::new(0x1f80_1810, 8);
pub const SPU: Range = Range::new(0x1f80_1c00, 640);
pub const EXPANSION_2: Range = Range::new(0x1f80_2000, 66);
pub const BIOS: Range = Range::new(0x1fc0_0000, 512 * 1024);
pub const CACHE_CONTROL: Range = Range::new(0xfffe_0130, 4);
