//! PlayStation (PSX) emulation implementation.
//!
//! Couples the MIPS R3000A core from `emu_core` with the PSX address map
//! and peripherals:
//!
//! - **CPU**: MIPS R3000A (32-bit, 33.8688 MHz, branch and load delay slots)
//! - **Bus**: segment-masked router over RAM, scratchpad, BIOS ROM and the
//!   I/O windows (GPU, SPU, DMA, timers, IRQ, memory control, expansion)
//! - **Timing**: 60 Hz frame loop stepping the CPU in fixed slices,
//!   counting scanlines and raising VBLANK
//! - **TTY**: captures BIOS `std_out_putchar` calls so kernel output is
//!   visible without any video emulation

mod bios;
mod bus;
mod dma;
mod gpu;
mod irq;
mod map;
mod memctl;
mod ram;
mod spu;
mod timers;

pub use bios::{Bios, BIOS_SIZE};
pub use bus::PsxBus;
pub use irq::Interrupt;

use emu_core::cpu_mips_r3000::{CpuError, CpuR3000, RegisterIndex};
use emu_core::logging::{log, LogCategory, LogLevel};
use emu_core::{types::Frame, MountPointInfo, System};
use thiserror::Error;

/// System clocks per second (the CPU clock).
pub const SYSTEM_CLOCKS_PER_SECOND: u32 = 33_868_800;

/// Target frame rate.
pub const FRAME_RATE: u32 = 60;

/// System clocks emulated per frame.
pub const SYSTEM_CLOCKS_PER_FRAME: u32 = SYSTEM_CLOCKS_PER_SECOND / FRAME_RATE;

/// Video clocks per scanline; the video clock runs at 11/7 the CPU clock.
const VIDEO_CLOCKS_PER_SCANLINE: u32 = 3413;

/// Scanlines per frame (NTSC).
const SCANLINES_PER_FRAME: u32 = 263;

/// Clocks advanced per frame-loop slice.
const SYSTEM_CLOCK_STEP: u32 = 21;

/// CPU instructions retired per slice.
const CPU_STEPS_PER_SLICE: u32 = 7;

/// Video clocks elapsed per slice (21 * 11 / 7).
const VIDEO_CLOCK_STEP: u32 = SYSTEM_CLOCK_STEP * 11 / 7;

/// BIOS call gateways: jumps to these addresses invoke the function whose
/// number is in R9.
const BIOS_A_FUNCTIONS: u32 = 0xa0;
const BIOS_B_FUNCTIONS: u32 = 0xb0;

/// `std_out_putchar` function numbers in the A and B tables.
const A_STD_OUT_PUTCHAR: u32 = 0x3c;
const B_STD_OUT_PUTCHAR: u32 = 0x3d;

#[derive(Error, Debug)]
pub enum PsxError {
    #[error("No BIOS mounted")]
    NoBios,
    #[error("Invalid BIOS image: {size} bytes, expected {expected}")]
    InvalidBios { size: usize, expected: usize },
    #[error("Invalid mount point: {0}")]
    InvalidMountPoint(String),
    #[error("Transfer of {size} bytes to 0x{destination:08x} falls outside RAM")]
    TransferOutOfBounds { destination: u32, size: usize },
    #[error(transparent)]
    Cpu(#[from] CpuError),
}

/// Accumulates characters printed through the BIOS TTY. Owned by the
/// system rather than shared globally; the frontend drains it between
/// frames.
pub struct TtySink {
    buffer: String,
    line: String,
}

impl TtySink {
    fn new() -> Self {
        TtySink {
            buffer: String::new(),
            line: String::new(),
        }
    }

    fn push(&mut self, c: char) {
        self.buffer.push(c);
        if c == '\n' {
            let line = std::mem::take(&mut self.line);
            log(LogCategory::Cpu, LogLevel::Info, || format!("TTY: {}", line));
        } else {
            self.line.push(c);
        }
    }

    /// Everything captured since the last [`take`](Self::take).
    pub fn output(&self) -> &str {
        &self.buffer
    }

    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }
}

/// PSX system implementation
pub struct PsxSystem {
    cpu: CpuR3000<PsxBus>,
    tty: TtySink,
    frames: u64,
}

impl PsxSystem {
    pub fn new() -> Self {
        PsxSystem {
            cpu: CpuR3000::new(PsxBus::new()),
            tty: TtySink::new(),
            frames: 0,
        }
    }

    /// Captured BIOS TTY output.
    pub fn tty(&self) -> &TtySink {
        &self.tty
    }

    /// Drain the captured TTY output.
    pub fn take_tty_output(&mut self) -> String {
        self.tty.take()
    }

    /// Number of frames emulated since power-on.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Sideload a binary blob into main RAM. `origin` and `size` select a
    /// window of `data`, which lands at the physical `destination`.
    pub fn transfer_to_ram(
        &mut self,
        data: &[u8],
        origin: u32,
        size: u32,
        destination: u32,
    ) -> Result<(), PsxError> {
        let start = origin as usize;
        let end = start + size as usize;
        if end > data.len() {
            return Err(PsxError::TransferOutOfBounds {
                destination,
                size: size as usize,
            });
        }
        self.cpu.bus.transfer_to_ram(&data[start..end], destination)
    }

    /// Redirect execution, typically to a sideloaded executable's entry
    /// point.
    pub fn set_pc(&mut self, pc: u32) {
        self.cpu.set_pc(pc);
    }

    /// Watch for BIOS function-table calls before an instruction executes.
    /// `std_out_putchar` carries its character in R4 (the first argument
    /// register) and the function number in R9.
    fn check_bios_call(&mut self) {
        let pc = self.cpu.current_pc() & 0x1fff_ffff;
        if pc != BIOS_A_FUNCTIONS && pc != BIOS_B_FUNCTIONS {
            return;
        }

        let function = self.cpu.reg(RegisterIndex::new(9));
        let is_putchar = (pc == BIOS_A_FUNCTIONS && function == A_STD_OUT_PUTCHAR)
            || (pc == BIOS_B_FUNCTIONS && function == B_STD_OUT_PUTCHAR);
        if is_putchar {
            let c = self.cpu.reg(RegisterIndex::new(4)) as u8 as char;
            self.tty.push(c);
        }
    }
}

impl Default for PsxSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for PsxSystem {
    type Error = PsxError;

    fn reset(&mut self) {
        // Devices go back to power-on state; only the BIOS survives
        let bios = self.cpu.bus.take_bios();
        self.cpu.bus = PsxBus::new();
        if let Some(bios) = bios {
            self.cpu.bus.set_bios(bios);
        }
        self.cpu.reset();
        self.tty = TtySink::new();
        self.frames = 0;
    }

    fn step_frame(&mut self) -> Result<Frame, Self::Error> {
        if !self.cpu.bus.has_bios() {
            return Err(PsxError::NoBios);
        }

        let mut clocks = 0;
        let mut video_clocks = 0;
        let mut scanlines = 0;

        while clocks < SYSTEM_CLOCKS_PER_FRAME {
            for _ in 0..CPU_STEPS_PER_SLICE {
                self.check_bios_call();
                self.cpu.step()?;
                clocks += 1;
            }
            self.cpu.bus.timers_mut().step(SYSTEM_CLOCK_STEP);

            video_clocks += VIDEO_CLOCK_STEP;
            if video_clocks >= VIDEO_CLOCKS_PER_SCANLINE {
                scanlines += 1;
                video_clocks = 0;
            }
            if scanlines >= SCANLINES_PER_FRAME {
                self.cpu.bus.irq_mut().trigger(Interrupt::VBlank);
                scanlines = 0;
            }
        }

        self.frames += 1;
        Ok(self.cpu.bus.gpu().frame().clone())
    }

    fn save_state(&self) -> serde_json::Value {
        let regs: Vec<u32> = (0..32).map(|i| self.cpu.reg(RegisterIndex::new(i))).collect();
        let (load_reg, load_value) = self.cpu.pending_load();
        serde_json::json!({
            "version": 1,
            "cpu": {
                "regs": regs,
                "pc": self.cpu.current_pc(),
                "sr": self.cpu.status(),
                "cycles": self.cpu.cycles(),
                "load": [load_reg.index() as u32, load_value],
            }
        })
    }

    fn load_state(&mut self, v: &serde_json::Value) -> Result<(), serde_json::Error> {
        if let Some(cpu_state) = v.get("cpu") {
            if let Some(regs) = cpu_state["regs"].as_array() {
                for (i, val) in regs.iter().enumerate().take(32) {
                    self.cpu.set_reg(
                        RegisterIndex::new(i as u32),
                        val.as_u64().unwrap_or(0) as u32,
                    );
                }
            }
            self.cpu
                .set_pc(cpu_state["pc"].as_u64().unwrap_or(0xbfc0_0000) as u32);
            self.cpu
                .set_status(cpu_state["sr"].as_u64().unwrap_or(0) as u32);
            if let Some(load) = cpu_state["load"].as_array() {
                let reg = load.first().and_then(|v| v.as_u64()).unwrap_or(0) as u32;
                let value = load.get(1).and_then(|v| v.as_u64()).unwrap_or(0) as u32;
                self.cpu
                    .set_pending_load(RegisterIndex::new(reg & 0x1f), value);
            }
        }
        Ok(())
    }

    fn supports_save_states(&self) -> bool {
        true
    }

    fn mount_points(&self) -> Vec<MountPointInfo> {
        vec![MountPointInfo {
            id: "BIOS".to_string(),
            name: "BIOS ROM".to_string(),
            extensions: vec!["bin".to_string(), "rom".to_string()],
            required: true,
        }]
    }

    fn mount(&mut self, mount_point_id: &str, data: &[u8]) -> Result<(), Self::Error> {
        if mount_point_id != "BIOS" {
            return Err(PsxError::InvalidMountPoint(mount_point_id.to_string()));
        }

        let bios = Bios::new(data)?;
        self.cpu.bus.set_bios(bios);
        self.reset();
        Ok(())
    }

    fn unmount(&mut self, mount_point_id: &str) -> Result<(), Self::Error> {
        if mount_point_id != "BIOS" {
            return Err(PsxError::InvalidMountPoint(mount_point_id.to_string()));
        }

        self.cpu.bus.clear_bios();
        Ok(())
    }

    fn is_mounted(&self, mount_point_id: &str) -> bool {
        mount_point_id == "BIOS" && self.cpu.bus.has_bios()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::cpu_mips_r3000::Bus;

    // Hand-assembled MIPS encodings for the test programs
    fn itype(op: u32, rs: u32, rt: u32, imm: u32) -> u32 {
        (op << 26) | (rs << 21) | (rt << 16) | (imm & 0xffff)
    }

    fn nop() -> u32 {
        0
    }

    fn lui(rt: u32, imm: u32) -> u32 {
        itype(0x0f, 0, rt, imm)
    }

    fn ori(rt: u32, rs: u32, imm: u32) -> u32 {
        itype(0x0d, rs, rt, imm)
    }

    fn addiu(rt: u32, rs: u32, imm: i32) -> u32 {
        itype(0x09, rs, rt, imm as u32)
    }

    fn sw(rt: u32, rs: u32, imm: u32) -> u32 {
        itype(0x2b, rs, rt, imm)
    }

    fn lw(rt: u32, rs: u32, imm: u32) -> u32 {
        itype(0x23, rs, rt, imm)
    }

    fn bne(rs: u32, rt: u32, offset: i32) -> u32 {
        itype(0x05, rs, rt, offset as u32)
    }

    fn j(target: u32) -> u32 {
        (0x02 << 26) | ((target >> 2) & 0x03ff_ffff)
    }

    fn mtc0(rt: u32, rd: u32) -> u32 {
        (0x10 << 26) | (0x04 << 21) | (rt << 16) | (rd << 11)
    }

    fn r(index: u32) -> RegisterIndex {
        RegisterIndex::new(index)
    }

    /// A 512KB BIOS image with `program` at the reset vector, padded with
    /// an infinite loop so a full frame can run without leaving the ROM.
    fn bios_image(program: &[u32]) -> Vec<u8> {
        let mut words: Vec<u32> = program.to_vec();
        let loop_addr = 0xbfc0_0000 + (words.len() as u32) * 4;
        words.push(j(loop_addr));
        words.push(nop());

        let mut image = vec![0u8; BIOS_SIZE];
        for (i, word) in words.iter().enumerate() {
            image[i * 4..i * 4 + 4].copy_from_slice(&word.to_le_bytes());
        }
        image
    }

    fn system_with_program(program: &[u32]) -> PsxSystem {
        let mut sys = PsxSystem::new();
        sys.mount("BIOS", &bios_image(program)).unwrap();
        sys
    }

    /// Step the CPU past the pipeline-fill NOP plus `n` program
    /// instructions.
    fn run(sys: &mut PsxSystem, n: u32) {
        for _ in 0..n + 1 {
            sys.cpu.step().unwrap();
        }
    }

    #[test]
    fn test_system_creation() {
        let sys = PsxSystem::new();
        assert!(!sys.is_mounted("BIOS"));
        assert!(sys.supports_save_states());
    }

    #[test]
    fn test_mount_points() {
        let sys = PsxSystem::new();
        let mounts = sys.mount_points();
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].id, "BIOS");
        assert!(mounts[0].required);
    }

    #[test]
    fn test_mount_rejects_bad_image_and_bad_id() {
        let mut sys = PsxSystem::new();
        assert!(matches!(
            sys.mount("BIOS", &[0u8; 100]),
            Err(PsxError::InvalidBios { size: 100, .. })
        ));
        assert!(matches!(
            sys.mount("CDROM", &[0u8; BIOS_SIZE]),
            Err(PsxError::InvalidMountPoint(_))
        ));
    }

    #[test]
    fn test_step_frame_without_bios_fails() {
        let mut sys = PsxSystem::new();
        assert!(matches!(sys.step_frame(), Err(PsxError::NoBios)));
    }

    #[test]
    fn test_unmount() {
        let mut sys = system_with_program(&[]);
        assert!(sys.is_mounted("BIOS"));
        sys.unmount("BIOS").unwrap();
        assert!(!sys.is_mounted("BIOS"));
    }

    #[test]
    fn test_lui_ori_builds_io_base() {
        // The classic first stanza of the BIOS: build 0x1f801000 in a
        // register and poke the memory control window
        let mut sys = system_with_program(&[
            lui(8, 0x1f80),
            ori(8, 8, 0x1000),
            lui(9, 0x1f00),
            sw(9, 8, 0),
        ]);
        run(&mut sys, 4);
        assert_eq!(sys.cpu.reg(r(8)), 0x1f80_1000);
        assert_eq!(sys.cpu.bus.load32(0x1f80_1000).unwrap(), 0x1f00_0000);
    }

    #[test]
    fn test_addiu_chain() {
        let mut sys = system_with_program(&[addiu(8, 0, 5), addiu(9, 8, 10)]);
        run(&mut sys, 2);
        assert_eq!(sys.cpu.reg(r(8)), 5);
        assert_eq!(sys.cpu.reg(r(9)), 15);
    }

    #[test]
    fn test_store_load_roundtrip_through_mirrors() {
        // Store via KSEG0, read back via KUSEG address arithmetic
        let mut sys = system_with_program(&[
            lui(8, 0x8000),
            ori(8, 8, 0x2000),
            lui(9, 0xbeef),
            ori(9, 9, 0xcafe),
            sw(9, 8, 0),
            lui(10, 0x0000),
            lw(11, 10, 0x2000),
            nop(),
        ]);
        run(&mut sys, 8);
        assert_eq!(sys.cpu.reg(r(11)), 0xbeef_cafe);
    }

    #[test]
    fn test_load_delay_over_real_bus() {
        let mut sys = system_with_program(&[
            addiu(9, 0, 77),  // r9 = 77
            sw(9, 0, 0x100),  // [0x100] = 77
            addiu(10, 0, 1),  // r10 = 1
            lw(10, 0, 0x100), // load lands next cycle
            addiu(11, 10, 0), // delay slot: sees the old r10
            addiu(12, 10, 0), // sees the loaded value
        ]);
        run(&mut sys, 6);
        assert_eq!(sys.cpu.reg(r(11)), 1);
        assert_eq!(sys.cpu.reg(r(12)), 77);
    }

    #[test]
    fn test_untaken_bne_still_runs_delay_slot() {
        let mut sys = system_with_program(&[
            bne(0, 0, 4),      // never taken
            addiu(8, 0, 11),   // delay slot executes anyway
            addiu(9, 0, 22),   // fallthrough
        ]);
        let branch_pc = 0xbfc0_0000;
        run(&mut sys, 2);
        assert_eq!(sys.cpu.reg(r(8)), 11);
        assert_eq!(sys.cpu.current_pc(), branch_pc + 8);
        run(&mut sys, 0);
        assert_eq!(sys.cpu.reg(r(9)), 22);
    }

    #[test]
    fn test_cache_isolation_suppresses_stores() {
        let mut sys = system_with_program(&[
            lui(8, 0x0001),   // SR bit 16
            mtc0(8, 12),      // isolate the cache
            addiu(9, 0, 42),
            sw(9, 0, 0x200),  // swallowed
            mtc0(0, 12),      // un-isolate
            sw(9, 0, 0x204),  // lands
        ]);
        run(&mut sys, 6);
        // The suppressed store left the power-on garbage in place
        assert_eq!(sys.cpu.bus.load32(0x200).unwrap(), 0xcaca_caca);
        assert_eq!(sys.cpu.bus.load32(0x204).unwrap(), 42);
    }

    #[test]
    fn test_unmapped_access_is_fatal() {
        let mut sys = system_with_program(&[
            lui(8, 0x1fa0), // expansion 3: not mapped
            lw(9, 8, 0),
            nop(),
        ]);
        sys.cpu.step().unwrap();
        sys.cpu.step().unwrap();
        let err = sys.cpu.step().unwrap_err();
        assert!(matches!(err, CpuError::Bus { .. }));
    }

    #[test]
    fn test_step_frame_runs_and_raises_vblank() {
        let mut sys = system_with_program(&[]);
        let frame = sys.step_frame().unwrap();
        assert_eq!(frame.width, 640);
        assert_eq!(frame.height, 480);
        assert_eq!(sys.frames(), 1);
        // VBLANK fired at least once and nobody acknowledged it
        assert_ne!(sys.cpu.bus.irq().status() & 1, 0);
        // Timers were stepped alongside the CPU
        assert_ne!(sys.cpu.bus.load16(0x1f80_1100).unwrap(), 0);
    }

    #[test]
    fn test_frame_error_reports_failing_instruction() {
        // An opcode the interpreter does not implement (SLTI)
        let mut sys = system_with_program(&[itype(0x0a, 0, 8, 1)]);
        let err = sys.step_frame().unwrap_err();
        match err {
            PsxError::Cpu(CpuError::UnhandledInstruction { word, pc }) => {
                assert_eq!(word, itype(0x0a, 0, 8, 1));
                assert_eq!(pc, 0xbfc0_0000);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_tty_capture() {
        let mut sys = system_with_program(&[]);
        for c in [b'H', b'i', b'\n'] {
            sys.cpu.set_reg(r(9), A_STD_OUT_PUTCHAR);
            sys.cpu.set_reg(r(4), c as u32);
            // Pretend the CPU is about to enter the A-table gateway
            sys.cpu.set_pc(BIOS_A_FUNCTIONS + 4);
            sys.check_bios_call();
        }
        assert_eq!(sys.tty().output(), "Hi\n");
        assert_eq!(sys.take_tty_output(), "Hi\n");
        assert_eq!(sys.tty().output(), "");
    }

    #[test]
    fn test_tty_ignores_other_functions() {
        let mut sys = system_with_program(&[]);
        sys.cpu.set_reg(r(9), 0x13); // SaveState, not putchar
        sys.cpu.set_reg(r(4), b'X' as u32);
        sys.cpu.set_pc(BIOS_A_FUNCTIONS + 4);
        sys.check_bios_call();
        assert_eq!(sys.tty().output(), "");
    }

    #[test]
    fn test_transfer_to_ram_and_jump() {
        let mut sys = system_with_program(&[]);
        let blob: Vec<u8> = addiu(8, 0, 123).to_le_bytes().to_vec();
        sys.transfer_to_ram(&blob, 0, blob.len() as u32, 0x8001_0000)
            .unwrap();
        sys.set_pc(0x8001_0000);
        run(&mut sys, 1);
        assert_eq!(sys.cpu.reg(r(8)), 123);
    }

    #[test]
    fn test_transfer_window_validation() {
        let mut sys = PsxSystem::new();
        assert!(sys.transfer_to_ram(&[0; 4], 2, 4, 0).is_err());
        assert!(sys.transfer_to_ram(&[0; 4], 0, 4, 0x1fc0_0000).is_err());
    }

    #[test]
    fn test_save_load_state_roundtrip() {
        let mut sys = system_with_program(&[addiu(8, 0, 99), lui(29, 0x801f)]);
        run(&mut sys, 2);
        let state = sys.save_state();

        let mut sys2 = system_with_program(&[]);
        sys2.load_state(&state).unwrap();
        assert_eq!(sys2.cpu.reg(r(8)), 99);
        assert_eq!(sys2.cpu.reg(r(29)), 0x801f_0000);
        // One step refills the pipeline, then execution is where it left off
        sys2.cpu.step().unwrap();
        assert_eq!(sys2.cpu.current_pc(), sys.cpu.current_pc());
    }

    #[test]
    fn test_reset_restores_power_on_state() {
        let mut sys = system_with_program(&[addiu(8, 0, 5), sw(8, 0, 0x300)]);
        run(&mut sys, 2);
        assert_eq!(sys.cpu.bus.load32(0x300).unwrap(), 5);

        sys.reset();
        assert!(sys.is_mounted("BIOS"));
        assert_eq!(sys.cpu.bus.load32(0x300).unwrap(), 0xcaca_caca);
        // Execution restarts at the reset vector
        sys.cpu.step().unwrap();
        assert_eq!(sys.cpu.current_pc(), 0xbfc0_0000);
    }
}
