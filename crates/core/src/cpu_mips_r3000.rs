//! MIPS R3000A CPU core implementation
//!
//! This module provides a reusable MIPS I interpreter for PlayStation-class
//! systems. The R3000A is a 32-bit scalar RISC processor with:
//! - 32 general-purpose 32-bit registers (R0 hardwired to zero)
//! - A branch delay slot: the instruction after a branch always executes
//! - A load delay slot: a load's result is invisible for exactly one cycle
//! - A coprocessor 0 for system control (only the status register is modeled)
//!
//! Delay slots are reproduced structurally rather than with ordering tricks:
//! the register file is kept as two banks (committed and output) and the CPU
//! always holds the next instruction pre-fetched. See [`CpuR3000::step`].
//!
//! Systems plug in their memory map through the [`Bus`] trait. All bus
//! accesses are fallible; an unmapped or misrouted access surfaces as a
//! [`BusFault`] and stops the interpreter instead of silently returning zero.

use crate::logging::{log, LogCategory, LogLevel};
use thiserror::Error;

/// Reset vector: execution starts in the BIOS ROM window.
pub const RESET_VECTOR: u32 = 0xbfc0_0000;

/// Power-on poison value for R1..R31, useful for catching reads of
/// never-written registers in trace dumps.
pub const REGISTER_POISON: u32 = 0xdead_beef;

/// Status register bit 16: data cache isolated from the bus.
const SR_ISOLATE_CACHE: u32 = 0x10000;

/// Width of a bus access, used in fault diagnostics and width-sensitivity
/// checks by peripheral register windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessWidth {
    Byte,
    HalfWord,
    Word,
}

impl std::fmt::Display for AccessWidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessWidth::Byte => write!(f, "byte"),
            AccessWidth::HalfWord => write!(f, "halfword"),
            AccessWidth::Word => write!(f, "word"),
        }
    }
}

/// A failed bus access. These are fatal for the interpreter: the router never
/// guesses at unmapped or misrouted accesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusFault {
    #[error("unmapped address 0x{addr:08x} ({width} access)")]
    Unmapped { addr: u32, width: AccessWidth },
    #[error("unaligned {width} access at 0x{addr:08x}")]
    Unaligned { addr: u32, width: AccessWidth },
    #[error("unsupported {width} access to register at 0x{addr:08x}")]
    WidthMismatch { addr: u32, width: AccessWidth },
}

/// Memory interface for the R3000 CPU.
///
/// Systems using the core must implement this trait to provide their address
/// map. All accesses are little-endian. Implementations are expected to
/// enforce alignment and report unmapped addresses rather than defaulting.
pub trait Bus {
    /// Read a byte from the given address
    fn load8(&mut self, addr: u32) -> Result<u8, BusFault>;

    /// Read a halfword (16-bit) from the given address
    fn load16(&mut self, addr: u32) -> Result<u16, BusFault>;

    /// Read a word (32-bit) from the given address
    fn load32(&mut self, addr: u32) -> Result<u32, BusFault>;

    /// Write a byte to the given address
    fn store8(&mut self, addr: u32, val: u8) -> Result<(), BusFault>;

    /// Write a halfword (16-bit) to the given address
    fn store16(&mut self, addr: u32, val: u16) -> Result<(), BusFault>;

    /// Write a word (32-bit) to the given address
    fn store32(&mut self, addr: u32, val: u32) -> Result<(), BusFault>;
}

/// A validated general-purpose register index in 0..32.
///
/// Index 0 is architecturally hardwired to zero; writes through it are
/// silently discarded by the register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterIndex(u32);

impl RegisterIndex {
    pub const ZERO: RegisterIndex = RegisterIndex(0);
    /// R31, the link register written by JAL.
    pub const RA: RegisterIndex = RegisterIndex(31);

    pub fn new(index: u32) -> Self {
        debug_assert!(index < 32, "register index out of range: {}", index);
        RegisterIndex(index & 0x1f)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A raw 32-bit MIPS instruction word with pure bit-field accessors.
///
/// No validation happens at decode time; unknown encodings are rejected by
/// the dispatcher in [`CpuR3000::step`], not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction(pub u32);

impl Instruction {
    /// Primary opcode, bits 31..26
    pub fn opcode(self) -> u32 {
        self.0 >> 26
    }

    /// Function field for SPECIAL (opcode 0) instructions, bits 5..0
    pub fn funct(self) -> u32 {
        self.0 & 0x3f
    }

    /// Coprocessor sub-opcode, bits 25..21
    pub fn cop_op(self) -> u32 {
        (self.0 >> 21) & 0x1f
    }

    /// Source register, bits 25..21
    pub fn rs(self) -> RegisterIndex {
        RegisterIndex((self.0 >> 21) & 0x1f)
    }

    /// Target register, bits 20..16
    pub fn rt(self) -> RegisterIndex {
        RegisterIndex((self.0 >> 16) & 0x1f)
    }

    /// Destination register, bits 15..11
    pub fn rd(self) -> RegisterIndex {
        RegisterIndex((self.0 >> 11) & 0x1f)
    }

    /// Shift amount, bits 10..6
    pub fn shamt(self) -> u32 {
        (self.0 >> 6) & 0x1f
    }

    /// 16-bit immediate, zero-extended
    pub fn imm(self) -> u32 {
        self.0 & 0xffff
    }

    /// 16-bit immediate, sign-extended to 32 bits
    pub fn imm_se(self) -> u32 {
        (self.0 & 0xffff) as i16 as u32
    }

    /// 26-bit jump target, bits 25..0 (word-indexed, not yet shifted)
    pub fn target(self) -> u32 {
        self.0 & 0x03ff_ffff
    }

    /// The raw instruction word
    pub fn word(self) -> u32 {
        self.0
    }
}

/// Fatal interpreter conditions.
///
/// Every variant carries enough context to identify the failing instruction;
/// the driver loop decides whether to abort. The core never exits the
/// process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("{fault} at pc 0x{pc:08x}")]
    Bus { fault: BusFault, pc: u32 },
    #[error("unhandled instruction 0x{word:08x} at pc 0x{pc:08x}")]
    UnhandledInstruction { word: u32, pc: u32 },
    #[error("unhandled write of 0x{value:08x} to cop0 register {reg} at pc 0x{pc:08x}")]
    UnhandledCop0Write { reg: u32, value: u32, pc: u32 },
    #[error("signed overflow in instruction 0x{word:08x} at pc 0x{pc:08x}")]
    Overflow { word: u32, pc: u32 },
}

/// MIPS R3000A CPU state and execution engine.
///
/// The register file is two parallel banks: `regs` holds the values visible
/// to the currently executing instruction, `out_regs` collects its writes.
/// The banks swap roles at the end of every cycle, which is what makes
/// same-cycle read/write hazards and the load delay slot come out right.
pub struct CpuR3000<B: Bus> {
    /// Address of the *next* fetch; always 4 past the pre-fetched instruction
    pc: u32,

    /// Instruction fetched on the previous cycle, about to execute.
    /// Holding it here realizes the branch delay slot.
    next_instruction: Instruction,

    /// Committed register bank, read by the executing instruction
    regs: [u32; 32],

    /// Output register bank, written by the executing instruction
    out_regs: [u32; 32],

    /// Pending load delay slot: applied and cleared at the start of the next
    /// cycle. A new load overwrites it (last write wins).
    load: (RegisterIndex, u32),

    /// Coprocessor 0 status register (r12); only bit 16 is interpreted
    sr: u32,

    /// Total instructions retired
    cycles: u64,

    /// Bus interface
    pub bus: B,
}

impl<B: Bus> CpuR3000<B> {
    /// Create a new CPU with the given bus, in power-on state.
    pub fn new(bus: B) -> Self {
        let mut regs = [REGISTER_POISON; 32];
        regs[0] = 0;

        Self {
            pc: RESET_VECTOR,
            // Pretend the first fetch already happened and produced a NOP;
            // the pipeline fills itself on the first step.
            next_instruction: Instruction(0),
            regs,
            out_regs: regs,
            load: (RegisterIndex::ZERO, 0),
            sr: 0,
            cycles: 0,
            bus,
        }
    }

    /// Reset to power-on state, keeping the bus.
    pub fn reset(&mut self) {
        let mut regs = [REGISTER_POISON; 32];
        regs[0] = 0;

        self.pc = RESET_VECTOR;
        self.next_instruction = Instruction(0);
        self.regs = regs;
        self.out_regs = regs;
        self.load = (RegisterIndex::ZERO, 0);
        self.sr = 0;
        self.cycles = 0;
    }

    /// Address of the instruction that will execute on the next [`step`].
    ///
    /// [`step`]: CpuR3000::step
    pub fn current_pc(&self) -> u32 {
        self.pc.wrapping_sub(4)
    }

    /// Redirect execution to `pc`, restarting the pipeline with a NOP in the
    /// delay position (same as power-on). Intended for drivers and tests.
    pub fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
        self.next_instruction = Instruction(0);
    }

    /// Read a register from the committed bank.
    pub fn reg(&self, index: RegisterIndex) -> u32 {
        self.regs[index.index()]
    }

    /// Set a register in both banks, bypassing the pipeline. Intended for
    /// drivers and tests; instructions go through `set_out_reg`.
    pub fn set_reg(&mut self, index: RegisterIndex, value: u32) {
        self.regs[index.index()] = value;
        self.out_regs[index.index()] = value;
        self.regs[0] = 0;
        self.out_regs[0] = 0;
    }

    /// Coprocessor 0 status register
    pub fn status(&self) -> u32 {
        self.sr
    }

    /// Overwrite the coprocessor 0 status register. Intended for drivers
    /// restoring a save state.
    pub fn set_status(&mut self, sr: u32) {
        self.sr = sr;
    }

    /// The pending delayed load, if any ((R0, 0) when the slot is empty).
    pub fn pending_load(&self) -> (RegisterIndex, u32) {
        self.load
    }

    /// Replace the pending delayed load. Intended for drivers restoring a
    /// save state.
    pub fn set_pending_load(&mut self, reg: RegisterIndex, value: u32) {
        self.load = (reg, value);
    }

    /// Total instructions retired since power-on
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    fn set_out_reg(&mut self, index: RegisterIndex, value: u32) {
        self.out_regs[index.index()] = value;

        // R0 is always zero, no matter what was just written
        self.out_regs[0] = 0;
    }

    fn cache_isolated(&self) -> bool {
        self.sr & SR_ISOLATE_CACHE != 0
    }

    /// Execute a single instruction; returns cycles consumed (always 1).
    ///
    /// One architectural cycle: fetch the next instruction, resolve the
    /// pending delayed load, execute the previously fetched instruction,
    /// commit the output register bank.
    pub fn step(&mut self) -> Result<u32, CpuError> {
        let instruction = self.next_instruction;
        // `instruction` was fetched one cycle ago, 4 bytes behind `pc`
        let pc = self.pc.wrapping_sub(4);

        let fetch_pc = self.pc;
        let word = self
            .bus
            .load32(fetch_pc)
            .map_err(|fault| CpuError::Bus { fault, pc: fetch_pc })?;
        self.next_instruction = Instruction(word);
        // Tentative; branches and jumps overwrite this during execute
        self.pc = self.pc.wrapping_add(4);

        // Resolve the pending delayed load before executing, so a dependent
        // instruction in the delay slot still sees the old value
        let (reg, value) = self.load;
        self.set_out_reg(reg, value);
        self.load = (RegisterIndex::ZERO, 0);

        self.execute(instruction, pc)?;

        // Commit: writes made this cycle become visible next cycle
        self.regs = self.out_regs;
        self.cycles += 1;

        Ok(1)
    }

    fn execute(&mut self, instruction: Instruction, pc: u32) -> Result<(), CpuError> {
        match instruction.opcode() {
            0x00 => match instruction.funct() {
                0x00 => self.execute_sll(instruction),
                0x08 => self.execute_jr(instruction),
                0x21 => self.execute_addu(instruction),
                0x25 => self.execute_or(instruction),
                0x2b => self.execute_sltu(instruction),
                _ => {
                    return Err(CpuError::UnhandledInstruction {
                        word: instruction.word(),
                        pc,
                    })
                }
            },
            0x02 => self.execute_j(instruction),
            0x03 => self.execute_jal(instruction),
            0x04 => self.execute_beq(instruction),
            0x05 => self.execute_bne(instruction),
            0x08 => self.execute_addi(instruction, pc)?,
            0x09 => self.execute_addiu(instruction),
            0x0c => self.execute_andi(instruction),
            0x0d => self.execute_ori(instruction),
            0x0f => self.execute_lui(instruction),
            0x10 => self.execute_cop0(instruction, pc)?,
            0x20 => self.execute_lb(instruction, pc)?,
            0x23 => self.execute_lw(instruction, pc)?,
            0x28 => self.execute_sb(instruction, pc)?,
            0x29 => self.execute_sh(instruction, pc)?,
            0x2b => self.execute_sw(instruction, pc)?,
            _ => {
                return Err(CpuError::UnhandledInstruction {
                    word: instruction.word(),
                    pc,
                })
            }
        }
        Ok(())
    }

    /// Relative branch. `pc` already points past the delay slot, so the
    /// offset lands relative to the instruction after the branch.
    fn branch(&mut self, offset: u32) {
        let offset = offset << 2;
        self.pc = self.pc.wrapping_add(offset).wrapping_sub(4);
    }

    /// SLL - Shift Left Logical (also the canonical NOP encoding)
    fn execute_sll(&mut self, instruction: Instruction) {
        let value = self.reg(instruction.rt()) << instruction.shamt();
        self.set_out_reg(instruction.rd(), value);
    }

    /// JR - Jump Register
    fn execute_jr(&mut self, instruction: Instruction) {
        self.pc = self.reg(instruction.rs());
    }

    /// ADDU - Add Unsigned (no overflow check, wraps)
    fn execute_addu(&mut self, instruction: Instruction) {
        let value = self
            .reg(instruction.rs())
            .wrapping_add(self.reg(instruction.rt()));
        self.set_out_reg(instruction.rd(), value);
    }

    /// OR - Bitwise Or
    fn execute_or(&mut self, instruction: Instruction) {
        let value = self.reg(instruction.rs()) | self.reg(instruction.rt());
        self.set_out_reg(instruction.rd(), value);
    }

    /// SLTU - Set on Less Than Unsigned
    fn execute_sltu(&mut self, instruction: Instruction) {
        let value = self.reg(instruction.rs()) < self.reg(instruction.rt());
        self.set_out_reg(instruction.rd(), value as u32);
    }

    /// J - Jump within the current 256MB segment
    fn execute_j(&mut self, instruction: Instruction) {
        self.pc = (self.pc & 0xf000_0000) | (instruction.target() << 2);
    }

    /// JAL - Jump And Link; the return address skips the delay slot
    fn execute_jal(&mut self, instruction: Instruction) {
        let return_address = self.pc;
        self.set_out_reg(RegisterIndex::RA, return_address);
        self.execute_j(instruction);
    }

    /// BEQ - Branch if Equal
    fn execute_beq(&mut self, instruction: Instruction) {
        if self.reg(instruction.rs()) == self.reg(instruction.rt()) {
            self.branch(instruction.imm_se());
        }
    }

    /// BNE - Branch if Not Equal
    fn execute_bne(&mut self, instruction: Instruction) {
        if self.reg(instruction.rs()) != self.reg(instruction.rt()) {
            self.branch(instruction.imm_se());
        }
    }

    /// ADDI - Add Immediate; signed overflow is fatal, not wrapped
    fn execute_addi(&mut self, instruction: Instruction, pc: u32) -> Result<(), CpuError> {
        let imm = instruction.imm_se() as i32;
        let value = self.reg(instruction.rs()) as i32;

        match value.checked_add(imm) {
            Some(result) => {
                self.set_out_reg(instruction.rt(), result as u32);
                Ok(())
            }
            None => Err(CpuError::Overflow {
                word: instruction.word(),
                pc,
            }),
        }
    }

    /// ADDIU - Add Immediate Unsigned (wraps, despite the sign-extended
    /// immediate; "unsigned" only means no overflow trap)
    fn execute_addiu(&mut self, instruction: Instruction) {
        let value = self.reg(instruction.rs()).wrapping_add(instruction.imm_se());
        self.set_out_reg(instruction.rt(), value);
    }

    /// ANDI - Bitwise And Immediate (zero-extended)
    fn execute_andi(&mut self, instruction: Instruction) {
        let value = self.reg(instruction.rs()) & instruction.imm();
        self.set_out_reg(instruction.rt(), value);
    }

    /// ORI - Bitwise Or Immediate (zero-extended)
    fn execute_ori(&mut self, instruction: Instruction) {
        let value = self.reg(instruction.rs()) | instruction.imm();
        self.set_out_reg(instruction.rt(), value);
    }

    /// LUI - Load Upper Immediate
    fn execute_lui(&mut self, instruction: Instruction) {
        self.set_out_reg(instruction.rt(), instruction.imm() << 16);
    }

    /// Coprocessor 0 operations, sub-dispatched on bits 25..21
    fn execute_cop0(&mut self, instruction: Instruction, pc: u32) -> Result<(), CpuError> {
        match instruction.cop_op() {
            0x00 => self.execute_mfc0(instruction, pc),
            0x04 => self.execute_mtc0(instruction, pc),
            _ => Err(CpuError::UnhandledInstruction {
                word: instruction.word(),
                pc,
            }),
        }
    }

    /// MFC0 - Move From Coprocessor 0. The value goes through the load
    /// delay slot exactly like a memory load.
    fn execute_mfc0(&mut self, instruction: Instruction, pc: u32) -> Result<(), CpuError> {
        let cop_r = instruction.rd().index() as u32;

        let value = match cop_r {
            12 => self.sr,
            _ => {
                return Err(CpuError::UnhandledInstruction {
                    word: instruction.word(),
                    pc,
                })
            }
        };

        self.load = (instruction.rt(), value);
        Ok(())
    }

    /// MTC0 - Move To Coprocessor 0. Only the status register is modeled;
    /// nonzero writes to other registers are rejected loudly so unimplemented
    /// hardware state never gets dropped silently.
    fn execute_mtc0(&mut self, instruction: Instruction, pc: u32) -> Result<(), CpuError> {
        let cop_r = instruction.rd().index() as u32;
        let value = self.reg(instruction.rt());

        match cop_r {
            // Breakpoint and cache configuration registers: BPC, BDA,
            // JUMPDEST, DCIC, BDAM, BPCM. The BIOS zeroes these at boot.
            3 | 5 | 6 | 7 | 9 | 11 => {
                if value != 0 {
                    return Err(CpuError::UnhandledCop0Write { reg: cop_r, value, pc });
                }
            }
            12 => self.sr = value,
            // CAUSE: read-mostly, only a zero write is tolerated
            13 => {
                if value != 0 {
                    return Err(CpuError::UnhandledCop0Write { reg: cop_r, value, pc });
                }
            }
            _ => return Err(CpuError::UnhandledCop0Write { reg: cop_r, value, pc }),
        }
        Ok(())
    }

    /// LB - Load Byte (sign-extended), staged into the load delay slot
    fn execute_lb(&mut self, instruction: Instruction, pc: u32) -> Result<(), CpuError> {
        let addr = self
            .reg(instruction.rs())
            .wrapping_add(instruction.imm_se());

        if self.cache_isolated() {
            log(LogCategory::Bus, LogLevel::Debug, || {
                format!("cache isolated, ignoring load at 0x{:08x}", addr)
            });
            return Ok(());
        }

        let value = self
            .bus
            .load8(addr)
            .map_err(|fault| CpuError::Bus { fault, pc })? as i8;
        self.load = (instruction.rt(), value as u32);
        Ok(())
    }

    /// LW - Load Word, staged into the load delay slot
    fn execute_lw(&mut self, instruction: Instruction, pc: u32) -> Result<(), CpuError> {
        let addr = self
            .reg(instruction.rs())
            .wrapping_add(instruction.imm_se());

        if self.cache_isolated() {
            log(LogCategory::Bus, LogLevel::Debug, || {
                format!("cache isolated, ignoring load at 0x{:08x}", addr)
            });
            return Ok(());
        }

        let value = self
            .bus
            .load32(addr)
            .map_err(|fault| CpuError::Bus { fault, pc })?;
        self.load = (instruction.rt(), value);
        Ok(())
    }

    /// SB - Store Byte
    fn execute_sb(&mut self, instruction: Instruction, pc: u32) -> Result<(), CpuError> {
        let addr = self
            .reg(instruction.rs())
            .wrapping_add(instruction.imm_se());
        let value = self.reg(instruction.rt());

        self.store8(addr, value as u8, pc)
    }

    /// SH - Store HalfWord
    fn execute_sh(&mut self, instruction: Instruction, pc: u32) -> Result<(), CpuError> {
        let addr = self
            .reg(instruction.rs())
            .wrapping_add(instruction.imm_se());
        let value = self.reg(instruction.rt());

        self.store16(addr, value as u16, pc)
    }

    /// SW - Store Word
    fn execute_sw(&mut self, instruction: Instruction, pc: u32) -> Result<(), CpuError> {
        let addr = self
            .reg(instruction.rs())
            .wrapping_add(instruction.imm_se());
        let value = self.reg(instruction.rt());

        self.store32(addr, value, pc)
    }

    fn store8(&mut self, addr: u32, value: u8, pc: u32) -> Result<(), CpuError> {
        if self.cache_isolated() {
            log(LogCategory::Bus, LogLevel::Debug, || {
                format!("cache isolated, ignoring store at 0x{:08x}", addr)
            });
            return Ok(());
        }
        self.bus
            .store8(addr, value)
            .map_err(|fault| CpuError::Bus { fault, pc })
    }

    fn store16(&mut self, addr: u32, value: u16, pc: u32) -> Result<(), CpuError> {
        if self.cache_isolated() {
            log(LogCategory::Bus, LogLevel::Debug, || {
                format!("cache isolated, ignoring store at 0x{:08x}", addr)
            });
            return Ok(());
        }
        self.bus
            .store16(addr, value)
            .map_err(|fault| CpuError::Bus { fault, pc })
    }

    fn store32(&mut self, addr: u32, value: u32, pc: u32) -> Result<(), CpuError> {
        if self.cache_isolated() {
            log(LogCategory::Bus, LogLevel::Debug, || {
                format!("cache isolated, ignoring store at 0x{:08x}", addr)
            });
            return Ok(());
        }
        self.bus
            .store32(addr, value)
            .map_err(|fault| CpuError::Bus { fault, pc })
    }
}

/// Flat little-endian memory covering the whole address space (mirrored),
/// for tests and benchmarks. Enforces alignment but never reports an
/// unmapped address.
pub struct FlatBus {
    data: Vec<u8>,
}

const FLAT_BUS_MASK: u32 = 0x3f_ffff;

impl FlatBus {
    pub fn new() -> Self {
        Self {
            data: vec![0; (FLAT_BUS_MASK as usize) + 1], // 4MB
        }
    }
}

impl Default for FlatBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for FlatBus {
    fn load8(&mut self, addr: u32) -> Result<u8, BusFault> {
        Ok(self.data[(addr & FLAT_BUS_MASK) as usize])
    }

    fn load16(&mut self, addr: u32) -> Result<u16, BusFault> {
        if addr % 2 != 0 {
            return Err(BusFault::Unaligned {
                addr,
                width: AccessWidth::HalfWord,
            });
        }
        let i = (addr & FLAT_BUS_MASK) as usize;
        Ok(u16::from_le_bytes([self.data[i], self.data[i + 1]]))
    }

    fn load32(&mut self, addr: u32) -> Result<u32, BusFault> {
        if addr % 4 != 0 {
            return Err(BusFault::Unaligned {
                addr,
                width: AccessWidth::Word,
            });
        }
        let i = (addr & FLAT_BUS_MASK) as usize;
        Ok(u32::from_le_bytes([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]))
    }

    fn store8(&mut self, addr: u32, val: u8) -> Result<(), BusFault> {
        self.data[(addr & FLAT_BUS_MASK) as usize] = val;
        Ok(())
    }

    fn store16(&mut self, addr: u32, val: u16) -> Result<(), BusFault> {
        if addr % 2 != 0 {
            return Err(BusFault::Unaligned {
                addr,
                width: AccessWidth::HalfWord,
            });
        }
        let i = (addr & FLAT_BUS_MASK) as usize;
        self.data[i..i + 2].copy_from_slice(&val.to_le_bytes());
        Ok(())
    }

    fn store32(&mut self, addr: u32, val: u32) -> Result<(), BusFault> {
        if addr % 4 != 0 {
            return Err(BusFault::Unaligned {
                addr,
                width: AccessWidth::Word,
            });
        }
        let i = (addr & FLAT_BUS_MASK) as usize;
        self.data[i..i + 4].copy_from_slice(&val.to_le_bytes());
        Ok(())
    }
}
