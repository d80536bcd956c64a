use std::path::Path;

use anyhow::Error;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::decoder::{Instruction, Operand, RegKind, Register};
use crate::exec::Executor;
use crate::loader::{load_dump, Program, INSN_WIDTH};
use crate::memory::{Stack, DEFAULT_STACK_LIMIT};

/// Number of backed general-purpose registers (x0..x30).
pub const NUM_GPRS: usize = 31;
/// Value every general-purpose register holds before its first write.
pub const REGISTER_UNSET: u64 = 0xDEAD_BEEF_DEAD_BEEF;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuConfig {
    pub little_endian: bool, // AArch64 user code is little-endian
    /// Upper bound on instructions executed by a run loop.
    pub step_limit: u64,
    /// Largest size the stack may grow to, in bytes.
    pub stack_limit: u64,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            little_endian: true,
            step_limit: 10_000_000,
            stack_limit: DEFAULT_STACK_LIMIT,
        }
    }
}

bitflags! {
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditions: u8 {
const ZERO = 1 << 0;
const NEGATIVE = 1 << 1;
const POSITIVE = 1 << 2;
}
}

#[derive(thiserror::Error, Debug)]
pub enum Trap {
    #[error("No instruction at {pc:#x}")]
    FetchOutOfRange { pc: u64 },
    #[error("Operand {operand:?} has no value")]
    NoValue { operand: Operand },
    #[error("Operand {operand:?} is not a register")]
    NotWritable { operand: Operand },
    #[error("Operand {operand:?} is not a memory reference")]
    NotMemory { operand: Operand },
    #[error("Stack access at {addr:#x} failed: {source}")]
    Stack { addr: u64, #[source] source: Error },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The end-of-program sentinel was fetched.
    Halted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cpu {
    pub regs: [u64; NUM_GPRS], // x0..x30
    pub sp: u64,
    pub pc: u64,
    pub conditions: Conditions, // declared but never set by a modeled op
    pub stack: Stack,
    pub program: Program,
    pub cfg: CpuConfig,
}

impl Cpu {
    pub fn new(cfg: CpuConfig, sp: u64, pc: u64, program: Program) -> Result<Self, Trap> {
        let stack = Stack::new(sp, cfg.little_endian)
            .map_err(|source| Trap::Stack { addr: sp, source })?
            .with_limit(cfg.stack_limit);
        Ok(Self {
            regs: [REGISTER_UNSET; NUM_GPRS],
            sp,
            pc,
            conditions: Conditions::empty(),
            stack,
            program,
            cfg,
        })
    }

    /// Loads an objdump listing and builds a machine around it.
    pub fn load(cfg: CpuConfig, sp: u64, pc: u64, path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let program = load_dump(path)?;
        Ok(Self::new(cfg, sp, pc, program)?)
    }

    /// Register value as stored, or `None` for the zero register and out-of-range indices.
    pub fn reg(&self, index: usize) -> Option<u64> {
        self.regs.get(index).copied()
    }

    pub fn fetch(&self) -> Result<&Instruction, Trap> {
        self.fetch_at(self.pc)
    }

    pub fn fetch_at(&self, pc: u64) -> Result<&Instruction, Trap> {
        self.program.get(pc).ok_or(Trap::FetchOutOfRange { pc })
    }

    fn read_reg(&self, r: Register) -> u64 {
        match r.kind {
            RegKind::Sp => self.sp,
            RegKind::Pc => self.pc,
            // xzr/wzr and anything past x30 read as zero
            RegKind::W => self.reg(r.index as usize).unwrap_or(0) & 0xFFFF_FFFF,
            RegKind::X => self.reg(r.index as usize).unwrap_or(0),
        }
    }

    pub fn resolve_value(&self, operand: &Operand) -> Result<u64, Trap> {
        match *operand {
            Operand::Immediate(v) => Ok(v as i64 as u64),
            Operand::Address(a) => Ok(a as u64),
            Operand::Register(r) => Ok(self.read_reg(r)),
            // an operand that failed to decode reads as zero
            Operand::Empty => Ok(0),
            Operand::Memory { .. } => Err(Trap::NoValue { operand: *operand }),
        }
    }

    /// Writes `value` to a register operand. Writes to `wzr`/`xzr` are discarded.
    pub fn write_value(&mut self, operand: &Operand, value: u64) -> Result<(), Trap> {
        let Operand::Register(r) = *operand else {
            return Err(Trap::NotWritable { operand: *operand });
        };
        let value = match r.kind {
            RegKind::Sp => {
                self.sp = value;
                return Ok(());
            }
            RegKind::Pc => {
                self.pc = value;
                return Ok(());
            }
            RegKind::W => value & 0xFFFF_FFFF,
            RegKind::X => value,
        };
        match self.regs.get_mut(r.index as usize) {
            Some(slot) => *slot = value,
            None => trace!(index = r.index, "write to zero register discarded"),
        }
        Ok(())
    }

    /// Effective address of a `[base, #offset]` operand.
    pub fn memory_address(&self, operand: &Operand) -> Result<u64, Trap> {
        match *operand {
            Operand::Memory { base, offset } => {
                Ok(self.read_reg(base).wrapping_add(offset as i64 as u64))
            }
            _ => Err(Trap::NotMemory { operand: *operand }),
        }
    }

    /// Fetches at `pc`, advances `pc` by one instruction, then executes.
    pub fn step<X: Executor>(&mut self, exec: &X) -> Result<Flow, Trap> {
        let pc = self.pc;
        let insn = self.fetch_at(pc)?.clone();
        if insn.is_end() {
            debug!(pc, "reached end of program");
            return Ok(Flow::Halted);
        }
        trace!(pc, %insn, "step");
        self.pc = pc.wrapping_add(INSN_WIDTH);
        exec.exec(self, &insn)?;
        Ok(Flow::Continue)
    }

    /// Steps until the sentinel, a trap, or `cfg.step_limit` instructions.
    /// Returns the number of instructions executed.
    pub fn run<X: Executor>(&mut self, exec: &X) -> Result<u64, Trap> {
        let mut executed = 0;
        while executed < self.cfg.step_limit {
            if self.step(exec)? == Flow::Halted {
                return Ok(executed);
            }
            executed += 1;
        }
        debug!(executed, "step limit reached");
        Ok(executed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpu() -> Cpu {
        Cpu::new(CpuConfig::default(), 0x1000, 0x100, Program::new(0x100, Vec::new())).unwrap()
    }

    #[test]
    fn registers_start_unset() {
        let c = cpu();
        assert!(c.regs.iter().all(|&r| r == REGISTER_UNSET));
        assert_eq!(c.conditions, Conditions::empty());
        assert_eq!(c.reg(31), None);
    }

    #[test]
    fn x_write_then_read_round_trips() {
        let mut c = cpu();
        let x5 = Operand::Register(Register::x(5));
        c.write_value(&x5, 0x1234_5678_9ABC_DEF0).unwrap();
        assert_eq!(c.resolve_value(&x5).unwrap(), 0x1234_5678_9ABC_DEF0);
    }

    #[test]
    fn w_write_clears_upper_half() {
        let mut c = cpu();
        let w5 = Operand::Register(Register::w(5));
        c.write_value(&w5, 0x1234_5678_9ABC_DEF0).unwrap();
        assert_eq!(c.resolve_value(&w5).unwrap(), 0x9ABC_DEF0);
        assert_eq!(c.regs[5], 0x9ABC_DEF0);
    }

    #[test]
    fn zero_register_reads_zero_and_ignores_writes() {
        let mut c = cpu();
        let before = c.regs;
        for zr in [Register::x(31), Register::w(31)] {
            c.write_value(&Operand::Register(zr), 77).unwrap();
            assert_eq!(c.resolve_value(&Operand::Register(zr)).unwrap(), 0);
        }
        assert_eq!(c.regs, before);
    }

    #[test]
    fn indices_past_the_zero_register_behave_like_it() {
        let mut c = cpu();
        let before = c.regs;
        for r in [Register::x(40), Register::w(200)] {
            c.write_value(&Operand::Register(r), 5).unwrap();
            assert_eq!(c.resolve_value(&Operand::Register(r)).unwrap(), 0);
        }
        assert_eq!(c.regs, before);
    }

    #[test]
    fn sp_and_pc_operands() {
        let mut c = cpu();
        assert_eq!(c.resolve_value(&Operand::Register(Register::SP)).unwrap(), 0x1000);
        c.write_value(&Operand::Register(Register::PC), 0x104).unwrap();
        assert_eq!(c.pc, 0x104);
    }

    #[test]
    fn immediates_sign_extend_and_addresses_do_not() {
        let c = cpu();
        assert_eq!(c.resolve_value(&Operand::Immediate(-1)).unwrap(), u64::MAX);
        assert_eq!(c.resolve_value(&Operand::Address(0xFFFF_FFFF)).unwrap(), 0xFFFF_FFFF);
        assert_eq!(c.resolve_value(&Operand::Empty).unwrap(), 0);
        let mem = Operand::Memory { base: Register::SP, offset: 0 };
        assert!(matches!(c.resolve_value(&mem), Err(Trap::NoValue { .. })));
    }

    #[test]
    fn memory_address_adds_signed_offset() {
        let c = cpu();
        let m = Operand::Memory { base: Register::SP, offset: -64 };
        assert_eq!(c.memory_address(&m).unwrap(), 0x0FC0);
        assert!(matches!(
            c.memory_address(&Operand::Immediate(4)),
            Err(Trap::NotMemory { .. })
        ));
    }

    #[test]
    fn fetch_outside_program_traps() {
        let c = cpu();
        assert!(c.fetch().unwrap().is_end());
        assert!(matches!(c.fetch_at(0xFC), Err(Trap::FetchOutOfRange { pc: 0xFC })));
        assert!(matches!(c.fetch_at(0x104), Err(Trap::FetchOutOfRange { .. })));
    }
}
