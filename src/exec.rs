use tracing::warn;

use crate::cpu::{Cpu, Trap};
use crate::decoder::{Instruction, Op, Operand, RegKind};
use crate::memory::Bus;

pub trait Executor {
    fn exec(&self, cpu: &mut Cpu, insn: &Instruction) -> Result<(), Trap>;
}

fn binary(cpu: &mut Cpu, insn: &Instruction, f: impl Fn(u64, u64) -> u64) -> Result<(), Trap> {
    let [dst, a, b] = &insn.operands;
    let res = f(cpu.resolve_value(a)?, cpu.resolve_value(b)?);
    cpu.write_value(dst, res)
}

/// 32-bit accesses for `w` destinations, 64-bit otherwise.
fn is_word(op: &Operand) -> bool {
    matches!(op, Operand::Register(r) if r.kind == RegKind::W)
}

fn load(cpu: &mut Cpu, dst: &Operand, mem: &Operand) -> Result<(), Trap> {
    let addr = cpu.memory_address(mem)?;
    let val = if is_word(dst) {
        cpu.stack.read_u32(addr).map(u64::from)
    } else {
        cpu.stack.read_u64(addr)
    }
    .map_err(|source| Trap::Stack { addr, source })?;
    cpu.write_value(dst, val)
}

fn store(cpu: &mut Cpu, src: &Operand, mem: &Operand) -> Result<(), Trap> {
    let addr = cpu.memory_address(mem)?;
    let val = cpu.resolve_value(src)?;
    let res = if is_word(src) {
        cpu.stack.write_u32(addr, val as u32)
    } else {
        cpu.stack.write_u64(addr, val)
    };
    res.map_err(|source| Trap::Stack { addr, source })
}

pub struct IntExecutor;
impl Executor for IntExecutor {
    fn exec(&self, cpu: &mut Cpu, insn: &Instruction) -> Result<(), Trap> {
        let [first, second, _] = &insn.operands;
        match insn.op {
            Op::Nop | Op::End => {}
            Op::Add => binary(cpu, insn, u64::wrapping_add)?,
            Op::Sub => binary(cpu, insn, u64::wrapping_sub)?,
            Op::And => binary(cpu, insn, |a, b| a & b)?,
            Op::Orr => binary(cpu, insn, |a, b| a | b)?,
            // shift amount is taken modulo 64
            Op::Lsl => binary(cpu, insn, |a, b| a.wrapping_shl(b as u32))?,
            Op::Lsr => binary(cpu, insn, |a, b| a.wrapping_shr(b as u32))?,
            Op::Mov => {
                let v = cpu.resolve_value(second)?;
                cpu.write_value(first, v)?;
            }
            Op::Ldr => load(cpu, first, second)?,
            Op::Str => store(cpu, first, second)?,
            // bl does not write a link register
            Op::B | Op::Bl => {
                cpu.pc = cpu.resolve_value(first)?;
            }
            Op::Ret
            | Op::Cmp
            | Op::BEq
            | Op::BNe
            | Op::BLt
            | Op::BGt
            | Op::BLe
            | Op::BGe
            | Op::Unknown => {
                warn!(mnemonic = %insn.mnemonic, "instruction not implemented");
            }
        }
        Ok(())
    }
}
