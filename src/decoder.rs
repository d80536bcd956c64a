use serde::{Deserialize, Serialize};

use crate::instructions;

/// Mnemonics are kept to at most this many characters.
pub const MNEMONIC_LEN: usize = 4;
/// Index that `wzr`/`xzr` decode to.
pub const ZERO_REG: u8 = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegKind {
    W,  // low 32 bits of a general register
    X,  // full 64-bit general register
    Sp,
    Pc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Register {
    pub kind: RegKind,
    pub index: u8, // only meaningful for W/X
}

impl Register {
    pub const SP: Register = Register { kind: RegKind::Sp, index: 0 };
    pub const PC: Register = Register { kind: RegKind::Pc, index: 0 };

    pub fn w(index: u8) -> Self {
        Self { kind: RegKind::W, index }
    }

    pub fn x(index: u8) -> Self {
        Self { kind: RegKind::X, index }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self.kind, RegKind::W | RegKind::X) && self.index == ZERO_REG
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Operand {
    Register(Register),
    Immediate(i32),
    Memory { base: Register, offset: i32 },
    /// Branch target already resolved to an absolute address.
    Address(u32),
    #[default]
    Empty,
}

impl Operand {
    pub fn is_empty(&self) -> bool {
        matches!(self, Operand::Empty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    Add,
    Sub,
    And,
    Orr,
    Lsl,
    Lsr,
    Mov,
    Ldr,
    Str,
    B,
    Bl,
    Nop,
    // Recognised by name only; executing them is reported as unimplemented.
    Ret,
    Cmp,
    BEq,
    BNe,
    BLt,
    BGt,
    BLe,
    BGe,
    Unknown,
    /// End-of-program sentinel appended by the loader.
    End,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub op: Op,
    pub mnemonic: String,
    pub operands: [Operand; 3],
}

impl Instruction {
    /// Builds an instruction, truncating `mnemonic` to [`MNEMONIC_LEN`] characters.
    pub fn new(mnemonic: &str, operands: [Operand; 3]) -> Self {
        let mnemonic: String = mnemonic.chars().take(MNEMONIC_LEN).collect();
        let op = instructions::lookup(&mnemonic);
        Self { op, mnemonic, operands }
    }

    pub fn end() -> Self {
        Self {
            op: Op::End,
            mnemonic: String::new(),
            operands: [Operand::Empty; 3],
        }
    }

    pub fn is_end(&self) -> bool {
        self.op == Op::End
    }

    /// Operands up to the first empty slot.
    pub fn used_operands(&self) -> impl Iterator<Item = &Operand> {
        self.operands.iter().take_while(|o| !o.is_empty())
    }
}

pub trait Decoder {
    /// Decodes one instruction line with the address and encoding columns already removed.
    fn decode(&self, line: &str) -> Instruction;
}
