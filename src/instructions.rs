use crate::decoder::Op;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    Alu,
    Move,
    Memory,
    Jump,
    Call,
    CondJump,
    Return,
    Compare,
    Nop,
}

#[derive(Debug, Clone, Copy)]
pub struct InstrDesc {
    pub op: Op,
    pub mnemonic: &'static str,
    pub class: Class,
}

pub const TABLE: &[InstrDesc] = &[
    InstrDesc { op: Op::Add, mnemonic: "add", class: Class::Alu },
    InstrDesc { op: Op::Sub, mnemonic: "sub", class: Class::Alu },
    InstrDesc { op: Op::And, mnemonic: "and", class: Class::Alu },
    InstrDesc { op: Op::Orr, mnemonic: "orr", class: Class::Alu },
    InstrDesc { op: Op::Lsl, mnemonic: "lsl", class: Class::Alu },
    InstrDesc { op: Op::Lsr, mnemonic: "lsr", class: Class::Alu },
    InstrDesc { op: Op::Mov, mnemonic: "mov", class: Class::Move },
    InstrDesc { op: Op::Ldr, mnemonic: "ldr", class: Class::Memory },
    InstrDesc { op: Op::Str, mnemonic: "str", class: Class::Memory },
    InstrDesc { op: Op::B, mnemonic: "b", class: Class::Jump },
    InstrDesc { op: Op::Bl, mnemonic: "bl", class: Class::Call },
    InstrDesc { op: Op::Nop, mnemonic: "nop", class: Class::Nop },
    InstrDesc { op: Op::Ret, mnemonic: "ret", class: Class::Return },
    InstrDesc { op: Op::Cmp, mnemonic: "cmp", class: Class::Compare },
    InstrDesc { op: Op::BEq, mnemonic: "b.eq", class: Class::CondJump },
    InstrDesc { op: Op::BNe, mnemonic: "b.ne", class: Class::CondJump },
    InstrDesc { op: Op::BLt, mnemonic: "b.lt", class: Class::CondJump },
    InstrDesc { op: Op::BGt, mnemonic: "b.gt", class: Class::CondJump },
    InstrDesc { op: Op::BLe, mnemonic: "b.le", class: Class::CondJump },
    InstrDesc { op: Op::BGe, mnemonic: "b.ge", class: Class::CondJump },
];

/// Maps a (possibly truncated) mnemonic to its operation. Only
/// [`Instruction::end`](crate::decoder::Instruction::end) produces `Op::End`.
pub fn lookup(mnemonic: &str) -> Op {
    TABLE
        .iter()
        .find(|d| d.mnemonic == mnemonic)
        .map_or(Op::Unknown, |d| d.op)
}

pub fn describe(op: Op) -> Option<&'static InstrDesc> {
    TABLE.iter().find(|d| d.op == op)
}
