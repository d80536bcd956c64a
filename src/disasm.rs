use std::fmt;

use crate::decoder::{Instruction, Operand, RegKind, Register};

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            RegKind::W => 'w',
            RegKind::X => 'x',
            RegKind::Sp => return f.write_str("sp"),
            RegKind::Pc => return f.write_str("pc"),
        };
        if self.is_zero() {
            write!(f, "{prefix}zr")
        } else {
            write!(f, "{prefix}{}", self.index)
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(r) => write!(f, "{r}"),
            Operand::Immediate(v) => write!(f, "#{v}"),
            Operand::Memory { base, offset: 0 } => write!(f, "[{base}]"),
            Operand::Memory { base, offset } => write!(f, "[{base}, #{offset}]"),
            Operand::Address(a) => write!(f, "{a:x}"),
            Operand::Empty => Ok(()),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_end() {
            return f.write_str("<end>");
        }
        f.write_str(&self.mnemonic)?;
        for (i, op) in self.used_operands().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{op}")?;
        }
        Ok(())
    }
}

pub fn fmt_instruction(insn: &Instruction) -> String {
    insn.to_string()
}
