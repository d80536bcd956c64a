use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::decoder::{Decoder, Instruction};
use crate::isa::a64::A64TextDecoder;

/// Longest input line accepted, in bytes.
pub const MAX_LINE_LEN: usize = 256;
/// Every instruction is assumed to occupy this many bytes.
pub const INSN_WIDTH: u64 = 4;

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line} is {len} bytes long, over the {} byte limit", MAX_LINE_LEN)]
    LineTooLong { line: usize, len: usize },
}

/// Decoded instruction stream, terminated by [`Instruction::end`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub code: Vec<Instruction>,
    /// Address of the first instruction.
    pub code_top: u64,
    /// Address of the last instruction.
    pub code_bot: u64,
}

impl Program {
    /// Lays `insns` out from `code_top` and appends the end sentinel.
    pub fn new(code_top: u64, insns: Vec<Instruction>) -> Self {
        let code_bot = code_top + (insns.len().saturating_sub(1) as u64) * INSN_WIDTH;
        let mut code = insns;
        code.push(Instruction::end());
        Self { code, code_top, code_bot }
    }

    pub fn index_of(&self, pc: u64) -> Option<usize> {
        let off = pc.checked_sub(self.code_top)?;
        let idx = usize::try_from(off / INSN_WIDTH).ok()?;
        (idx < self.code.len()).then_some(idx)
    }

    pub fn get(&self, pc: u64) -> Option<&Instruction> {
        self.index_of(pc).map(|i| &self.code[i])
    }

    pub fn address_of(&self, index: usize) -> u64 {
        self.code_top + index as u64 * INSN_WIDTH
    }

    /// Number of real instructions (the sentinel is not counted).
    pub fn len(&self) -> usize {
        self.code.iter().take_while(|i| !i.is_end()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(address, instruction)` pairs, sentinel excluded.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &Instruction)> {
        self.code
            .iter()
            .take_while(|i| !i.is_end())
            .enumerate()
            .map(|(i, insn)| (self.address_of(i), insn))
    }
}

fn split_field(s: &str) -> (&str, &str) {
    s.split_once(char::is_whitespace).unwrap_or((s, ""))
}

pub fn load_dump(path: impl AsRef<Path>) -> Result<Program, LoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let program = parse_dump(BufReader::new(file))?;
    info!(
        path = %path.display(),
        instructions = program.len(),
        "loaded code {:#x}..={:#x}",
        program.code_top,
        program.code_bot
    );
    Ok(program)
}

pub fn parse_dump<R: BufRead>(reader: R) -> Result<Program, LoadError> {
    parse_dump_with(reader, &A64TextDecoder::new())
}

/// Reads objdump `-d` output: `<addr>: <encoding> <mnemonic> <operands>` lines.
/// Blank lines and lines ending in `:` (symbols, section headers) are skipped.
pub fn parse_dump_with<R: BufRead, D: Decoder>(reader: R, dec: &D) -> Result<Program, LoadError> {
    let mut code = Vec::new();
    let mut code_top = None;
    let mut code_bot = 0;

    for (n, line) in reader.lines().enumerate() {
        let lineno = n + 1;
        let line = line.map_err(|source| LoadError::Read { line: lineno, source })?;
        if line.len() > MAX_LINE_LEN {
            return Err(LoadError::LineTooLong { line: lineno, len: line.len() });
        }

        let text = line.trim();
        if text.is_empty() || text.ends_with(':') {
            continue;
        }

        let (addr_field, rest) = split_field(text);
        let Ok(addr) = u64::from_str_radix(addr_field.trim_end_matches(':'), 16) else {
            debug!(line = lineno, "skipping non-instruction line");
            continue;
        };
        let (_encoding, insn_text) = split_field(rest.trim_start());

        code_top.get_or_insert(addr);
        code_bot = addr;
        code.push(dec.decode(insn_text.trim_start()));
    }

    code.push(Instruction::end());
    Ok(Program {
        code,
        code_top: code_top.unwrap_or(0),
        code_bot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{Op, Operand, Register};

    const DUMP: &str = "
a.out:     file format elf64-littleaarch64


Disassembly of section .text:

0000000000400580 <main>:
  400580:\td10043ff \tsub\tsp, sp, #0x10
  400584:\td28000a0 \tmov\tx0, #0x5                   \t// #5
  400588:\tf90007e0 \tstr\tx0, [sp, #8]
  40058c:\t910043ff \tadd\tsp, sp, #0x10
  400590:\td65f03c0 \tret
";

    #[test]
    fn parses_objdump_listing() {
        let p = parse_dump(DUMP.as_bytes()).unwrap();
        assert_eq!(p.code_top, 0x40_0580);
        assert_eq!(p.code_bot, 0x40_0590);
        assert_eq!(p.len(), 5);
        assert_eq!(p.code.len(), 6);
        assert!(p.code[5].is_end());

        let ops: Vec<Op> = p.iter().map(|(_, i)| i.op).collect();
        assert_eq!(ops, vec![Op::Sub, Op::Mov, Op::Str, Op::Add, Op::Ret]);
        assert_eq!(
            p.code[2].operands[1],
            Operand::Memory { base: Register::SP, offset: 8 }
        );
        assert_eq!(p.get(0x40_0584).map(|i| i.op), Some(Op::Mov));
        assert_eq!(p.get(0x40_057c), None);
        assert_eq!(p.get(0x40_05a0), None);
    }

    #[test]
    fn empty_input_is_just_the_sentinel() {
        let p = parse_dump("\n\n".as_bytes()).unwrap();
        assert_eq!(p.code, vec![Instruction::end()]);
        assert!(p.is_empty());
    }

    #[test]
    fn long_lines_are_rejected() {
        let text = format!("  400580:\td503201f \tnop {}\n", "x".repeat(MAX_LINE_LEN));
        let err = parse_dump(text.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::LineTooLong { line: 1, .. }));
    }

    #[test]
    fn program_new_lays_out_addresses() {
        let p = Program::new(0x100, vec![Instruction::new("nop", Default::default()); 3]);
        assert_eq!(p.code_bot, 0x108);
        assert_eq!(p.address_of(2), 0x108);
        assert_eq!(p.index_of(0x10c), Some(3));
    }
}
