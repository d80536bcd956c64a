use num_traits::Num;
use tracing::{debug, warn};

use crate::decoder::{Decoder, Instruction, Op, Operand, RegKind, Register, ZERO_REG};

/// Decoder for GNU objdump AArch64 instruction text, e.g.
/// `str x0, [sp, #8]` or `bl 400580 <helper>`.
pub struct A64TextDecoder;

impl A64TextDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for A64TextDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for A64TextDecoder {
    fn decode(&self, line: &str) -> Instruction {
        parse_instruction(line)
    }
}

fn parse_radix<T: Num>(digits: &str, radix: u32) -> Option<T> {
    if digits.is_empty() {
        return None;
    }
    T::from_str_radix(digits, radix).ok()
}

/// strtol-style literal: optional sign, then `0x` hex, leading `0` octal, or decimal.
fn parse_literal(s: &str) -> Option<i64> {
    let (neg, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let mag: u64 = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        parse_radix(hex, 16)?
    } else if body.len() > 1 && body.starts_with('0') {
        parse_radix(&body[1..], 8)?
    } else {
        parse_radix(body, 10)?
    };
    let v = mag as i64;
    Some(if neg { v.wrapping_neg() } else { v })
}

fn parse_register(tok: &str) -> Option<Register> {
    let mut chars = tok.chars();
    let kind = match chars.next()? {
        'w' => RegKind::W,
        'x' => RegKind::X,
        's' => return Some(Register::SP),
        'p' => return Some(Register::PC),
        _ => return None,
    };
    let rest = chars.as_str();
    let index = if rest.starts_with('z') {
        ZERO_REG
    } else {
        // 31 is only reachable through the `zr` spelling
        let n: u8 = rest.parse().ok()?;
        if n >= ZERO_REG {
            return None;
        }
        n
    };
    Some(Register { kind, index })
}

fn parse_memory(token: &str) -> Option<Operand> {
    let close = token.find(']')?;
    let inner = &token[1..close];
    match &token[close + 1..] {
        "" => {}
        "!" => debug!(token, "pre-index writeback is not modeled"),
        _ => return None,
    }
    let (base, offset) = match inner.split_once(',') {
        Some((base, off)) => {
            let off = off.trim().strip_prefix('#')?;
            (base, parse_literal(off)? as i32)
        }
        None => (inner, 0),
    };
    let base = parse_register(base.trim())?;
    Some(Operand::Memory { base, offset })
}

/// Decodes a single operand token. Unparseable tokens are reported and become
/// [`Operand::Empty`].
pub fn parse_operand(token: &str) -> Operand {
    let Some(first) = token.chars().next() else {
        return Operand::Empty;
    };
    let parsed = match first {
        'w' | 'x' | 's' | 'p' => parse_register(token).map(Operand::Register),
        '#' => parse_literal(&token[1..]).map(|v| Operand::Immediate(v as i32)),
        '[' => parse_memory(token),
        '0'..='9' => {
            let digits = token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token);
            parse_radix::<u32>(digits, 16).map(Operand::Address)
        }
        // objdump symbol annotation such as `<main+0x10>`
        '<' => return Operand::Empty,
        _ => None,
    };
    parsed.unwrap_or_else(|| {
        warn!(token, "cannot parse operand");
        Operand::Empty
    })
}

fn strip_comment(line: &str) -> &str {
    let end = [line.find("//"), line.find(';')]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(line.len());
    &line[..end]
}

fn push_token<'a>(tokens: &mut Vec<&'a str>, raw: &'a str) {
    let tok = raw.strip_suffix(',').unwrap_or(raw);
    if !tok.is_empty() {
        tokens.push(tok);
    }
}

/// Splits on whitespace, except inside `[...]`. Brackets toggle; they do not nest.
fn split_operands(rest: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut in_bracket = false;
    let mut start = 0;
    for (i, c) in rest.char_indices() {
        match c {
            '[' => in_bracket = true,
            ']' => in_bracket = false,
            c if c.is_whitespace() && !in_bracket => {
                push_token(&mut tokens, &rest[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    push_token(&mut tokens, &rest[start..]);
    tokens
}

pub fn parse_instruction(line: &str) -> Instruction {
    let line = strip_comment(line).trim();
    let (mnemonic, rest) = match line.find(char::is_whitespace) {
        Some(i) => line.split_at(i),
        None => (line, ""),
    };

    let tokens = split_operands(rest);
    let mut operands = [Operand::Empty; 3];
    if tokens.len() > operands.len() {
        debug!(line, count = tokens.len(), "operands past the third are ignored");
    }
    for (slot, tok) in operands.iter_mut().zip(tokens) {
        *slot = parse_operand(tok);
    }

    let insn = Instruction::new(mnemonic, operands);
    if insn.op == Op::Unknown {
        debug!(mnemonic, "mnemonic has no modeled semantics");
    }
    insn
}
