use std::fmt::Write;

use tracing::warn;

use crate::cpu::{Conditions, Cpu, REGISTER_UNSET};
use crate::memory::WORD_SIZE;

const RULE: &str = "+-------------------------+";

/// Human-readable machine state: condition codes, the registers that have
/// been written, `sp`/`pc` and the stack one word per row.
///
/// The stack is grown to cover `sp` first so the `sp->` marker always has a row.
pub fn fmt_state(cpu: &mut Cpu) -> String {
    if let Err(e) = cpu.stack.grow(cpu.sp) {
        warn!("stack not extended to sp: {e:#}");
    }

    let mut out = String::new();
    out.push_str("Condition codes:");
    for (flag, name) in [
        (Conditions::ZERO, "Z"),
        (Conditions::NEGATIVE, "N"),
        (Conditions::POSITIVE, "P"),
    ] {
        if cpu.conditions.contains(flag) {
            let _ = write!(out, " {name}");
        }
    }
    out.push('\n');

    out.push_str("Registers:\n");
    for (i, &v) in cpu.regs.iter().enumerate() {
        if v != REGISTER_UNSET {
            let _ = writeln!(out, "\tw/x{i} = {v:#x}");
        }
    }
    let _ = writeln!(out, "\tsp = {:#X}", cpu.sp);
    let _ = writeln!(out, "\tpc = {:#X}", cpu.pc);

    out.push_str("Stack:\n");
    let top = cpu.stack.top();
    for (row, word) in cpu.stack.bytes().chunks(WORD_SIZE as usize).enumerate() {
        let addr = top + row as u64 * WORD_SIZE;
        let marker = if cpu.sp == addr { "sp->" } else { "" };
        let _ = writeln!(out, "\t{marker:>10} {RULE}");
        let _ = write!(out, "\t{addr:#010X} | ");
        for b in word {
            let _ = write!(out, "{b:02X} ");
        }
        out.push_str("|\n");
    }
    let _ = writeln!(out, "\t{:>10} {RULE}", "");
    out
}
