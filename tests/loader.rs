use std::path::PathBuf;

use armsim::{load_dump, Cpu, CpuConfig, LoadError, Op, Operand};

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("armsim-{}-{name}", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn loads_file_into_machine() {
    let path = temp_file(
        "load.dump",
        "
prog:     file format elf64-littleaarch64


Disassembly of section .text:

0000000000400580 <main>:
  400580:\td2800540 \tmov\tx0, #0x2a                  \t// #42
  400584:\tf90003e0 \tstr\tx0, [sp]
",
    );
    let cpu = Cpu::load(CpuConfig::default(), 0x1000, 0x40_0580, &path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(cpu.program.code_top, 0x40_0580);
    assert_eq!(cpu.program.code_bot, 0x40_0584);
    assert_eq!(cpu.program.len(), 2);
    assert_eq!(cpu.fetch().unwrap().op, Op::Mov);
    assert_eq!((cpu.stack.top(), cpu.stack.bot()), (0x1000, 0x1007));
}

#[test]
fn bad_operand_keeps_loading() {
    let path = temp_file(
        "bad.dump",
        "  0:\td2800000 \tmov\tx0, ?what\n  4:\td503201f \tnop\n",
    );
    let program = load_dump(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(program.len(), 2);
    assert_eq!(program.code[0].operands[1], Operand::Empty);
    assert_eq!(program.code[1].op, Op::Nop);
}

#[test]
fn missing_file_is_an_open_error() {
    let path = std::env::temp_dir().join("armsim-definitely-missing.dump");
    let err = load_dump(&path).unwrap_err();
    assert!(matches!(err, LoadError::Open { .. }));
    assert!(err.to_string().contains("armsim-definitely-missing.dump"));
}
