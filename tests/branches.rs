use armsim::cpu::REGISTER_UNSET;
use armsim::exec::IntExecutor;
use armsim::{parse_dump, Cpu, CpuConfig, Trap};

fn machine(dump: &str) -> Cpu {
    let program = parse_dump(dump.as_bytes()).unwrap();
    let pc = program.code_top;
    Cpu::new(CpuConfig::default(), 0x1000, pc, program).unwrap()
}

#[test]
fn b_skips_to_target() {
    let mut cpu = machine(
        " 100:\td2800020 \tmov\tx0, #0x1
 104:\t14000002 \tb\t10c <skip>
 108:\td2800040 \tmov\tx0, #0x2
 10c:\td2800061 \tmov\tx1, #0x3
",
    );
    assert_eq!(cpu.run(&IntExecutor).unwrap(), 3);
    assert_eq!(cpu.regs[0], 1);
    assert_eq!(cpu.regs[1], 3);
}

#[test]
fn bl_does_not_set_link_register() {
    let mut cpu = machine(
        " 100:\t94000002 \tbl\t108 <f>
 104:\td2800120 \tmov\tx0, #0x9
 108:\td2800021 \tmov\tx1, #0x1
",
    );
    cpu.run(&IntExecutor).unwrap();
    assert_eq!(cpu.regs[0], REGISTER_UNSET);
    assert_eq!(cpu.regs[1], 1);
    assert_eq!(cpu.regs[30], REGISTER_UNSET);
}

#[test]
fn unimplemented_ops_leave_state_alone() {
    let mut cpu = machine(
        " 100:\tf100041f \tcmp\tx0, #0x1
 104:\t54000041 \tb.ne\t10c <x>
 108:\td65f03c0 \tret
 10c:\td28000e2 \tmov\tx2, #0x7
",
    );
    assert_eq!(cpu.run(&IntExecutor).unwrap(), 4);
    assert_eq!(cpu.regs[2], 7);
    assert_eq!(cpu.pc, 0x110);
    assert!(cpu.conditions.is_empty());
}

#[test]
fn step_limit_stops_infinite_loop() {
    let program = parse_dump(" 100:\t14000000 \tb\t100 <spin>\n".as_bytes()).unwrap();
    let cfg = CpuConfig { step_limit: 5, ..CpuConfig::default() };
    let mut cpu = Cpu::new(cfg, 0x1000, 0x100, program).unwrap();
    assert_eq!(cpu.run(&IntExecutor).unwrap(), 5);
    assert_eq!(cpu.pc, 0x100);
}

#[test]
fn branch_out_of_program_traps_on_fetch() {
    let mut cpu = machine(" 100:\t14000040 \tb\t200 <far>\n");
    let err = cpu.run(&IntExecutor).unwrap_err();
    assert!(matches!(err, Trap::FetchOutOfRange { pc: 0x200 }));
}
