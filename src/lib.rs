pub mod cpu;
pub mod decoder;
pub mod disasm;
pub mod dump;
pub mod exec;
pub mod instructions;
pub mod loader;
pub mod memory;

pub mod isa {
    pub mod a64; // objdump-style AArch64 text
}

pub use cpu::{Conditions, Cpu, CpuConfig, Flow, Trap};
pub use decoder::{Instruction, Op, Operand, RegKind, Register};
pub use loader::{load_dump, parse_dump, LoadError, Program};
pub use memory::{Bus, Stack};
