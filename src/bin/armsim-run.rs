use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use armsim::dump::fmt_state;
use armsim::exec::IntExecutor;
use armsim::{load_dump, Cpu, CpuConfig, Flow};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Run an objdump AArch64 listing on the armsim interpreter"
)]
struct Opts {
    /// Initial stack pointer (hex with 0x, or decimal)
    #[arg(long, default_value = "0x10000", value_parser = parse_u64)]
    sp: u64,
    /// Initial program counter; defaults to the first listed instruction
    #[arg(long, value_parser = parse_u64)]
    pc: Option<u64>,
    /// JSON file with a CpuConfig
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print the machine state after every instruction
    #[arg(long)]
    trace: bool,
    #[arg(value_name = "DUMPFILE")]
    input: PathBuf,
}

fn parse_u64(s: &str) -> Result<u64> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Ok(u64::from_str_radix(hex, 16)?)
    } else {
        Ok(s.parse::<u64>()?)
    }
}

fn read_config(path: Option<&PathBuf>) -> Result<CpuConfig> {
    let Some(path) = path else {
        return Ok(CpuConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    let cfg = read_config(opts.config.as_ref())?;
    let program = load_dump(&opts.input)?;
    let pc = opts.pc.unwrap_or(program.code_top);

    let mut cpu = Cpu::new(cfg, opts.sp, pc, program)?;
    let exec = IntExecutor;

    let mut steps = 0u64;
    let result = loop {
        if steps >= cfg.step_limit {
            eprintln!("step limit of {} reached", cfg.step_limit);
            break Ok(());
        }
        match cpu.step(&exec) {
            Ok(Flow::Halted) => break Ok(()),
            Ok(Flow::Continue) => {
                steps += 1;
                if opts.trace {
                    println!("{}", fmt_state(&mut cpu));
                }
            }
            Err(trap) => break Err(trap),
        }
    };

    println!("{}", fmt_state(&mut cpu));
    if let Err(trap) = result {
        eprintln!("TRAP: {trap}");
        return Err(trap.into());
    }
    Ok(())
}
