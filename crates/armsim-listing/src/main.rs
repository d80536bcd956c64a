use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use std::fmt::Write as _;
use std::path::PathBuf;

use armsim::disasm::fmt_instruction;
use armsim::{load_dump, Instruction};
use armsim_listing::{analyze, EdgeKind, Report};

#[derive(Parser, Debug)]
#[command(author, version, about = "Decoded listing of an objdump AArch64 dump", long_about = None)]
struct Cli {
    /// objdump -d output to read
    #[arg(value_name = "DUMPFILE")]
    input: PathBuf,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every decoded instruction with its address
    List {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Write output to file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Report control-flow edges, blocks, returns and callees
    Analyze {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Write output to file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat { Text, Json }

#[derive(Debug, Serialize)]
struct Row<'a> { addr: u64, text: String, insn: &'a Instruction }

fn emit(out: Option<&PathBuf>, text: &str) -> Result<()> {
    match out {
        Some(path) => std::fs::write(path, text)?,
        None => print!("{text}"),
    }
    Ok(())
}

fn render_report(r: &Report) -> String {
    let mut buf = String::new();
    let _ = writeln!(buf, "entry {:#010x}", r.entry);
    let _ = writeln!(buf, "blocks:");
    for b in &r.blocks {
        let _ = writeln!(buf, "  {:#010x}..={:#010x}", b.start, b.end);
    }
    let _ = writeln!(buf, "edges:");
    for e in &r.edges {
        let kind = match e.kind {
            EdgeKind::Fallthrough => "ft",
            EdgeKind::Branch => "br",
            EdgeKind::CondBranch => "cbr",
            EdgeKind::Call => "call",
        };
        let _ = writeln!(buf, "  {:#010x} -> {:#010x} {kind}", e.from, e.to);
    }
    let _ = writeln!(buf, "returns: {:x?}", r.returns);
    let _ = writeln!(buf, "callees: {:x?}", r.callees);
    buf
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let program = load_dump(&cli.input)?;

    match cli.cmd {
        Command::List { format, out } => {
            let text = match format {
                OutputFormat::Text => {
                    let mut buf = String::new();
                    for (addr, insn) in program.iter() {
                        let _ = writeln!(buf, "{addr:#010x}: {}", fmt_instruction(insn));
                    }
                    buf
                }
                OutputFormat::Json => {
                    let rows: Vec<Row> = program
                        .iter()
                        .map(|(addr, insn)| Row { addr, text: fmt_instruction(insn), insn })
                        .collect();
                    serde_json::to_string_pretty(&rows)? + "\n"
                }
            };
            emit(out.as_ref(), &text)?;
        }
        Command::Analyze { format, out } => {
            let report = analyze(&program);
            let text = match format {
                OutputFormat::Text => render_report(&report),
                OutputFormat::Json => serde_json::to_string_pretty(&report)? + "\n",
            };
            emit(out.as_ref(), &text)?;
        }
    }
    Ok(())
}
