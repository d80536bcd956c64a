use std::collections::BTreeSet;

use serde::Serialize;

use armsim::instructions::{describe, Class};
use armsim::loader::INSN_WIDTH;
use armsim::{Operand, Program};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EdgeKind { Fallthrough, Branch, CondBranch, Call }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Edge { pub from: u64, pub to: u64, pub kind: EdgeKind }

/// Straight-line run of instructions; `end` is the address of the last one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Block { pub start: u64, pub end: u64 }

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub entry: u64,
    pub blocks: Vec<Block>,
    pub edges: Vec<Edge>,
    /// Addresses of `ret` instructions.
    pub returns: Vec<u64>,
    /// Distinct `bl` targets, i.e. callee entry points.
    pub callees: Vec<u64>,
}

fn in_program(p: &Program, addr: u64) -> bool {
    !p.is_empty() && addr >= p.code_top && addr <= p.code_bot
}

/// Static control-flow edges from the resolved branch addresses in the listing.
pub fn analyze(program: &Program) -> Report {
    let mut edges = Vec::new();
    let mut returns = Vec::new();
    let mut callees = BTreeSet::new();
    let mut leaders = BTreeSet::new();
    if !program.is_empty() {
        leaders.insert(program.code_top);
    }

    for (pc, insn) in program.iter() {
        let ft = pc + INSN_WIDTH;
        let target = match insn.operands[0] {
            Operand::Address(a) => Some(a as u64),
            _ => None,
        };
        let class = describe(insn.op).map(|d| d.class);
        let mut fallthrough = true;
        match (class, target) {
            (Some(Class::Jump), Some(tgt)) => {
                edges.push(Edge { from: pc, to: tgt, kind: EdgeKind::Branch });
                leaders.insert(tgt);
                fallthrough = false;
            }
            (Some(Class::CondJump), Some(tgt)) => {
                edges.push(Edge { from: pc, to: tgt, kind: EdgeKind::CondBranch });
                leaders.insert(tgt);
            }
            (Some(Class::Call), Some(tgt)) => {
                edges.push(Edge { from: pc, to: tgt, kind: EdgeKind::Call });
                callees.insert(tgt);
                leaders.insert(tgt);
            }
            (Some(Class::Return), _) => {
                returns.push(pc);
                fallthrough = false;
            }
            _ => {}
        }
        let ends_block = matches!(
            class,
            Some(Class::Jump | Class::CondJump | Class::Call | Class::Return)
        );
        if ends_block {
            leaders.insert(ft);
        }
        if fallthrough && in_program(program, ft) {
            edges.push(Edge { from: pc, to: ft, kind: EdgeKind::Fallthrough });
        }
    }

    let leaders: Vec<u64> = leaders.into_iter().filter(|&a| in_program(program, a)).collect();
    let blocks = leaders
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = leaders.get(i + 1).map_or(program.code_bot, |next| next - INSN_WIDTH);
            Block { start, end }
        })
        .collect();

    Report {
        entry: program.code_top,
        blocks,
        edges,
        returns,
        callees: callees.into_iter().collect(),
    }
}
