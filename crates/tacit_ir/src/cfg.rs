use serde::{Deserialize, Serialize};

use crate::instr::Instruction;

/// A maximal run of instructions with single-entry control flow. `start` and
/// `end` delimit a half-open index range into the owning body's instruction
/// list. Successor edges include the synthesized exceptional transfers into
/// handler blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub successors: Vec<usize>,
    #[serde(default)]
    pub predecessors: Vec<usize>,
    #[serde(default)]
    pub is_exit: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFlowGraph {
    pub blocks: Vec<BasicBlock>,
}

impl ControlFlowGraph {
    /// The block whose range contains the given instruction index.
    pub fn block_containing(&self, instruction: usize) -> Option<usize> {
        self.blocks
            .iter()
            .position(|b| b.start <= instruction && instruction < b.end)
    }

    /// First instruction of a block, if the block is non-empty.
    pub fn leader<'a>(&self, block: usize, instructions: &'a [Instruction]) -> Option<&'a Instruction> {
        let block = self.blocks.get(block)?;
        instructions.get(block.start).filter(|_| block.start < block.end)
    }
}

/// Accumulates blocks and edges, then freezes them into a
/// [`ControlFlowGraph`] with predecessor lists filled in.
#[derive(Debug, Default)]
pub struct CfgBuilder {
    blocks: Vec<BasicBlock>,
    edges: Vec<(usize, usize)>,
}

impl CfgBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(&mut self, start: usize, end: usize) -> usize {
        self.blocks.push(BasicBlock {
            start,
            end,
            successors: Vec::new(),
            predecessors: Vec::new(),
            is_exit: false,
        });
        self.blocks.len() - 1
    }

    pub fn exit_block(&mut self, start: usize, end: usize) -> usize {
        let id = self.block(start, end);
        self.blocks[id].is_exit = true;
        id
    }

    pub fn edge(&mut self, from: usize, to: usize) {
        if !self.edges.contains(&(from, to)) {
            self.edges.push((from, to));
        }
    }

    pub fn finish(mut self) -> ControlFlowGraph {
        for (from, to) in self.edges {
            if from < self.blocks.len() && to < self.blocks.len() {
                self.blocks[from].successors.push(to);
                self.blocks[to].predecessors.push(from);
            }
        }
        ControlFlowGraph {
            blocks: self.blocks,
        }
    }
}
