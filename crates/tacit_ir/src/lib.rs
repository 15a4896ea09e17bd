//! Typed three-address representation of compiled method bodies.
//!
//! This crate is the data model shared by the hierarchy resolver and the
//! Boogie generator: interned types and method signatures, the instruction
//! vocabulary, protected-region metadata, per-method control-flow graphs and
//! the whole-program container. It carries no translation logic and every
//! type round-trips through serde.

pub mod cfg;
pub mod instr;
pub mod program;
pub mod types;


pub use cfg::{BasicBlock, CfgBuilder, ControlFlowGraph};
pub use instr::{
    BinaryOp, BranchCondition, BranchOp, CallKind, Constant, ConvertKind, FieldRef, Instruction,
    InstructionKind, SourceLocation, UnaryOp, Value,
};
pub use program::{Handler, HandlerKind, Local, MethodBody, Program, ProtectedRegion};
pub use types::{
    MethodDef, MethodId, Parameter, PrimitiveKind, TypeDef, TypeId, TypeKind, TypeTable,
};
