use serde::{Deserialize, Serialize};

use crate::types::{MethodId, TypeId};

/// Reference to a field, carried inline on the accessing operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRef {
    pub name: String,
    pub declaring_type: TypeId,
    pub ty: TypeId,
}

/// A literal operand. String constants keep their source rendering including
/// the quote delimiters; the interner validates and strips them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    Int(i64),
    Real(f64),
    Bool(bool),
    Str(String),
    Null,
}

/// An operand of a three-address instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Var { name: String, ty: TypeId },
    Const(Constant),
    InstanceField { object: Box<Value>, field: FieldRef },
    StaticField { field: FieldRef },
    ArrayElement {
        array: Box<Value>,
        indices: Vec<Value>,
        element: TypeId,
    },
    ArrayLength { array: Box<Value> },
    Deref { reference: Box<Value> },
    MethodPtr { method: MethodId, is_virtual: bool },
}

impl Value {
    pub fn var(name: impl Into<String>, ty: TypeId) -> Self {
        Value::Var {
            name: name.into(),
            ty,
        }
    }

    /// The name of the variable this operand is, if it is one.
    pub fn as_var(&self) -> Option<&str> {
        match self {
            Value::Var { name, .. } => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchCondition {
    pub op: BranchOp,
    pub left: Value,
    pub right: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallKind {
    Static,
    Virtual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvertKind {
    /// Numeric narrowing/widening. Kept only when the source and target lower
    /// to different verifier types; same-type conversions are a plain copy.
    Narrow,
    Box,
    Unbox,
    /// The `as`-style checked cast that yields null on failure.
    As,
}

/// Source position attached by the loader when debug information is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

/// One three-address instruction. `offset` is the position used by region
/// and control-flow lookups; `label` names a jump target when one lands here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub offset: u32,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub source: Option<SourceLocation>,
    pub kind: InstructionKind,
}

impl Instruction {
    pub fn new(offset: u32, kind: InstructionKind) -> Self {
        Self {
            offset,
            label: None,
            source: None,
            kind,
        }
    }

    pub fn with_label(offset: u32, label: impl Into<String>, kind: InstructionKind) -> Self {
        Self {
            offset,
            label: Some(label.into()),
            source: None,
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstructionKind {
    Load {
        result: Value,
        operand: Value,
    },
    Store {
        target: Value,
        operand: Value,
    },
    Unary {
        result: Value,
        op: UnaryOp,
        operand: Value,
    },
    Binary {
        result: Value,
        op: BinaryOp,
        left: Value,
        right: Value,
    },
    Branch {
        condition: Option<BranchCondition>,
        target: String,
        /// True for jumps that exit a protected region; those detour through
        /// the region's finally handler before reaching the target.
        #[serde(default)]
        leaves_protected: bool,
    },
    Switch {
        operand: Value,
        targets: Vec<String>,
    },
    Call {
        result: Option<Value>,
        callee: MethodId,
        kind: CallKind,
        args: Vec<Value>,
    },
    NewObject {
        result: Value,
        allocation: TypeId,
    },
    NewArray {
        result: Value,
        element: TypeId,
        sizes: Vec<Value>,
    },
    InitObject {
        targets: Vec<Value>,
    },
    Convert {
        result: Value,
        operand: Value,
        conversion: ConvertKind,
        target: TypeId,
    },
    Throw {
        /// `None` re-throws the exception active in the current handler.
        exception: Option<Value>,
    },
    TryStart,
    CatchStart {
        binding: Option<Value>,
        exception_type: TypeId,
    },
    FinallyStart,
    Nop {
        #[serde(default)]
        ends_finally: bool,
    },
    Return {
        operand: Option<Value>,
    },
    /// Metadata token load; outside a recognized array-initializer run its
    /// result is unconstrained.
    LoadToken {
        result: Value,
        field_type: TypeId,
    },
}
