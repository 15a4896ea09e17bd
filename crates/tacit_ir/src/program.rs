use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cfg::ControlFlowGraph;
use crate::instr::Instruction;
use crate::types::{MethodDef, MethodId, TypeDef, TypeId, TypeTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandlerKind {
    Catch,
    Finally,
    Fault,
}

/// The handler half of a protected region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handler {
    pub kind: HandlerKind,
    pub start: u32,
    pub end: u32,
    #[serde(default)]
    pub catch_type: Option<TypeId>,
}

/// A try-guarded offset range paired with one handler. Regions may nest;
/// nesting is assumed well-formed, with no overlapping siblings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedRegion {
    pub try_start: u32,
    pub try_end: u32,
    pub handler: Handler,
}

impl ProtectedRegion {
    pub fn try_contains(&self, offset: u32) -> bool {
        self.try_start <= offset && offset <= self.try_end
    }

    pub fn handler_contains(&self, offset: u32) -> bool {
        self.handler.start <= offset && offset <= self.handler.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Local {
    pub name: String,
    pub ty: TypeId,
}

/// Disassembled body of one translatable method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodBody {
    #[serde(default)]
    pub locals: Vec<Local>,
    pub instructions: Vec<Instruction>,
    #[serde(default)]
    pub protected_regions: Vec<ProtectedRegion>,
    #[serde(default)]
    pub cfg: ControlFlowGraph,
}

/// The whole-program input: every resolved type, every known method, and a
/// body for each non-external one. Bodies are keyed so iteration order is
/// deterministic run to run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub types: TypeTable,
    pub methods: Vec<MethodDef>,
    #[serde(default)]
    pub bodies: BTreeMap<MethodId, MethodBody>,
}

impl Program {
    pub fn new() -> Self {
        Self {
            types: TypeTable::new(),
            methods: Vec::new(),
            bodies: BTreeMap::new(),
        }
    }

    pub fn add_method(&mut self, def: MethodDef) -> MethodId {
        let id = MethodId::new(self.methods.len() as u32);
        self.methods.push(def);
        id
    }

    pub fn method(&self, id: MethodId) -> &MethodDef {
        &self.methods[id.index()]
    }

    pub fn type_def(&self, id: TypeId) -> &TypeDef {
        self.types.def(id)
    }

    pub fn type_name(&self, id: TypeId) -> &str {
        self.types.name(id)
    }

    pub fn body(&self, id: MethodId) -> Option<&MethodBody> {
        self.bodies.get(&id)
    }

    pub fn method_ids(&self) -> impl Iterator<Item = MethodId> + '_ {
        (0..self.methods.len() as u32).map(MethodId::new)
    }

    /// Follows the generic-definition link; identity for non-generic methods.
    pub fn unspecialized_method(&self, id: MethodId) -> MethodId {
        self.method(id).generic_definition.unwrap_or(id)
    }

    /// Documentation-style signature: `M:<Type>.<Name>(<ParamTy>,...)`, with
    /// by-ref parameters marked by a trailing `@` and no parentheses for a
    /// parameterless method. This string is the exact-match key for override
    /// search and the seed for identifier derivation.
    pub fn doc_signature(&self, id: MethodId) -> String {
        let def = self.method(id);
        let mut signature = format!(
            "M:{}.{}",
            self.types.name(def.containing_type),
            def.name
        );
        if !def.parameters.is_empty() {
            let rendered: Vec<String> = def
                .parameters
                .iter()
                .map(|p| {
                    let mut name = self.types.name(p.ty).to_string();
                    if p.by_ref {
                        name.push('@');
                    }
                    name
                })
                .collect();
            signature.push('(');
            signature.push_str(&rendered.join(","));
            signature.push(')');
        }
        signature
    }

    /// Whether this method contributes a translated procedure body.
    pub fn is_translatable(&self, id: MethodId) -> bool {
        let def = self.method(id);
        !def.is_external && !def.is_abstract && self.bodies.contains_key(&id)
    }
}
