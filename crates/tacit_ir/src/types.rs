use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Interned identity of a type within a [`TypeTable`]. Stable for a whole run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TypeId(u32);

impl TypeId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identity of a method definition within a [`crate::Program`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct MethodId(u32);

impl MethodId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The closed set of primitive codes the translator accepts. The native
/// unsigned size type only reaches method bodies through array-length reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Bool,
    Int32,
    Int64,
    NativeUInt,
    Float32,
    Float64,
    Str,
    Void,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 8] = [
        PrimitiveKind::Bool,
        PrimitiveKind::Int32,
        PrimitiveKind::Int64,
        PrimitiveKind::NativeUInt,
        PrimitiveKind::Float32,
        PrimitiveKind::Float64,
        PrimitiveKind::Str,
        PrimitiveKind::Void,
    ];

    pub fn qualified_name(self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "System.Boolean",
            PrimitiveKind::Int32 => "System.Int32",
            PrimitiveKind::Int64 => "System.Int64",
            PrimitiveKind::NativeUInt => "System.UIntPtr",
            PrimitiveKind::Float32 => "System.Single",
            PrimitiveKind::Float64 => "System.Double",
            PrimitiveKind::Str => "System.String",
            PrimitiveKind::Void => "System.Void",
        }
    }

    /// Size in bytes of one element of this kind, for the primitives that can
    /// back an array initializer blob. `None` for Str and Void.
    pub fn byte_size(self) -> Option<u32> {
        match self {
            PrimitiveKind::Bool => Some(1),
            PrimitiveKind::Int32 => Some(4),
            PrimitiveKind::Int64 => Some(8),
            PrimitiveKind::NativeUInt => Some(8),
            PrimitiveKind::Float32 => Some(4),
            PrimitiveKind::Float64 => Some(8),
            PrimitiveKind::Str | PrimitiveKind::Void => None,
        }
    }
}

/// Structural classification of a [`TypeDef`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    Primitive(PrimitiveKind),
    Reference,
    Pointer { target: TypeId },
    Array { element: TypeId, rank: u8 },
    Generic {
        definition: TypeId,
        arguments: Vec<TypeId>,
    },
}

/// One resolved type. `name` is the fully qualified rendering (generic
/// definitions carry their arity suffix, instantiations their argument list),
/// and is the interning key: two defs with the same name are the same type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    pub kind: TypeKind,
    #[serde(default)]
    pub base: Option<TypeId>,
    #[serde(default)]
    pub interfaces: Vec<TypeId>,
    #[serde(default)]
    pub is_interface: bool,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub is_delegate: bool,
    #[serde(default)]
    pub is_compiler_generated: bool,
    #[serde(default)]
    pub is_external: bool,
}

impl TypeDef {
    /// A plain reference class with no base link. Tests and loaders fill the
    /// remaining fields as needed.
    pub fn reference(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Reference,
            base: None,
            interfaces: Vec::new(),
            is_interface: false,
            is_abstract: false,
            is_delegate: false,
            is_compiler_generated: false,
            is_external: false,
        }
    }
}

/// Append-only arena of type definitions, interned by qualified name.
///
/// Serializes as the bare definition vector; the name index is rebuilt on
/// deserialization without renumbering, so cross-references stay valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<TypeDef>", into = "Vec<TypeDef>")]
pub struct TypeTable {
    defs: Vec<TypeDef>,
    by_name: HashMap<String, TypeId>,
}

impl TypeTable {
    /// An empty table with the eight primitive types pre-interned.
    pub fn new() -> Self {
        let mut table = Self::default();
        for kind in PrimitiveKind::ALL {
            table.intern(TypeDef {
                name: kind.qualified_name().to_string(),
                kind: TypeKind::Primitive(kind),
                base: None,
                interfaces: Vec::new(),
                is_interface: false,
                is_abstract: false,
                is_delegate: false,
                is_compiler_generated: false,
                is_external: true,
            });
        }
        table
    }

    /// Interns `def`, returning the existing id when a type of the same name
    /// is already present.
    pub fn intern(&mut self, def: TypeDef) -> TypeId {
        debug_assert!(!def.name.is_empty(), "interned type with empty name");
        if let Some(&existing) = self.by_name.get(&def.name) {
            return existing;
        }
        let id = TypeId::new(self.defs.len() as u32);
        self.by_name.insert(def.name.clone(), id);
        self.defs.push(def);
        id
    }

    /// Interns the `rank`-dimensional array of `element`.
    pub fn intern_array(&mut self, element: TypeId, rank: u8) -> TypeId {
        let suffix = if rank <= 1 {
            "[]".to_string()
        } else {
            let dims = vec!["0:"; rank as usize].join(",");
            format!("[{}]", dims)
        };
        let name = format!("{}{}", self.name(element), suffix);
        self.intern(TypeDef {
            name,
            kind: TypeKind::Array { element, rank },
            ..TypeDef::reference("")
        })
    }

    /// Interns the managed pointer to `target`.
    pub fn intern_pointer(&mut self, target: TypeId) -> TypeId {
        let name = format!("{}*", self.name(target));
        self.intern(TypeDef {
            name,
            kind: TypeKind::Pointer { target },
            ..TypeDef::reference("")
        })
    }

    /// Interns the instantiation of `definition` with `arguments`. The
    /// instantiation shares the definition's base link, interface set and
    /// flags; hierarchy queries compare unspecialized ids anyway.
    pub fn intern_generic(&mut self, definition: TypeId, arguments: Vec<TypeId>) -> TypeId {
        let rendered: Vec<&str> = arguments.iter().map(|a| self.name(*a)).collect();
        let name = format!("{}<{}>", self.name(definition), rendered.join(","));
        let template = self.def(definition).clone();
        self.intern(TypeDef {
            name,
            kind: TypeKind::Generic {
                definition,
                arguments,
            },
            ..template
        })
    }

    pub fn def(&self, ty: TypeId) -> &TypeDef {
        &self.defs[ty.index()]
    }

    pub fn name(&self, ty: TypeId) -> &str {
        &self.defs[ty.index()].name
    }

    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    pub fn primitive(&self, kind: PrimitiveKind) -> Option<TypeId> {
        self.lookup(kind.qualified_name())
    }

    /// The generic definition of `ty`, or `ty` itself when it is not an
    /// instantiation.
    pub fn unspecialized(&self, ty: TypeId) -> TypeId {
        match self.def(ty).kind {
            TypeKind::Generic { definition, .. } => definition,
            _ => ty,
        }
    }

    /// Strips pointer indirection down to the pointee.
    pub fn strip_pointers(&self, ty: TypeId) -> TypeId {
        let mut current = ty;
        while let TypeKind::Pointer { target } = self.def(current).kind {
            current = target;
        }
        current
    }

    pub fn primitive_kind(&self, ty: TypeId) -> Option<PrimitiveKind> {
        match self.def(ty).kind {
            TypeKind::Primitive(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn is_string(&self, ty: TypeId) -> bool {
        self.primitive_kind(ty) == Some(PrimitiveKind::Str)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = TypeId> + '_ {
        (0..self.defs.len() as u32).map(TypeId::new)
    }
}

impl From<Vec<TypeDef>> for TypeTable {
    fn from(defs: Vec<TypeDef>) -> Self {
        let mut by_name = HashMap::with_capacity(defs.len());
        for (index, def) in defs.iter().enumerate() {
            by_name
                .entry(def.name.clone())
                .or_insert_with(|| TypeId::new(index as u32));
        }
        Self { defs, by_name }
    }
}

impl From<TypeTable> for Vec<TypeDef> {
    fn from(table: TypeTable) -> Self {
        table.defs
    }
}

/// One formal parameter of a method. `index` is the zero-based position in
/// the declared list, excluding any implicit receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeId,
    #[serde(default)]
    pub by_ref: bool,
    #[serde(default)]
    pub is_out: bool,
    pub index: u16,
}

/// A method definition. Dispatch identity is signature-based (see
/// [`crate::Program::doc_signature`]), never reference identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDef {
    pub name: String,
    pub containing_type: TypeId,
    pub parameters: Vec<Parameter>,
    pub return_type: TypeId,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub is_external: bool,
    #[serde(default)]
    pub is_constructor: bool,
    #[serde(default)]
    pub generic_definition: Option<MethodId>,
}
