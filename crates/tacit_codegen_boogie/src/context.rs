use std::collections::{BTreeMap, BTreeSet};

use tacit_ir::{MethodId, Program, TypeId, TypeKind};
use tracing::trace;

use crate::naming::{self, BoogieType, StringInterner};

/// A field the translated code touched, remembered for the declaration dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDecl {
    pub ty: BoogieType,
    pub is_static: bool,
}

/// One delegate-type group: the shared invoke signature plus every concrete
/// method ever bound into the group.
#[derive(Debug)]
pub struct DelegateGroup {
    pub invoke: MethodId,
    pub methods: Vec<MethodId>,
    bound_names: BTreeSet<String>,
}

impl DelegateGroup {
    fn new(invoke: MethodId) -> Self {
        Self {
            invoke,
            methods: Vec::new(),
            bound_names: BTreeSet::new(),
        }
    }
}

/// Delegate groups and the global method-id constants their dispatchers
/// branch on. Ids are assigned on first binding and never reused.
#[derive(Debug, Default)]
pub struct DelegateStore {
    groups: BTreeMap<String, DelegateGroup>,
    id_constants: Vec<String>,
    ids_by_name: BTreeMap<String, u32>,
}

impl DelegateStore {
    /// The `const unique` name standing for a bound method's id.
    pub fn method_id_constant(&mut self, unique_name: &str) -> String {
        if !self.ids_by_name.contains_key(unique_name) {
            let id = self.id_constants.len() as u32;
            self.ids_by_name.insert(unique_name.to_string(), id);
            self.id_constants
                .push(format!("$MethodId_{}", unique_name));
            trace!(method = unique_name, id, "assigned delegate method id");
        }
        let id = self.ids_by_name[unique_name];
        self.id_constants[id as usize].clone()
    }

    /// Makes sure `group` exists, remembering its invoke signature.
    pub fn ensure_group(&mut self, group: &str, invoke: MethodId) {
        self.groups
            .entry(group.to_string())
            .or_insert_with(|| DelegateGroup::new(invoke));
    }

    /// Binds a concrete method into `group`, once.
    pub fn bind(&mut self, group: &str, invoke: MethodId, method: MethodId, unique_name: &str) {
        self.method_id_constant(unique_name);
        let entry = self
            .groups
            .entry(group.to_string())
            .or_insert_with(|| DelegateGroup::new(invoke));
        if entry.bound_names.insert(unique_name.to_string()) {
            entry.methods.push(method);
        }
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &DelegateGroup)> {
        self.groups.iter().map(|(key, group)| (key.as_str(), group))
    }

    /// Declared id constants, in assignment order.
    pub fn id_constants(&self) -> &[String] {
        &self.id_constants
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.id_constants.is_empty()
    }
}

/// Process-wide registries appended to by every method translation and
/// flushed once at the end of the run. One context exists per run and is
/// threaded by `&mut`, keeping the single-writer section explicit.
#[derive(Debug, Default)]
pub struct TranslationContext {
    pub strings: StringInterner,
    pub delegates: DelegateStore,
    mentioned_classes: BTreeSet<TypeId>,
    translated: BTreeSet<String>,
    externs: BTreeSet<MethodId>,
    possibly_missing: BTreeSet<MethodId>,
    fields: BTreeMap<String, FieldDecl>,
}

impl TranslationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mention_class(&mut self, ty: TypeId) {
        self.mentioned_classes.insert(ty);
    }

    /// Types the emitted program refers to, for the downstream axiom layer.
    pub fn mentioned_classes(&self) -> &BTreeSet<TypeId> {
        &self.mentioned_classes
    }

    pub fn record_translated(&mut self, unique_name: &str) {
        self.translated.insert(unique_name.to_string());
    }

    pub fn is_translated(&self, unique_name: &str) -> bool {
        self.translated.contains(unique_name)
    }

    pub fn record_extern(&mut self, method: MethodId) {
        self.externs.insert(method);
    }

    /// Records a callee that may turn out untranslated; re-checked once the
    /// whole program has been processed.
    pub fn record_possibly_missing(&mut self, method: MethodId) {
        self.possibly_missing.insert(method);
    }

    pub fn externs(&self) -> &BTreeSet<MethodId> {
        &self.externs
    }

    pub fn possibly_missing(&self) -> &BTreeSet<MethodId> {
        &self.possibly_missing
    }

    pub fn declare_field(&mut self, name: String, decl: FieldDecl) {
        self.fields.entry(name).or_insert(decl);
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, FieldDecl)> {
        self.fields.iter().map(|(name, decl)| (name.as_str(), *decl))
    }

    /// The `T$...` expression for a type, registering it (and every generic
    /// argument) as mentioned.
    pub fn type_expression(&mut self, program: &Program, ty: TypeId) -> String {
        self.mention_class(ty);
        match &program.type_def(ty).kind {
            TypeKind::Generic {
                definition,
                arguments,
            } => {
                let rendered: Vec<String> = arguments
                    .iter()
                    .map(|&arg| self.type_expression(program, arg))
                    .collect();
                format!(
                    "T${}({})",
                    naming::normalized_type_name(program, *definition),
                    rendered.join(", ")
                )
            }
            _ => format!("T${}()", naming::normalized_type_name(program, ty)),
        }
    }
}
