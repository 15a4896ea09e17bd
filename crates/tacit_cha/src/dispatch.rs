use std::collections::{BTreeSet, HashMap};

use tacit_ir::{CallKind, MethodDef, MethodId, Program, TypeId};
use tracing::debug;

use crate::hierarchy::ClassHierarchy;

/// Resolves call sites to their concrete override candidates. The resolver
/// is a pure query layer: it never touches translation registries, and the
/// caller decides what to record about the returned candidates.
pub struct DispatchResolver<'p> {
    program: &'p Program,
    methods_by_type: HashMap<TypeId, Vec<MethodId>>,
}

impl<'p> DispatchResolver<'p> {
    pub fn new(program: &'p Program) -> Self {
        let mut methods_by_type: HashMap<TypeId, Vec<MethodId>> = HashMap::new();
        for id in program.method_ids() {
            let home = program
                .types
                .unspecialized(program.method(id).containing_type);
            methods_by_type.entry(home).or_default().push(id);
        }
        Self {
            program,
            methods_by_type,
        }
    }

    /// Methods declared on the unspecialized definition of `ty`.
    pub fn methods_of(&self, ty: TypeId) -> &[MethodId] {
        let home = self.program.types.unspecialized(ty);
        self.methods_by_type
            .get(&home)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Enumerates the overrides a call to `callee` can reach, most specific
    /// first. Static calls resolve to the callee alone. Virtual calls search
    /// every known subtype of the receiver (and the receiver itself) for the
    /// override each would dispatch to, deduplicated by signature.
    pub fn resolve(
        &self,
        hierarchy: &dyn ClassHierarchy,
        callee: MethodId,
        receiver_type: Option<TypeId>,
        kind: CallKind,
    ) -> Vec<MethodId> {
        if kind == CallKind::Static {
            return vec![callee];
        }

        let types = &self.program.types;
        let receiver = receiver_type.unwrap_or(self.program.method(callee).containing_type);
        let receiver = types.unspecialized(types.strip_pointers(receiver));

        let mut candidate_types = hierarchy.all_subtypes(receiver);
        candidate_types.push(receiver);

        let mut seen = BTreeSet::new();
        let mut discovered = Vec::new();
        for ty in candidate_types {
            let Some(found) = self.find_override(hierarchy, ty, callee) else {
                continue;
            };
            let signature = self.program.doc_signature(found);
            if seen.insert(signature) {
                discovered.push(found);
            }
        }

        let ordered = self.order_candidates(hierarchy, discovered);
        debug!(
            callee = %self.program.doc_signature(callee),
            candidates = ordered.len(),
            "resolved virtual call"
        );
        ordered
    }

    /// Walks `candidate`'s base chain from itself upward, staying inside the
    /// frontier of types that still reach the callee's declaring type. The
    /// first type carrying an exact-signature match wins; a structural match
    /// is accepted at the same type when no exact one exists.
    fn find_override(
        &self,
        hierarchy: &dyn ClassHierarchy,
        candidate: TypeId,
        callee: MethodId,
    ) -> Option<MethodId> {
        let types = &self.program.types;
        let callee_def = self.program.method(self.program.unspecialized_method(callee));
        let callee_home = types.unspecialized(callee_def.containing_type);

        let mut current = Some(types.unspecialized(candidate));
        while let Some(ty) = current {
            if !hierarchy.derives_from_or_implements(ty, callee_home) {
                break;
            }
            let declared = self.methods_of(ty);
            if let Some(&found) = declared
                .iter()
                .find(|&&m| self.exact_match(self.program.method(m), callee_def))
            {
                return Some(found);
            }
            if let Some(&found) = declared
                .iter()
                .find(|&&m| self.structural_match(hierarchy, self.program.method(m), callee_def))
            {
                return Some(found);
            }
            current = types.def(ty).base.map(|b| types.unspecialized(b));
        }
        None
    }

    fn exact_match(&self, candidate: &MethodDef, callee: &MethodDef) -> bool {
        let types = &self.program.types;
        candidate.name == callee.name
            && candidate.is_static == callee.is_static
            && candidate.parameters.len() == callee.parameters.len()
            && candidate
                .parameters
                .iter()
                .zip(&callee.parameters)
                .all(|(a, b)| {
                    a.by_ref == b.by_ref
                        && types.unspecialized(a.ty) == types.unspecialized(b.ty)
                })
    }

    /// Name and arity agree and every parameter pair is equal or related by
    /// the subtype relation in either direction, tolerating the skew between
    /// a generic definition and its instantiations. When a type declares
    /// several such overloads the first declared wins, as in the upstream
    /// walk; the ambiguity is not diagnosed here.
    fn structural_match(
        &self,
        hierarchy: &dyn ClassHierarchy,
        candidate: &MethodDef,
        callee: &MethodDef,
    ) -> bool {
        let types = &self.program.types;
        candidate.name == callee.name
            && candidate.is_static == callee.is_static
            && candidate.parameters.len() == callee.parameters.len()
            && candidate
                .parameters
                .iter()
                .zip(&callee.parameters)
                .all(|(a, b)| {
                    let left = types.unspecialized(a.ty);
                    let right = types.unspecialized(b.ty);
                    left == right
                        || hierarchy.derives_from_or_implements(left, right)
                        || hierarchy.derives_from_or_implements(right, left)
                })
    }

    /// Insertion sort by the subtype relation: a candidate lands before the
    /// first already-placed candidate whose containing type it strictly
    /// derives from or implements, so the most specific override is emitted
    /// first. Unrelated candidates keep discovery order.
    fn order_candidates(
        &self,
        hierarchy: &dyn ClassHierarchy,
        discovered: Vec<MethodId>,
    ) -> Vec<MethodId> {
        let types = &self.program.types;
        let mut ordered: Vec<MethodId> = Vec::with_capacity(discovered.len());
        for candidate in discovered {
            let home = types.unspecialized(self.program.method(candidate).containing_type);
            let position = ordered.iter().position(|&existing| {
                let existing_home =
                    types.unspecialized(self.program.method(existing).containing_type);
                home != existing_home && hierarchy.derives_from_or_implements(home, existing_home)
            });
            match position {
                Some(index) => ordered.insert(index, candidate),
                None => ordered.push(candidate),
            }
        }
        ordered
    }
}
