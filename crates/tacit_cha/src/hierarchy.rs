use std::collections::{HashMap, HashSet, VecDeque};

use tacit_ir::{Program, TypeId};
use tracing::debug;

/// Subtype-index collaborator. Implementations answer over unspecialized
/// definitions; callers may pass instantiations.
pub trait ClassHierarchy {
    /// Every type transitively deriving from or implementing `ty`, excluding
    /// `ty` itself. Order must be deterministic for a given index.
    fn all_subtypes(&self, ty: TypeId) -> Vec<TypeId>;

    /// Whether `t1` reaches `t2` through base links or interface
    /// implementation. Reflexive: every type reaches itself.
    fn derives_from_or_implements(&self, t1: TypeId, t2: TypeId) -> bool;
}

/// Closed-world hierarchy over an in-memory [`Program`], indexed once at
/// construction. Direct-subtype edges are recorded per unspecialized
/// definition; transitive queries walk them breadth-first in type-id order.
pub struct ProgramHierarchy<'p> {
    program: &'p Program,
    direct_subtypes: HashMap<TypeId, Vec<TypeId>>,
}

impl<'p> ProgramHierarchy<'p> {
    pub fn new(program: &'p Program) -> Self {
        let mut direct_subtypes: HashMap<TypeId, Vec<TypeId>> = HashMap::new();
        for ty in program.types.ids() {
            let def = program.type_def(ty);
            let sub = program.types.unspecialized(ty);
            if let Some(base) = def.base {
                let base = program.types.unspecialized(base);
                record_edge(&mut direct_subtypes, base, sub);
            }
            for &iface in &def.interfaces {
                let iface = program.types.unspecialized(iface);
                record_edge(&mut direct_subtypes, iface, sub);
            }
        }
        debug!(
            types = program.types.len(),
            parents = direct_subtypes.len(),
            "indexed class hierarchy"
        );
        Self {
            program,
            direct_subtypes,
        }
    }
}

fn record_edge(map: &mut HashMap<TypeId, Vec<TypeId>>, parent: TypeId, child: TypeId) {
    if parent == child {
        return;
    }
    let children = map.entry(parent).or_default();
    if !children.contains(&child) {
        children.push(child);
    }
}

impl ClassHierarchy for ProgramHierarchy<'_> {
    fn all_subtypes(&self, ty: TypeId) -> Vec<TypeId> {
        let root = self.program.types.unspecialized(ty);
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        let mut frontier = VecDeque::from([root]);
        while let Some(current) = frontier.pop_front() {
            let Some(children) = self.direct_subtypes.get(&current) else {
                continue;
            };
            for &child in children {
                if seen.insert(child) {
                    result.push(child);
                    frontier.push_back(child);
                }
            }
        }
        result
    }

    fn derives_from_or_implements(&self, t1: TypeId, t2: TypeId) -> bool {
        let from = self.program.types.unspecialized(t1);
        let to = self.program.types.unspecialized(t2);
        if from == to {
            return true;
        }
        let mut seen = HashSet::new();
        let mut frontier = vec![from];
        while let Some(current) = frontier.pop() {
            if !seen.insert(current) {
                continue;
            }
            if current == to {
                return true;
            }
            let def = self.program.type_def(current);
            if let Some(base) = def.base {
                frontier.push(self.program.types.unspecialized(base));
            }
            for &iface in &def.interfaces {
                frontier.push(self.program.types.unspecialized(iface));
            }
        }
        false
    }
}
