use std::collections::HashSet;

use crate::ast::{AstRoot, TypeId, TypeKind};

use super::SemanticError;

/// Fill `struct_types` and `enum_types` with every struct and enum node
/// reachable from a declaration, in first-visit order.
pub(super) fn collect(root: &mut AstRoot) -> Result<(), SemanticError> {
    let mut starts: Vec<TypeId> = root.type_definitions.iter().map(|def| def.ty).collect();
    for op in &root.operations {
        starts.extend(op.arguments().map(|arg| arg.ty));
        starts.push(op.return_type);
    }
    starts.extend(root.errors.iter().map(|error| error.data_type));

    let mut collector = Collector::default();
    for id in starts {
        collector.visit(root, id);
    }
    root.struct_types = collector.structs;
    root.enum_types = collector.enums;
    Ok(())
}

#[derive(Default)]
struct Collector {
    visited: HashSet<TypeId>,
    structs: Vec<TypeId>,
    enums: Vec<TypeId>,
}

impl Collector {
    fn visit(&mut self, root: &AstRoot, id: TypeId) {
        if !self.visited.insert(id) {
            return;
        }
        match root.kind(id) {
            TypeKind::Struct(_) => self.structs.push(id),
            TypeKind::Enum(_) => self.enums.push(id),
            _ => {}
        }
        for child in root.children(id) {
            self.visit(root, child);
        }
    }
}
