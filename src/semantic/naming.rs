use std::collections::{HashMap, HashSet};

use crate::ast::{pascal_case, AstRoot, TypeId, TypeKind};

use super::SemanticError;

/// Give every anonymous struct and enum literal a name derived from where
/// it appears.
pub(super) fn assign_names(root: &mut AstRoot) -> Result<(), SemanticError> {
    let mut namer = Namer {
        names: HashMap::new(),
        visited: HashSet::new(),
    };
    for def in &root.type_definitions {
        namer.names.entry(def.name.clone()).or_insert(def.ty);
    }

    let definitions: Vec<(String, TypeId)> = root
        .type_definitions
        .iter()
        .map(|def| (def.name.clone(), def.ty))
        .collect();
    for (name, ty) in definitions {
        namer.visit(root, ty, &name);
    }

    let mut contexts: Vec<(String, TypeId)> = Vec::new();
    for op in &root.operations {
        let owner = pascal_case(&op.name);
        for arg in op.arguments() {
            contexts.push((format!("{owner}{}", pascal_case(&arg.name)), arg.ty));
        }
        contexts.push((format!("{owner}Return"), op.return_type));
    }
    for error in &root.errors {
        contexts.push((format!("{}Data", error.name), error.data_type));
    }
    for (name, ty) in contexts {
        namer.visit(root, ty, &name);
    }
    Ok(())
}

struct Namer {
    /// Every name handed out (or reserved by a type definition) and the
    /// first node that carries it.
    names: HashMap<String, TypeId>,
    visited: HashSet<TypeId>,
}

impl Namer {
    fn visit(&mut self, root: &mut AstRoot, id: TypeId, context: &str) {
        if !self.visited.insert(id) {
            return;
        }
        match root.kind(id) {
            TypeKind::Optional(base) | TypeKind::Array(base) => {
                let base = *base;
                self.visit(root, base, context);
            }
            TypeKind::Struct(structure) => {
                let existing = structure.name.clone();
                let fields: Vec<(String, TypeId)> = structure
                    .fields()
                    .map(|field| (field.name.clone(), field.ty))
                    .collect();
                let name = self.name_node(root, id, existing, context);
                for (field, ty) in fields {
                    self.visit(root, ty, &format!("{name}{}", pascal_case(&field)));
                }
            }
            TypeKind::Enum(enumeration) => {
                let existing = enumeration.name.clone();
                let members: Vec<(String, TypeId)> = enumeration
                    .values
                    .iter()
                    .filter_map(|value| value.data.map(|data| (value.value.clone(), data)))
                    .collect();
                let name = self.name_node(root, id, existing, context);
                for (member, data) in members {
                    self.visit(root, data, &format!("{name}{}", pascal_case(&member)));
                }
            }
            TypeKind::Primitive(_) | TypeKind::Reference(_) => {}
        }
    }

    fn name_node(
        &mut self,
        root: &mut AstRoot,
        id: TypeId,
        existing: Option<String>,
        context: &str,
    ) -> String {
        let name = match existing {
            Some(name) => {
                self.names.entry(name.clone()).or_insert(id);
                name
            }
            None => self.unique_name(root, id, context),
        };
        match &mut root.node_mut(id).kind {
            TypeKind::Struct(structure) => structure.name = Some(name.clone()),
            TypeKind::Enum(enumeration) => enumeration.name = Some(name.clone()),
            _ => {}
        }
        name
    }

    /// `base`, `base2`, `base3`, ...: the first candidate that is free or
    /// already held by a structurally identical type.
    fn unique_name(&mut self, root: &AstRoot, id: TypeId, base: &str) -> String {
        let mut counter = 1;
        loop {
            let candidate = if counter == 1 {
                base.to_string()
            } else {
                format!("{base}{counter}")
            };
            match self.names.get(&candidate) {
                None => {
                    self.names.insert(candidate.clone(), id);
                    return candidate;
                }
                Some(&holder) if holder == id || root.structurally_equal(holder, id) => {
                    return candidate;
                }
                Some(_) => counter += 1,
            }
        }
    }
}
