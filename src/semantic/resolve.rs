use std::collections::HashMap;

use crate::ast::{AstRoot, TypeId, TypeKind};

use super::SemanticError;

/// Link every type reference to its definition.
pub(super) fn resolve_references(root: &mut AstRoot) -> Result<(), SemanticError> {
    let mut table: HashMap<String, TypeId> = HashMap::new();
    for def in &root.type_definitions {
        table.entry(def.name.clone()).or_insert(def.ty);
    }
    for index in 0..root.types.len() {
        let id = TypeId(index as u32);
        if let Some(name) = root.declared_name(id) {
            table.entry(name.to_string()).or_insert(id);
        }
    }

    for node in &mut root.types {
        if let TypeKind::Reference(reference) = &mut node.kind {
            if reference.target.is_some() {
                continue;
            }
            match table.get(&reference.name) {
                Some(&target) => reference.target = Some(target),
                None => {
                    return Err(SemanticError::at(
                        &node.location,
                        format!("type '{}' is not defined", reference.name),
                    ));
                }
            }
        }
    }
    Ok(())
}
