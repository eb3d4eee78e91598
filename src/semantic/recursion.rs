use std::collections::HashSet;

use crate::ast::{AstRoot, TypeKind, TypeReference};

use super::SemanticError;

/// Reject definitions that reach themselves through references, optionals
/// and arrays only (`type X = X[]`). Recursion must pass through a struct or
/// an enum.
pub(super) fn check(root: &mut AstRoot) -> Result<(), SemanticError> {
    for def in &root.type_definitions {
        let mut seen = HashSet::new();
        let mut current = def.ty;
        loop {
            let next = match root.kind(current) {
                TypeKind::Optional(base) | TypeKind::Array(base) => *base,
                TypeKind::Reference(TypeReference {
                    target: Some(target),
                    ..
                }) => {
                    if *target == def.ty {
                        return Err(SemanticError::at(
                            &def.location,
                            format!(
                                "type '{}' refers to itself without a struct or enum in between",
                                def.name
                            ),
                        ));
                    }
                    *target
                }
                _ => break,
            };
            // a cycle not passing through `def` is reported from its own definition
            if !seen.insert(next) {
                break;
            }
            current = next;
        }
    }
    Ok(())
}
