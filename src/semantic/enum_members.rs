use std::collections::HashSet;

use crate::ast::{AstRoot, TypeKind};

use super::SemanticError;

pub(super) fn check(root: &mut AstRoot) -> Result<(), SemanticError> {
    for node in &root.types {
        let TypeKind::Enum(enumeration) = &node.kind else {
            continue;
        };
        let mut seen = HashSet::new();
        for value in &enumeration.values {
            if !seen.insert(value.value.as_str()) {
                return Err(SemanticError::at(
                    &value.location,
                    format!(
                        "enum '{}' declares '{}' more than once",
                        enumeration.name.as_deref().unwrap_or("enum {}"),
                        value.value
                    ),
                ));
            }
        }
    }
    Ok(())
}
