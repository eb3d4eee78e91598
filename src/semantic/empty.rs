use crate::ast::{AstRoot, TypeKind};

use super::SemanticError;

pub(super) fn check(root: &mut AstRoot) -> Result<(), SemanticError> {
    for node in &root.types {
        match &node.kind {
            TypeKind::Struct(structure) if structure.fields().next().is_none() => {
                return Err(SemanticError::at(
                    &node.location,
                    format!(
                        "struct '{}' has no fields",
                        structure.name.as_deref().unwrap_or("{}")
                    ),
                ));
            }
            TypeKind::Enum(enumeration) if enumeration.values.is_empty() => {
                return Err(SemanticError::at(
                    &node.location,
                    format!(
                        "enum '{}' has no values",
                        enumeration.name.as_deref().unwrap_or("enum {}")
                    ),
                ));
            }
            _ => {}
        }
    }
    Ok(())
}
