use std::collections::HashSet;

use crate::ast::{AstRoot, ErrorNode, TypeDefinition};

use super::SemanticError;

/// Drop identical redeclarations of types and errors; reject distinct ones
/// and any repeated operation name.
pub(super) fn check(root: &mut AstRoot) -> Result<(), SemanticError> {
    let mut definitions: Vec<TypeDefinition> = Vec::new();
    for def in std::mem::take(&mut root.type_definitions) {
        match definitions.iter().find(|kept| kept.name == def.name) {
            Some(kept) if root.structurally_equal(kept.ty, def.ty) => {
                tracing::debug!(name = %def.name, location = %def.location, "dropping identical type redefinition");
            }
            Some(kept) => {
                return Err(SemanticError::at(
                    &def.location,
                    format!(
                        "type '{}' is already defined at {} with a different shape",
                        def.name, kept.location
                    ),
                ));
            }
            None => definitions.push(def),
        }
    }
    root.type_definitions = definitions;

    let mut errors: Vec<ErrorNode> = Vec::new();
    for error in std::mem::take(&mut root.errors) {
        match errors.iter().find(|kept| kept.name == error.name) {
            Some(kept) if root.structurally_equal(kept.data_type, error.data_type) => {}
            Some(kept) => {
                return Err(SemanticError::at(
                    &error.location,
                    format!(
                        "error '{}' is already declared at {} with a different payload",
                        error.name, kept.location
                    ),
                ));
            }
            None => errors.push(error),
        }
    }
    root.errors = errors;

    let mut operations = HashSet::new();
    for op in &root.operations {
        if !operations.insert(op.name.as_str()) {
            return Err(SemanticError::at(
                &op.location,
                format!("operation '{}' is declared more than once", op.name),
            ));
        }
    }
    Ok(())
}
