use std::collections::HashSet;

use crate::ast::{AstRoot, Member, TypeId, TypeKind};

use super::SemanticError;

/// Secret fields may be accepted as arguments but must never be reachable
/// from a return type.
pub(super) fn check(root: &mut AstRoot) -> Result<(), SemanticError> {
    let root = &*root;
    for op in &root.operations {
        let mut visited = HashSet::new();
        if let Some((owner, field)) = find_secret(root, op.return_type, &mut visited) {
            return Err(SemanticError::at(
                &op.location,
                format!(
                    "operation '{}' returns secret field '{owner}.{field}'",
                    op.name
                ),
            ));
        }
    }
    Ok(())
}

/// First secret field reachable from `id`, as `(struct name, field name)`.
fn find_secret(
    root: &AstRoot,
    id: TypeId,
    visited: &mut HashSet<TypeId>,
) -> Option<(String, String)> {
    if !visited.insert(id) {
        return None;
    }
    match root.kind(id) {
        TypeKind::Struct(structure) => {
            for member in &structure.members {
                let next = match member {
                    Member::Field(field) if field.secret => {
                        return Some((root.type_name(id), field.name.clone()));
                    }
                    Member::Field(field) => field.ty,
                    Member::Spread(spread) => spread.reference,
                };
                if let Some(found) = find_secret(root, next, visited) {
                    return Some(found);
                }
            }
            None
        }
        _ => root
            .children(id)
            .into_iter()
            .find_map(|child| find_secret(root, child, visited)),
    }
}
