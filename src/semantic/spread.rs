use std::collections::HashSet;

use crate::ast::{AstRoot, Field, Member, TypeId, TypeKind};

use super::SemanticError;

/// Replace every `...Name` with the fields of the named struct.
///
/// A field whose name is already present replaces the earlier value but
/// keeps the earlier position. Each struct is expanded once; structs
/// reached again through a diamond reuse the finished expansion.
pub(super) fn expand(root: &mut AstRoot) -> Result<(), SemanticError> {
    let mut expander = Expander::default();
    for index in 0..root.types.len() {
        let id = TypeId(index as u32);
        if matches!(root.kind(id), TypeKind::Struct(_)) {
            expander.expand_struct(root, id)?;
        }
    }
    for index in 0..root.operations.len() {
        let args = root.operations[index].args.clone();
        root.operations[index].args = expander.expand_members(root, args)?;
    }
    Ok(())
}

#[derive(Default)]
struct Expander {
    done: HashSet<TypeId>,
    in_progress: HashSet<TypeId>,
}

impl Expander {
    fn expand_struct(&mut self, root: &mut AstRoot, id: TypeId) -> Result<(), SemanticError> {
        if self.done.contains(&id) {
            return Ok(());
        }
        if !self.in_progress.insert(id) {
            return Err(SemanticError::at(
                &root.node(id).location,
                format!("spread cycle through '{}'", root.type_name(id)),
            ));
        }
        let members = match root.kind(id) {
            TypeKind::Struct(structure) => structure.members.clone(),
            _ => Vec::new(),
        };
        let expanded = self.expand_members(root, members)?;
        if let TypeKind::Struct(structure) = &mut root.node_mut(id).kind {
            structure.members = expanded;
        }
        self.in_progress.remove(&id);
        self.done.insert(id);
        Ok(())
    }

    fn expand_members(
        &mut self,
        root: &mut AstRoot,
        members: Vec<Member>,
    ) -> Result<Vec<Member>, SemanticError> {
        let mut expanded = Vec::with_capacity(members.len());
        for member in members {
            match member {
                Member::Field(field) => insert_field(&mut expanded, field),
                Member::Spread(spread) => {
                    let target = root.resolve(spread.reference);
                    if !matches!(root.kind(target), TypeKind::Struct(_)) {
                        return Err(SemanticError::at(
                            &spread.location,
                            format!(
                                "cannot spread '{}': it is not a struct",
                                root.type_name(spread.reference)
                            ),
                        ));
                    }
                    self.expand_struct(root, target)?;
                    let fields: Vec<Field> = root
                        .struct_type(target)
                        .map(|structure| structure.fields().cloned().collect())
                        .unwrap_or_default();
                    for field in fields {
                        insert_field(&mut expanded, field);
                    }
                }
            }
        }
        Ok(expanded)
    }
}

fn insert_field(members: &mut Vec<Member>, field: Field) {
    let existing = members
        .iter_mut()
        .filter_map(Member::as_field_mut)
        .find(|existing| existing.name == field.name);
    match existing {
        Some(existing) => *existing = field,
        None => members.push(Member::Field(field)),
    }
}
