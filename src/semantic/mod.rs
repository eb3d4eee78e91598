//! Semantic analysis: ordered passes turning a raw [`AstRoot`] into the
//! resolved AST.
//!
//! Passes run strictly in [`PASSES`] order because each relies on what the
//! earlier ones established (names before resolution, resolution before
//! spreads, spreads before the empty check). The first failure aborts the
//! whole analysis and the root must then be treated as invalid.

mod annotations;
mod collect;
mod duplicates;
mod empty;
mod enum_members;
mod naming;
mod recursion;
mod resolve;
mod secrets;
mod spread;

use std::fmt;

use crate::ast::AstRoot;
use crate::token::Location;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticError {
    pub message: String,
    pub location: Option<Location>,
}

impl SemanticError {
    pub fn new(message: impl Into<String>) -> Self {
        SemanticError {
            message: message.into(),
            location: None,
        }
    }

    pub fn at(location: &Location, message: impl Into<String>) -> Self {
        SemanticError {
            message: message.into(),
            location: Some(location.clone()),
        }
    }
}

impl fmt::Display for SemanticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{location}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for SemanticError {}

type Pass = fn(&mut AstRoot) -> Result<(), SemanticError>;

/// Analysis pipeline in execution order.
pub const PASSES: [(&str, Pass); 10] = [
    ("duplicates", duplicates::check),
    ("naming", naming::assign_names),
    ("resolve", resolve::resolve_references),
    ("secrets", secrets::check),
    ("spread", spread::expand),
    ("empty", empty::check),
    ("recursion", recursion::check),
    ("collect", collect::collect),
    ("annotations", annotations::validate),
    ("enum_members", enum_members::check),
];

/// Run every pass over `root`, in place.
pub fn analyse(root: &mut AstRoot) -> Result<(), SemanticError> {
    for (name, pass) in PASSES {
        tracing::debug!(pass = name, types = root.types.len(), "semantic pass");
        pass(root)?;
    }
    Ok(())
}

/// Passes that rebuild the links of a root projected from the flat schema,
/// whose names and annotations are already final.
pub(crate) fn relink(root: &mut AstRoot) -> Result<(), SemanticError> {
    resolve::resolve_references(root)?;
    empty::check(root)?;
    recursion::check(root)?;
    collect::collect(root)?;
    enum_members::check(root)
}
