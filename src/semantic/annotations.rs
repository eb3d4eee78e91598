use std::collections::HashSet;

use crate::ast::{
    Annotation, AnnotationValue, AstRoot, FunctionOperation, PrimitiveKind, TypeId, TypeKind,
};
use crate::rest::{parse_rest, HttpMethod, RestAnnotation};

use super::SemanticError;

/// What an annotation list is attached to.
#[derive(Clone, Copy)]
enum Target<'a> {
    Type,
    Field,
    Function(&'a FunctionOperation),
    Argument,
    Error,
}

impl Target<'_> {
    fn describe(&self) -> &'static str {
        match self {
            Target::Type => "a type",
            Target::Field => "a field",
            Target::Function(_) => "an operation",
            Target::Argument => "an argument",
            Target::Error => "an error",
        }
    }
}

/// Check every annotation against its target and store the parsed value.
///
/// Values are computed against the untouched tree first and written back in
/// a second walk over the same lists in the same order.
pub(super) fn validate(root: &mut AstRoot) -> Result<(), SemanticError> {
    let values = compute_values(root)?;
    let mut values = values.into_iter();

    for def in &mut root.type_definitions {
        fill(&mut def.annotations, &mut values);
    }
    for node in &mut root.types {
        if let TypeKind::Struct(structure) = &mut node.kind {
            for field in structure.members.iter_mut().filter_map(|m| m.as_field_mut()) {
                fill(&mut field.annotations, &mut values);
            }
        }
    }
    for op in &mut root.operations {
        fill(&mut op.annotations, &mut values);
        for arg in op.args.iter_mut().filter_map(|m| m.as_field_mut()) {
            fill(&mut arg.annotations, &mut values);
        }
    }
    for error in &mut root.errors {
        fill(&mut error.annotations, &mut values);
    }
    Ok(())
}

fn fill(annotations: &mut [Annotation], values: &mut impl Iterator<Item = AnnotationValue>) {
    for annotation in annotations {
        annotation.value = values.next();
    }
}

fn compute_values(root: &AstRoot) -> Result<Vec<AnnotationValue>, SemanticError> {
    let mut values = Vec::new();
    let mut push = |annotations: &[Annotation], target: Target| -> Result<(), SemanticError> {
        for annotation in annotations {
            values.push(parse_annotation(root, annotation, target)?);
        }
        Ok(())
    };

    for def in &root.type_definitions {
        push(&def.annotations, Target::Type)?;
    }
    for node in &root.types {
        if let TypeKind::Struct(structure) = &node.kind {
            for field in structure.fields() {
                push(&field.annotations, Target::Field)?;
            }
        }
    }
    for op in &root.operations {
        push(&op.annotations, Target::Function(op))?;
        for arg in op.arguments() {
            push(&arg.annotations, Target::Argument)?;
        }
        let rest_count = op.annotations.iter().filter(|a| a.name == "rest").count();
        if rest_count > 1 {
            return Err(SemanticError::at(
                &op.location,
                format!("operation '{}' has more than one @rest annotation", op.name),
            ));
        }
    }
    for error in &root.errors {
        push(&error.annotations, Target::Error)?;
    }
    Ok(values)
}

fn parse_annotation(
    root: &AstRoot,
    annotation: &Annotation,
    target: Target,
) -> Result<AnnotationValue, SemanticError> {
    let fail = |message: String| SemanticError::at(&annotation.location, message);
    let body = annotation.body.trim();
    let misplaced = || {
        fail(format!(
            "@{} is not allowed on {}",
            annotation.name,
            target.describe()
        ))
    };

    match annotation.name.as_str() {
        "description" => {
            if body.is_empty() {
                return Err(fail("@description needs a text".to_string()));
            }
            Ok(AnnotationValue::Description(body.to_string()))
        }
        "arg" => {
            let Target::Function(op) = target else {
                return Err(misplaced());
            };
            let (name, description) = match body.split_once(char::is_whitespace) {
                Some((name, description)) => (name, description.trim()),
                None => (body, ""),
            };
            if name.is_empty() || description.is_empty() {
                return Err(fail("@arg needs an argument name and a text".to_string()));
            }
            if op.argument(name).is_none() {
                return Err(fail(format!(
                    "@arg names '{name}', which is not an argument of '{}'",
                    op.name
                )));
            }
            Ok(AnnotationValue::Arg {
                name: name.to_string(),
                description: description.to_string(),
            })
        }
        "throws" => {
            if !matches!(target, Target::Function(_)) {
                return Err(misplaced());
            }
            if root.error(body).is_none() {
                return Err(fail(format!("@throws names undeclared error '{body}'")));
            }
            Ok(AnnotationValue::Throws(body.to_string()))
        }
        "hidden" => {
            if !matches!(target, Target::Function(_)) {
                return Err(misplaced());
            }
            if !body.is_empty() {
                return Err(fail("@hidden takes no arguments".to_string()));
            }
            Ok(AnnotationValue::Hidden)
        }
        "statusCode" => {
            if !matches!(target, Target::Error) {
                return Err(misplaced());
            }
            match body.parse::<u16>() {
                Ok(code) if (100..=599).contains(&code) => Ok(AnnotationValue::StatusCode(code)),
                _ => Err(fail(format!(
                    "@statusCode must be an HTTP status between 100 and 599, found '{body}'"
                ))),
            }
        }
        "rest" => {
            let Target::Function(op) = target else {
                return Err(misplaced());
            };
            let rest = parse_rest(body).map_err(fail)?;
            check_rest_bindings(root, op, &rest).map_err(fail)?;
            Ok(AnnotationValue::Rest(rest))
        }
        other => Err(fail(format!("unknown annotation '@{other}'"))),
    }
}

fn check_rest_bindings(
    root: &AstRoot,
    op: &FunctionOperation,
    rest: &RestAnnotation,
) -> Result<(), String> {
    if rest.method == HttpMethod::Get && rest.body_variable.is_some() {
        return Err(format!("@rest on '{}': GET cannot carry a body", op.name));
    }
    let mut bound = HashSet::new();
    for var in rest.variables() {
        if op.argument(var).is_none() {
            return Err(format!(
                "@rest on '{}': '{var}' is not an argument of the operation",
                op.name
            ));
        }
        if !bound.insert(var) {
            return Err(format!("@rest on '{}': '{var}' is bound twice", op.name));
        }
    }

    let simple = rest
        .path_variables
        .iter()
        .chain(&rest.query_variables)
        .chain(rest.headers.iter().map(|(_, var)| var));
    for var in simple {
        let Some(arg) = op.argument(var) else {
            continue;
        };
        if !is_simple(root, arg.ty) {
            return Err(format!(
                "@rest on '{}': '{var}' has type '{}', which cannot travel in a path, query or header",
                op.name,
                root.type_name(arg.ty)
            ));
        }
    }
    Ok(())
}

/// Primitive (possibly optional) or a plain enum, excluding `json`, `bytes`
/// and `void`.
fn is_simple(root: &AstRoot, id: TypeId) -> bool {
    let mut id = root.resolve(id);
    if let TypeKind::Optional(base) = root.kind(id) {
        id = root.resolve(*base);
    }
    match root.kind(id) {
        TypeKind::Primitive(kind) => !matches!(
            kind,
            PrimitiveKind::Json | PrimitiveKind::Bytes | PrimitiveKind::Void
        ),
        TypeKind::Enum(enumeration) => enumeration.values.iter().all(|v| v.data.is_none()),
        _ => false,
    }
}
