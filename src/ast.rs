//! Abstract syntax tree for the IDL.
//!
//! Types live in an arena (`AstRoot::types`) and are addressed by [`TypeId`].
//! Declarations (type definitions, operations, errors) point into the arena,
//! and after semantic analysis every [`TypeReference`] carries the id of its
//! definition, so the arena is the fully linked type graph.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rest::RestAnnotation;
use crate::token::Location;

/// Fixed catalog of primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    String,
    Int,
    Uint,
    Float,
    BigInt,
    Bool,
    Bytes,
    Money,
    Decimal,
    Date,
    DateTime,
    Cpf,
    Cnpj,
    Email,
    Html,
    Url,
    Uuid,
    Hex,
    Base64,
    Xml,
    Json,
    Void,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 22] = [
        PrimitiveKind::String,
        PrimitiveKind::Int,
        PrimitiveKind::Uint,
        PrimitiveKind::Float,
        PrimitiveKind::BigInt,
        PrimitiveKind::Bool,
        PrimitiveKind::Bytes,
        PrimitiveKind::Money,
        PrimitiveKind::Decimal,
        PrimitiveKind::Date,
        PrimitiveKind::DateTime,
        PrimitiveKind::Cpf,
        PrimitiveKind::Cnpj,
        PrimitiveKind::Email,
        PrimitiveKind::Html,
        PrimitiveKind::Url,
        PrimitiveKind::Uuid,
        PrimitiveKind::Hex,
        PrimitiveKind::Base64,
        PrimitiveKind::Xml,
        PrimitiveKind::Json,
        PrimitiveKind::Void,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Uint => "uint",
            PrimitiveKind::Float => "float",
            PrimitiveKind::BigInt => "bigint",
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Bytes => "bytes",
            PrimitiveKind::Money => "money",
            PrimitiveKind::Decimal => "decimal",
            PrimitiveKind::Date => "date",
            PrimitiveKind::DateTime => "datetime",
            PrimitiveKind::Cpf => "cpf",
            PrimitiveKind::Cnpj => "cnpj",
            PrimitiveKind::Email => "email",
            PrimitiveKind::Html => "html",
            PrimitiveKind::Url => "url",
            PrimitiveKind::Uuid => "uuid",
            PrimitiveKind::Hex => "hex",
            PrimitiveKind::Base64 => "base64",
            PrimitiveKind::Xml => "xml",
            PrimitiveKind::Json => "json",
            PrimitiveKind::Void => "void",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        PrimitiveKind::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Index of a node in `AstRoot::types`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct TypeNode {
    pub kind: TypeKind,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Primitive(PrimitiveKind),
    Optional(TypeId),
    Array(TypeId),
    Struct(StructType),
    Enum(EnumType),
    Reference(TypeReference),
}

/// Struct literal. `name` is `None` until the naming pass runs for
/// anonymous literals.
#[derive(Debug, Clone, Default)]
pub struct StructType {
    pub name: Option<String>,
    pub members: Vec<Member>,
}

impl StructType {
    /// Concrete fields, skipping unexpanded spreads.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.members.iter().filter_map(Member::as_field)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields().find(|field| field.name == name)
    }
}

/// Entry of a struct body or an argument list. Spreads only exist before
/// the spread expansion pass.
#[derive(Debug, Clone)]
pub enum Member {
    Field(Field),
    Spread(Spread),
}

impl Member {
    pub fn as_field(&self) -> Option<&Field> {
        match self {
            Member::Field(field) => Some(field),
            Member::Spread(_) => None,
        }
    }

    pub fn as_field_mut(&mut self) -> Option<&mut Field> {
        match self {
            Member::Field(field) => Some(field),
            Member::Spread(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: TypeId,
    /// Secret fields may be accepted as input but never returned.
    pub secret: bool,
    pub annotations: Vec<Annotation>,
    pub location: Location,
}

/// `...Name`: inline every field of the referenced struct.
#[derive(Debug, Clone)]
pub struct Spread {
    /// A `TypeKind::Reference` node.
    pub reference: TypeId,
    pub location: Location,
}

#[derive(Debug, Clone, Default)]
pub struct EnumType {
    pub name: Option<String>,
    pub values: Vec<EnumValue>,
}

#[derive(Debug, Clone)]
pub struct EnumValue {
    pub value: String,
    /// Struct payload carried by this member, if any.
    pub data: Option<TypeId>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct TypeReference {
    pub name: String,
    pub target: Option<TypeId>,
}

#[derive(Debug, Clone)]
pub struct Annotation {
    /// First word after `@`.
    pub name: String,
    /// Remaining text, trimmed.
    pub body: String,
    pub location: Location,
    /// Filled by annotation validation.
    pub value: Option<AnnotationValue>,
}

impl Annotation {
    pub fn new(name: impl Into<String>, body: impl Into<String>, location: Location) -> Self {
        Annotation {
            name: name.into(),
            body: body.into(),
            location,
            value: None,
        }
    }

    /// Rebuild an annotation from its validated value.
    pub fn from_value(value: AnnotationValue, location: Location) -> Self {
        Annotation {
            name: value.kind_name().to_string(),
            body: value.render(),
            location,
            value: Some(value),
        }
    }
}

/// Validated annotation payload; also the descriptor emitted in the flat
/// schema (`{"type": "...", "value": ...}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum AnnotationValue {
    Description(String),
    Arg { name: String, description: String },
    Throws(String),
    Hidden,
    StatusCode(u16),
    Rest(RestAnnotation),
}

impl AnnotationValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            AnnotationValue::Description(_) => "description",
            AnnotationValue::Arg { .. } => "arg",
            AnnotationValue::Throws(_) => "throws",
            AnnotationValue::Hidden => "hidden",
            AnnotationValue::StatusCode(_) => "statusCode",
            AnnotationValue::Rest(_) => "rest",
        }
    }

    /// Annotation body as it would be written after the name.
    pub fn render(&self) -> String {
        match self {
            AnnotationValue::Description(text) => text.clone(),
            AnnotationValue::Arg { name, description } => format!("{name} {description}"),
            AnnotationValue::Throws(error) => error.clone(),
            AnnotationValue::Hidden => String::new(),
            AnnotationValue::StatusCode(code) => code.to_string(),
            AnnotationValue::Rest(rest) => rest.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypeDefinition {
    pub name: String,
    pub ty: TypeId,
    pub annotations: Vec<Annotation>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct FunctionOperation {
    pub name: String,
    pub args: Vec<Member>,
    pub return_type: TypeId,
    pub annotations: Vec<Annotation>,
    pub location: Location,
}

impl FunctionOperation {
    pub fn arguments(&self) -> impl Iterator<Item = &Field> {
        self.args.iter().filter_map(Member::as_field)
    }

    pub fn argument(&self, name: &str) -> Option<&Field> {
        self.arguments().find(|arg| arg.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct ErrorNode {
    pub name: String,
    /// `void` when the error carries no payload.
    pub data_type: TypeId,
    pub annotations: Vec<Annotation>,
    pub location: Location,
}

/// Root of a parsed schema.
#[derive(Debug, Clone, Default)]
pub struct AstRoot {
    pub types: Vec<TypeNode>,
    pub type_definitions: Vec<TypeDefinition>,
    pub operations: Vec<FunctionOperation>,
    pub errors: Vec<ErrorNode>,
    /// Reachable structs, filled by the collection pass.
    pub struct_types: Vec<TypeId>,
    /// Reachable enums, filled by the collection pass.
    pub enum_types: Vec<TypeId>,
    pub warnings: Vec<String>,
}

impl AstRoot {
    pub fn new() -> Self {
        AstRoot::default()
    }

    pub fn add_type(&mut self, kind: TypeKind, location: Location) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeNode { kind, location });
        id
    }

    pub fn node(&self, id: TypeId) -> &TypeNode {
        &self.types[id.index()]
    }

    pub fn node_mut(&mut self, id: TypeId) -> &mut TypeNode {
        &mut self.types[id.index()]
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.node(id).kind
    }

    pub fn type_definition(&self, name: &str) -> Option<&TypeDefinition> {
        self.type_definitions.iter().find(|def| def.name == name)
    }

    pub fn operation(&self, name: &str) -> Option<&FunctionOperation> {
        self.operations.iter().find(|op| op.name == name)
    }

    pub fn error(&self, name: &str) -> Option<&ErrorNode> {
        self.errors.iter().find(|error| error.name == name)
    }

    /// Follow resolved references to the first non-reference node. Stops at
    /// unresolved references and at reference cycles.
    pub fn resolve(&self, id: TypeId) -> TypeId {
        let mut current = id;
        for _ in 0..=self.types.len() {
            match self.kind(current) {
                TypeKind::Reference(TypeReference {
                    target: Some(target),
                    ..
                }) => current = *target,
                _ => break,
            }
        }
        current
    }

    pub fn struct_type(&self, id: TypeId) -> Option<&StructType> {
        match self.kind(self.resolve(id)) {
            TypeKind::Struct(structure) => Some(structure),
            _ => None,
        }
    }

    /// Name of a struct or enum node, if it has one.
    pub fn declared_name(&self, id: TypeId) -> Option<&str> {
        match self.kind(id) {
            TypeKind::Struct(structure) => structure.name.as_deref(),
            TypeKind::Enum(enumeration) => enumeration.name.as_deref(),
            _ => None,
        }
    }

    /// Type expression as written in the IDL, e.g. `int[]?` or `User`.
    pub fn type_name(&self, id: TypeId) -> String {
        match self.kind(id) {
            TypeKind::Primitive(kind) => kind.name().to_string(),
            TypeKind::Optional(base) => format!("{}?", self.type_name(*base)),
            TypeKind::Array(base) => format!("{}[]", self.type_name(*base)),
            TypeKind::Struct(structure) => structure.name.clone().unwrap_or_else(|| "{...}".into()),
            TypeKind::Enum(enumeration) => {
                enumeration.name.clone().unwrap_or_else(|| "enum {...}".into())
            }
            TypeKind::Reference(reference) => reference.name.clone(),
        }
    }

    /// Direct successors of a node in the type graph. Resolved references
    /// lead to their target; spreads lead to their reference node.
    pub fn children(&self, id: TypeId) -> Vec<TypeId> {
        match self.kind(id) {
            TypeKind::Primitive(_) => Vec::new(),
            TypeKind::Optional(base) | TypeKind::Array(base) => vec![*base],
            TypeKind::Struct(structure) => structure
                .members
                .iter()
                .map(|member| match member {
                    Member::Field(field) => field.ty,
                    Member::Spread(spread) => spread.reference,
                })
                .collect(),
            TypeKind::Enum(enumeration) => {
                enumeration.values.iter().filter_map(|value| value.data).collect()
            }
            TypeKind::Reference(reference) => reference.target.into_iter().collect(),
        }
    }

    /// Deep equality ignoring locations, names and annotations. References
    /// compare by name, so recursive types terminate.
    pub fn structurally_equal(&self, a: TypeId, b: TypeId) -> bool {
        if a == b {
            return true;
        }
        match (self.kind(a), self.kind(b)) {
            (TypeKind::Primitive(x), TypeKind::Primitive(y)) => x == y,
            (TypeKind::Optional(x), TypeKind::Optional(y))
            | (TypeKind::Array(x), TypeKind::Array(y)) => self.structurally_equal(*x, *y),
            (TypeKind::Reference(x), TypeKind::Reference(y)) => x.name == y.name,
            (TypeKind::Struct(x), TypeKind::Struct(y)) => {
                x.members.len() == y.members.len()
                    && x.members
                        .iter()
                        .zip(&y.members)
                        .all(|(m, n)| self.members_equal(m, n))
            }
            (TypeKind::Enum(x), TypeKind::Enum(y)) => {
                x.values.len() == y.values.len()
                    && x.values.iter().zip(&y.values).all(|(v, w)| {
                        v.value == w.value
                            && match (v.data, w.data) {
                                (None, None) => true,
                                (Some(d), Some(e)) => self.structurally_equal(d, e),
                                _ => false,
                            }
                    })
            }
            _ => false,
        }
    }

    fn members_equal(&self, a: &Member, b: &Member) -> bool {
        match (a, b) {
            (Member::Field(f), Member::Field(g)) => {
                f.name == g.name && f.secret == g.secret && self.structurally_equal(f.ty, g.ty)
            }
            (Member::Spread(s), Member::Spread(t)) => {
                self.structurally_equal(s.reference, t.reference)
            }
            _ => false,
        }
    }
}

/// Upper-case the first character: `getUser` -> `GetUser`.
pub(crate) fn pascal_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
