//! Flat JSON projection of the resolved AST.
//!
//! Named types are referenced by their name and looked up in the type table
//! again by consumers, so the projection is structural beyond the name table.
//! Key order of every table follows declaration order.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ast::*;
use crate::semantic::{self, SemanticError};
use crate::token::Location;

/// Insertion-ordered string map with a by-name index.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
    index: HashMap<String, usize>,
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        OrderedMap {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Insert or replace; a replaced entry keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        match self.index.get(&key) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        match self.index.get(key) {
            Some(&i) => Some(&mut self.entries[i].1),
            None => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        OrderedMap::new()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = OrderedMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = OrderedMap::new();
                while let Some((k, v)) = access.next_entry::<String, V>()? {
                    map.insert(k, v);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

/// Type as it appears in the flat schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeDescription {
    /// Primitive or type name with `?` / `[]` suffixes, e.g. `"int[]?"`.
    Name(String),
    Enum(Vec<EnumMemberDescription>),
    Struct(OrderedMap<TypeDescription>),
}

impl TypeDescription {
    pub fn as_name(&self) -> Option<&str> {
        match self {
            TypeDescription::Name(name) => Some(name),
            _ => None,
        }
    }
}

impl From<&str> for TypeDescription {
    fn from(name: &str) -> Self {
        TypeDescription::Name(name.to_string())
    }
}

impl From<String> for TypeDescription {
    fn from(name: String) -> Self {
        TypeDescription::Name(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumMemberDescription {
    Plain(String),
    /// `[member, struct type name]`
    WithData(String, String),
}

impl EnumMemberDescription {
    pub fn tag(&self) -> &str {
        match self {
            EnumMemberDescription::Plain(tag) | EnumMemberDescription::WithData(tag, _) => tag,
        }
    }
}

pub type TypeTable = OrderedMap<TypeDescription>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDescription {
    pub args: TypeTable,
    pub ret: TypeDescription,
}

pub type FunctionTable = OrderedMap<FunctionDescription>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorDescription {
    Plain(String),
    WithData(String, TypeDescription),
}

impl ErrorDescription {
    pub fn name(&self) -> &str {
        match self {
            ErrorDescription::Plain(name) | ErrorDescription::WithData(name, _) => name,
        }
    }
}

/// The wire form handed to emitters and runtimes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub type_table: TypeTable,
    pub function_table: FunctionTable,
    pub errors: Vec<ErrorDescription>,
    #[serde(default)]
    pub annotations: OrderedMap<Vec<AnnotationValue>>,
}

impl Schema {
    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json_str(source: &str) -> serde_json::Result<Self> {
        serde_json::from_str(source)
    }
}

// ---------------------------------------------------------------------------
// AST -> JSON
// ---------------------------------------------------------------------------

/// Project an analysed root onto the flat schema.
pub fn ast_to_json(root: &AstRoot) -> Schema {
    let mut schema = Schema::default();
    // table entry -> node carrying its fields, for `type.T.f` annotations
    let mut entries: Vec<(String, TypeId, Option<&TypeDefinition>)> = Vec::new();

    for def in &root.type_definitions {
        if schema.type_table.contains_key(&def.name) {
            continue;
        }
        schema.type_table.insert(def.name.clone(), expand(root, def.ty));
        entries.push((def.name.clone(), def.ty, Some(def)));
    }
    for &id in root.struct_types.iter().chain(&root.enum_types) {
        let Some(name) = root.declared_name(id) else {
            continue;
        };
        if schema.type_table.contains_key(name) {
            continue;
        }
        schema.type_table.insert(name, expand(root, id));
        entries.push((name.to_string(), id, None));
    }

    for op in &root.operations {
        let args = op
            .arguments()
            .map(|arg| (arg.name.clone(), TypeDescription::Name(type_string(root, arg.ty))))
            .collect();
        schema.function_table.insert(
            op.name.clone(),
            FunctionDescription {
                args,
                ret: TypeDescription::Name(type_string(root, op.return_type)),
            },
        );
    }

    for error in &root.errors {
        let description = match root.kind(error.data_type) {
            TypeKind::Primitive(PrimitiveKind::Void) => ErrorDescription::Plain(error.name.clone()),
            _ => ErrorDescription::WithData(error.name.clone(), expand(root, error.data_type)),
        };
        schema.errors.push(description);
    }

    let annotations = &mut schema.annotations;
    for (name, id, def) in &entries {
        if let Some(def) = def {
            add_annotations(annotations, format!("type.{name}"), &def.annotations);
        }
        if let TypeKind::Struct(structure) = root.kind(*id) {
            for field in structure.fields() {
                add_annotations(annotations, format!("type.{name}.{}", field.name), &field.annotations);
            }
        }
    }
    for op in &root.operations {
        add_annotations(annotations, format!("fn.{}", op.name), &op.annotations);
        for arg in op.arguments() {
            add_annotations(annotations, format!("fn.{}.{}", op.name, arg.name), &arg.annotations);
        }
    }
    for error in &root.errors {
        add_annotations(annotations, format!("error.{}", error.name), &error.annotations);
    }
    schema
}

fn add_annotations(
    table: &mut OrderedMap<Vec<AnnotationValue>>,
    target: String,
    annotations: &[Annotation],
) {
    let values: Vec<AnnotationValue> = annotations
        .iter()
        .filter_map(|annotation| annotation.value.clone())
        .collect();
    if !values.is_empty() {
        table.insert(target, values);
    }
}

/// Body of a type table entry: struct and enum literals are spelled out,
/// anything else is its type string.
fn expand(root: &AstRoot, id: TypeId) -> TypeDescription {
    match root.kind(id) {
        TypeKind::Struct(structure) => TypeDescription::Struct(
            structure
                .fields()
                .map(|field| (field.name.clone(), TypeDescription::Name(type_string(root, field.ty))))
                .collect(),
        ),
        TypeKind::Enum(enumeration) => TypeDescription::Enum(
            enumeration
                .values
                .iter()
                .map(|value| match value.data {
                    Some(data) => {
                        EnumMemberDescription::WithData(value.value.clone(), type_string(root, data))
                    }
                    None => EnumMemberDescription::Plain(value.value.clone()),
                })
                .collect(),
        ),
        _ => TypeDescription::Name(type_string(root, id)),
    }
}

/// Reference form of a type: named literals by name, suffixes kept.
fn type_string(root: &AstRoot, id: TypeId) -> String {
    root.type_name(id)
}

// ---------------------------------------------------------------------------
// JSON -> AST
// ---------------------------------------------------------------------------

/// Rebuild a resolved root from a flat schema. Every table entry becomes a
/// type definition; references are linked and checked for direct recursion.
pub fn json_to_ast(schema: &Schema) -> Result<AstRoot, SemanticError> {
    let location = Location::new("<schema>", 0, 0);
    let mut builder = Builder {
        root: AstRoot::new(),
        location: location.clone(),
    };

    for (name, description) in schema.type_table.iter() {
        // literals take the entry's name
        let ty = builder.build(description, name)?;
        builder.root.type_definitions.push(TypeDefinition {
            name: name.to_string(),
            ty,
            annotations: Vec::new(),
            location: location.clone(),
        });
    }

    for (name, function) in schema.function_table.iter() {
        let owner = pascal_case(name);
        let mut args = Vec::with_capacity(function.args.len());
        for (arg, description) in function.args.iter() {
            let context = format!("{owner}{}", pascal_case(arg));
            args.push(Member::Field(Field {
                name: arg.to_string(),
                ty: builder.build(description, &context)?,
                secret: false,
                annotations: Vec::new(),
                location: location.clone(),
            }));
        }
        let return_type = builder.build(&function.ret, &format!("{owner}Return"))?;
        builder.root.operations.push(FunctionOperation {
            name: name.to_string(),
            args,
            return_type,
            annotations: Vec::new(),
            location: location.clone(),
        });
    }

    for error in &schema.errors {
        let data_type = match error {
            ErrorDescription::Plain(_) => builder.build(&"void".into(), "")?,
            ErrorDescription::WithData(name, data) => builder.build(data, &format!("{name}Data"))?,
        };
        builder.root.errors.push(ErrorNode {
            name: error.name().to_string(),
            data_type,
            annotations: Vec::new(),
            location: location.clone(),
        });
    }
    if builder.root.error("Fatal").is_none() {
        let data_type = builder.build(&"void".into(), "")?;
        builder.root.errors.push(ErrorNode {
            name: "Fatal".to_string(),
            data_type,
            annotations: Vec::new(),
            location: location.clone(),
        });
    }

    let mut root = builder.root;
    for (target, values) in schema.annotations.iter() {
        let annotations = target_annotations(&mut root, target).ok_or_else(|| {
            SemanticError::new(format!("annotation target '{target}' does not exist"))
        })?;
        annotations.extend(
            values
                .iter()
                .map(|value| Annotation::from_value(value.clone(), location.clone())),
        );
    }

    semantic::relink(&mut root)?;
    Ok(root)
}

fn target_annotations<'a>(root: &'a mut AstRoot, target: &str) -> Option<&'a mut Vec<Annotation>> {
    let parts: Vec<&str> = target.split('.').collect();
    match parts.as_slice() {
        ["type", name] => root
            .type_definitions
            .iter_mut()
            .find(|def| def.name == *name)
            .map(|def| &mut def.annotations),
        ["type", name, field] => {
            let ty = root.type_definition(name)?.ty;
            match &mut root.node_mut(ty).kind {
                TypeKind::Struct(structure) => structure
                    .members
                    .iter_mut()
                    .filter_map(Member::as_field_mut)
                    .find(|f| f.name == *field)
                    .map(|f| &mut f.annotations),
                _ => None,
            }
        }
        ["fn", name] => root
            .operations
            .iter_mut()
            .find(|op| op.name == *name)
            .map(|op| &mut op.annotations),
        ["fn", name, arg] => root
            .operations
            .iter_mut()
            .find(|op| op.name == *name)?
            .args
            .iter_mut()
            .filter_map(Member::as_field_mut)
            .find(|f| f.name == *arg)
            .map(|f| &mut f.annotations),
        ["error", name] => root
            .errors
            .iter_mut()
            .find(|error| error.name == *name)
            .map(|error| &mut error.annotations),
        _ => None,
    }
}

struct Builder {
    root: AstRoot,
    location: Location,
}

impl Builder {
    /// `context` names struct and enum literals found at this position.
    fn build(&mut self, description: &TypeDescription, context: &str) -> Result<TypeId, SemanticError> {
        match description {
            TypeDescription::Name(name) => self.build_type_string(name),
            TypeDescription::Struct(fields) => {
                let mut members = Vec::with_capacity(fields.len());
                for (field, description) in fields.iter() {
                    let context = format!("{context}{}", pascal_case(field));
                    members.push(Member::Field(Field {
                        name: field.to_string(),
                        ty: self.build(description, &context)?,
                        secret: false,
                        annotations: Vec::new(),
                        location: self.location.clone(),
                    }));
                }
                Ok(self.add(TypeKind::Struct(StructType {
                    name: Some(context.to_string()),
                    members,
                })))
            }
            TypeDescription::Enum(members) => {
                let mut values = Vec::with_capacity(members.len());
                for member in members {
                    let data = match member {
                        EnumMemberDescription::Plain(_) => None,
                        EnumMemberDescription::WithData(_, name) => Some(self.build_type_string(name)?),
                    };
                    values.push(EnumValue {
                        value: member.tag().to_string(),
                        data,
                        location: self.location.clone(),
                    });
                }
                Ok(self.add(TypeKind::Enum(EnumType {
                    name: Some(context.to_string()),
                    values,
                })))
            }
        }
    }

    /// `int[]?` -> Optional(Array(int)); unknown words become references.
    fn build_type_string(&mut self, text: &str) -> Result<TypeId, SemanticError> {
        if let Some(base) = text.strip_suffix('?') {
            let base = self.build_type_string(base)?;
            return Ok(self.add(TypeKind::Optional(base)));
        }
        if let Some(base) = text.strip_suffix("[]") {
            let base = self.build_type_string(base)?;
            return Ok(self.add(TypeKind::Array(base)));
        }
        if text.is_empty() {
            return Err(SemanticError::new("empty type name in schema"));
        }
        let kind = match PrimitiveKind::from_name(text) {
            Some(kind) => TypeKind::Primitive(kind),
            None => TypeKind::Reference(TypeReference {
                name: text.to_string(),
                target: None,
            }),
        };
        Ok(self.add(kind))
    }

    fn add(&mut self, kind: TypeKind) -> TypeId {
        self.root.add_type(kind, self.location.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ordered_map_keeps_insertion_order() {
        let mut map = OrderedMap::new();
        map.insert("b", 1);
        map.insert("a", 2);
        assert_eq!(map.insert("b", 3), Some(1));
        assert_eq!(map.keys().collect::<Vec<_>>(), ["b", "a"]);
        assert_eq!(map.get("b"), Some(&3));
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"b":3,"a":2}"#);
    }

    #[test]
    fn type_descriptions_deserialize_by_shape() {
        let table: TypeTable = serde_json::from_value(json!({
            "Id": "uuid?",
            "Color": ["red", ["custom", "ColorCustom"]],
            "User": { "id": "Id", "name": "string" }
        }))
        .unwrap();
        assert_eq!(table.get("Id"), Some(&TypeDescription::from("uuid?")));
        let Some(TypeDescription::Enum(members)) = table.get("Color") else {
            panic!("expected enum");
        };
        assert_eq!(
            members[1],
            EnumMemberDescription::WithData("custom".into(), "ColorCustom".into())
        );
        let Some(TypeDescription::Struct(fields)) = table.get("User") else {
            panic!("expected struct");
        };
        assert_eq!(fields.keys().collect::<Vec<_>>(), ["id", "name"]);
    }

    #[test]
    fn schema_uses_camel_case_keys() {
        let schema = Schema::default();
        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(
            value,
            json!({ "typeTable": {}, "functionTable": {}, "errors": [], "annotations": {} })
        );
    }

    #[test]
    fn annotation_descriptors() {
        let values = vec![
            AnnotationValue::Description("text".into()),
            AnnotationValue::Hidden,
            AnnotationValue::StatusCode(404),
            AnnotationValue::Arg { name: "id".into(), description: "the id".into() },
        ];
        assert_eq!(
            serde_json::to_value(&values).unwrap(),
            json!([
                { "type": "description", "value": "text" },
                { "type": "hidden" },
                { "type": "statusCode", "value": 404 },
                { "type": "arg", "value": { "name": "id", "description": "the id" } }
            ])
        );
    }

    #[test]
    fn type_strings_build_nested_modifiers() {
        let schema: Schema = serde_json::from_value(json!({
            "typeTable": { "Ids": "uuid[]?" },
            "functionTable": {},
            "errors": []
        }))
        .unwrap();
        let root = json_to_ast(&schema).unwrap();
        let def = root.type_definition("Ids").unwrap();
        assert!(matches!(root.kind(def.ty), TypeKind::Optional(_)));
        assert_eq!(root.type_name(def.ty), "uuid[]?");
        assert_eq!(root.errors.len(), 1);
    }

    #[test]
    fn unknown_reference_in_schema_is_rejected() {
        let schema: Schema = serde_json::from_value(json!({
            "typeTable": { "A": { "b": "Missing" } },
            "functionTable": {},
            "errors": []
        }))
        .unwrap();
        assert!(json_to_ast(&schema).is_err());
    }
}
