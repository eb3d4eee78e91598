//! Validate and transform values against the flat type table.
//!
//! [`decode`] turns wire JSON into [`Value`]s and [`encode`] goes the other
//! way. Both walk the type description recursively and fail on the first
//! value that does not fit, reporting the dotted path to it
//! (`getUser.args.filter.ids[2]`).

use std::collections::HashMap;
use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use num_bigint::BigInt;
use regex::Regex;
use serde_json::Value as Json;

use crate::ast::PrimitiveKind;
use crate::json::{
    EnumMemberDescription, FunctionDescription, FunctionTable, Schema, TypeDescription, TypeTable,
};
use crate::value::Value;

/// Longest rendering of an offending value kept in error messages.
const SNIPPET_LEN: usize = 100;

static UUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("uuid pattern")
});
static HEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9a-fA-F]{2})*$").expect("hex pattern"));
static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?\d+$").expect("integer pattern"));
static DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("decimal pattern"));
static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("date pattern"));
static DATETIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{4})-(\d{2})-(\d{2})T(\d{2}):(\d{2}):(\d{2})(?:\.(\d{1,9}))?(Z|[+-]\d{2}:\d{2})?$",
    )
    .expect("datetime pattern")
});

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Invalid value at '{path}': expected {expected}, found {found}")]
    Invalid {
        path: String,
        expected: String,
        found: String,
    },
    #[error("Unknown type at '{path}': {name}")]
    UnknownType { path: String, name: String },
    #[error("Alias cycle at '{path}': {name}")]
    AliasCycle { path: String, name: String },
    #[error("Unknown function: {0}")]
    UnknownFunction(String),
}

impl CodecError {
    pub fn path(&self) -> Option<&str> {
        match self {
            CodecError::Invalid { path, .. }
            | CodecError::UnknownType { path, .. }
            | CodecError::AliasCycle { path, .. } => Some(path),
            CodecError::UnknownFunction(_) => None,
        }
    }
}

/// Codec bound to one schema.
#[derive(Debug, Clone, Default)]
pub struct Codec {
    type_table: TypeTable,
    functions: FunctionTable,
}

impl Codec {
    pub fn new(type_table: TypeTable) -> Self {
        Codec {
            type_table,
            functions: FunctionTable::new(),
        }
    }

    pub fn from_schema(schema: Schema) -> Self {
        Codec {
            type_table: schema.type_table,
            functions: schema.function_table,
        }
    }

    pub fn type_table(&self) -> &TypeTable {
        &self.type_table
    }

    /// Decode a value of the type written as `ty` (`"User[]?"`).
    pub fn decode(&self, ty: &str, value: &Json) -> Result<Value, CodecError> {
        decode(&self.type_table, "", &TypeDescription::from(ty), value)
    }

    pub fn encode(&self, ty: &str, value: &Value) -> Result<Json, CodecError> {
        encode(&self.type_table, "", &TypeDescription::from(ty), value)
    }

    /// Decode the argument object of a call; missing arguments decode as
    /// `null`.
    pub fn decode_args(&self, function: &str, args: &Json) -> Result<HashMap<String, Value>, CodecError> {
        let description = self.function(function)?;
        let path = format!("{function}.args");
        let Json::Object(object) = args else {
            return Err(invalid(&path, "object", snippet(args)));
        };
        let mut decoded = HashMap::with_capacity(description.args.len());
        for (name, ty) in description.args.iter() {
            let value = object.get(name).unwrap_or(&Json::Null);
            decoded.insert(name.to_string(), decode(&self.type_table, &field_path(&path, name), ty, value)?);
        }
        Ok(decoded)
    }

    pub fn encode_args(&self, function: &str, args: &HashMap<String, Value>) -> Result<Json, CodecError> {
        let description = self.function(function)?;
        let path = format!("{function}.args");
        let mut object = serde_json::Map::with_capacity(description.args.len());
        for (name, ty) in description.args.iter() {
            let value = args.get(name).unwrap_or(&Value::Null);
            object.insert(name.to_string(), encode(&self.type_table, &field_path(&path, name), ty, value)?);
        }
        Ok(Json::Object(object))
    }

    pub fn encode_return(&self, function: &str, value: &Value) -> Result<Json, CodecError> {
        let description = self.function(function)?;
        encode(&self.type_table, &format!("{function}.ret"), &description.ret, value)
    }

    pub fn decode_return(&self, function: &str, value: &Json) -> Result<Value, CodecError> {
        let description = self.function(function)?;
        decode(&self.type_table, &format!("{function}.ret"), &description.ret, value)
    }

    fn function(&self, name: &str) -> Result<&FunctionDescription, CodecError> {
        self.functions
            .get(name)
            .ok_or_else(|| CodecError::UnknownFunction(name.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Decode wire JSON into a [`Value`] of type `ty`.
pub fn decode(table: &TypeTable, path: &str, ty: &TypeDescription, value: &Json) -> Result<Value, CodecError> {
    match ty {
        TypeDescription::Enum(members) => decode_enum(table, path, members, value),
        TypeDescription::Struct(fields) => {
            let Json::Object(object) = value else {
                return Err(invalid(path, "object", snippet(value)));
            };
            let mut decoded = HashMap::with_capacity(fields.len());
            for (name, field_ty) in fields.iter() {
                let field_value = object.get(name).unwrap_or(&Json::Null);
                decoded.insert(
                    name.to_string(),
                    decode(table, &field_path(path, name), field_ty, field_value)?,
                );
            }
            Ok(Value::Struct(decoded))
        }
        TypeDescription::Name(name) => decode_named(table, path, name, value),
    }
}

fn decode_named(table: &TypeTable, path: &str, name: &str, value: &Json) -> Result<Value, CodecError> {
    decode_alias(table, path, name, value, &mut Vec::new())
}

/// `aliases` holds the names followed since the last step that consumed
/// part of the input.
fn decode_alias(
    table: &TypeTable,
    path: &str,
    name: &str,
    value: &Json,
    aliases: &mut Vec<String>,
) -> Result<Value, CodecError> {
    if let Some(base) = name.strip_suffix('?') {
        if value.is_null() {
            return Ok(Value::Null);
        }
        return decode_alias(table, path, base, value, aliases);
    }
    if let Some(base) = name.strip_suffix("[]") {
        let Json::Array(items) = value else {
            return Err(invalid(path, name, snippet(value)));
        };
        return items
            .iter()
            .enumerate()
            .map(|(i, item)| decode_named(table, &format!("{path}[{i}]"), base, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List);
    }
    if let Some(kind) = PrimitiveKind::from_name(name) {
        return decode_primitive(path, kind, value);
    }
    match table.get(name) {
        Some(TypeDescription::Name(target)) => {
            follow_alias(path, name, aliases)?;
            decode_alias(table, path, target, value, aliases)
        }
        Some(ty) => decode(table, path, ty, value),
        None => Err(CodecError::UnknownType {
            path: path.to_string(),
            name: name.to_string(),
        }),
    }
}

fn decode_enum(
    table: &TypeTable,
    path: &str,
    members: &[EnumMemberDescription],
    value: &Json,
) -> Result<Value, CodecError> {
    match value {
        Json::String(tag) => {
            if members
                .iter()
                .any(|m| matches!(m, EnumMemberDescription::Plain(plain) if plain == tag))
            {
                return Ok(Value::String(tag.clone()));
            }
        }
        Json::Array(pair) if pair.len() == 2 => {
            if let Some(Json::String(tag)) = pair.first() {
                let data_ty = members.iter().find_map(|m| match m {
                    EnumMemberDescription::WithData(t, data) if t == tag => Some(data),
                    _ => None,
                });
                if let Some(data_ty) = data_ty {
                    let data = decode_named(table, path, data_ty, &pair[1])?;
                    return Ok(Value::Variant {
                        tag: tag.clone(),
                        data: Box::new(data),
                    });
                }
            }
        }
        _ => {}
    }
    Err(invalid(path, &one_of(members), snippet(value)))
}

fn decode_primitive(path: &str, kind: PrimitiveKind, value: &Json) -> Result<Value, CodecError> {
    let fail = || invalid(path, kind.name(), snippet(value));
    if value.is_null() && kind != PrimitiveKind::Void {
        return Err(fail());
    }
    let decoded = match kind {
        PrimitiveKind::String
        | PrimitiveKind::Email
        | PrimitiveKind::Html
        | PrimitiveKind::Xml
        | PrimitiveKind::Cpf
        | PrimitiveKind::Cnpj => Value::String(value.as_str().ok_or_else(fail)?.to_string()),
        PrimitiveKind::Bool => Value::Bool(value.as_bool().ok_or_else(fail)?),
        PrimitiveKind::Int => Value::Int(json_i32(value).ok_or_else(fail)?),
        PrimitiveKind::Uint => match json_i32(value) {
            Some(x) if x >= 0 => Value::Int(x),
            _ => return Err(fail()),
        },
        PrimitiveKind::Float => Value::Float(value.as_f64().ok_or_else(fail)?),
        PrimitiveKind::Money => Value::Int(json_integer(value).ok_or_else(fail)?),
        PrimitiveKind::BigInt => match value {
            Json::Number(n) => match (json_integer(value), n.as_u64()) {
                (Some(x), _) => Value::BigInt(BigInt::from(x)),
                (None, Some(x)) => Value::BigInt(BigInt::from(x)),
                _ => return Err(fail()),
            },
            Json::String(s) if INTEGER.is_match(s) => {
                Value::BigInt(s.parse::<BigInt>().map_err(|_| fail())?)
            }
            _ => return Err(fail()),
        },
        PrimitiveKind::Decimal => {
            let text = match value {
                Json::String(s) => s.clone(),
                Json::Number(n) => n.to_string(),
                _ => return Err(fail()),
            };
            if !DECIMAL.is_match(&text) {
                return Err(fail());
            }
            Value::Decimal(text)
        }
        PrimitiveKind::Date => {
            let text = value.as_str().ok_or_else(fail)?;
            Value::Date(parse_date(text).ok_or_else(fail)?)
        }
        PrimitiveKind::DateTime => {
            let text = value.as_str().ok_or_else(fail)?;
            Value::DateTime(parse_datetime(text).ok_or_else(fail)?)
        }
        PrimitiveKind::Uuid => {
            let text = value.as_str().filter(|s| UUID.is_match(s)).ok_or_else(fail)?;
            Value::String(text.to_ascii_lowercase())
        }
        PrimitiveKind::Hex => {
            let text = value.as_str().filter(|s| HEX.is_match(s)).ok_or_else(fail)?;
            Value::String(text.to_ascii_lowercase())
        }
        PrimitiveKind::Base64 => {
            let text = value.as_str().ok_or_else(fail)?;
            strict_base64(text).ok_or_else(fail)?;
            Value::String(text.to_string())
        }
        PrimitiveKind::Bytes => {
            let text = value.as_str().ok_or_else(fail)?;
            Value::Bytes(strict_base64(text).ok_or_else(fail)?)
        }
        PrimitiveKind::Url => {
            let text = value.as_str().ok_or_else(fail)?;
            Value::String(canonical_url(text).ok_or_else(fail)?)
        }
        PrimitiveKind::Json => Value::Json(value.clone()),
        PrimitiveKind::Void => Value::Null,
    };
    Ok(decoded)
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Encode a [`Value`] of type `ty` into wire JSON.
pub fn encode(table: &TypeTable, path: &str, ty: &TypeDescription, value: &Value) -> Result<Json, CodecError> {
    match ty {
        TypeDescription::Enum(members) => encode_enum(table, path, members, value),
        TypeDescription::Struct(fields) => {
            if !matches!(value, Value::Struct(_)) {
                return Err(invalid(path, "object", value_snippet(value)));
            }
            let mut object = serde_json::Map::with_capacity(fields.len());
            for (name, field_ty) in fields.iter() {
                let encoded = encode(table, &field_path(path, name), field_ty, value.field(name))?;
                object.insert(name.to_string(), encoded);
            }
            Ok(Json::Object(object))
        }
        TypeDescription::Name(name) => encode_named(table, path, name, value),
    }
}

fn encode_named(table: &TypeTable, path: &str, name: &str, value: &Value) -> Result<Json, CodecError> {
    encode_alias(table, path, name, value, &mut Vec::new())
}

fn encode_alias(
    table: &TypeTable,
    path: &str,
    name: &str,
    value: &Value,
    aliases: &mut Vec<String>,
) -> Result<Json, CodecError> {
    if let Some(base) = name.strip_suffix('?') {
        if value.is_null() {
            return Ok(Json::Null);
        }
        return encode_alias(table, path, base, value, aliases);
    }
    if let Some(base) = name.strip_suffix("[]") {
        let Value::List(items) = value else {
            return Err(invalid(path, name, value_snippet(value)));
        };
        return items
            .iter()
            .enumerate()
            .map(|(i, item)| encode_named(table, &format!("{path}[{i}]"), base, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Json::Array);
    }
    if let Some(kind) = PrimitiveKind::from_name(name) {
        return encode_primitive(path, kind, value);
    }
    match table.get(name) {
        Some(TypeDescription::Name(target)) => {
            follow_alias(path, name, aliases)?;
            encode_alias(table, path, target, value, aliases)
        }
        Some(ty) => encode(table, path, ty, value),
        None => Err(CodecError::UnknownType {
            path: path.to_string(),
            name: name.to_string(),
        }),
    }
}

fn encode_enum(
    table: &TypeTable,
    path: &str,
    members: &[EnumMemberDescription],
    value: &Value,
) -> Result<Json, CodecError> {
    match value {
        Value::String(tag)
            if members
                .iter()
                .any(|m| matches!(m, EnumMemberDescription::Plain(plain) if plain == tag)) =>
        {
            return Ok(Json::String(tag.clone()));
        }
        Value::Variant { tag, data } => {
            let data_ty = members.iter().find_map(|m| match m {
                EnumMemberDescription::WithData(t, data) if t == tag => Some(data),
                _ => None,
            });
            if let Some(data_ty) = data_ty {
                let data = encode_named(table, path, data_ty, data)?;
                return Ok(Json::Array(vec![Json::String(tag.clone()), data]));
            }
        }
        _ => {}
    }
    Err(invalid(path, &one_of(members), value_snippet(value)))
}

fn encode_primitive(path: &str, kind: PrimitiveKind, value: &Value) -> Result<Json, CodecError> {
    let fail = || invalid(path, kind.name(), value_snippet(value));
    if value.is_null() && kind != PrimitiveKind::Void {
        return Err(fail());
    }
    let encoded = match kind {
        PrimitiveKind::String
        | PrimitiveKind::Email
        | PrimitiveKind::Html
        | PrimitiveKind::Xml
        | PrimitiveKind::Cpf
        | PrimitiveKind::Cnpj => match value {
            Value::String(s) => Json::String(s.clone()),
            _ => return Err(fail()),
        },
        PrimitiveKind::Bool => Json::Bool(value.as_bool().ok_or_else(fail)?),
        PrimitiveKind::Int => Json::from(value_i32(value).ok_or_else(fail)?),
        PrimitiveKind::Uint => match value_i32(value) {
            Some(x) if x >= 0 => Json::from(x),
            _ => return Err(fail()),
        },
        PrimitiveKind::Float => {
            let x = value.as_f64().filter(|x| x.is_finite()).ok_or_else(fail)?;
            Json::from(x)
        }
        PrimitiveKind::Money => Json::from(value_integer(value).ok_or_else(fail)?),
        PrimitiveKind::BigInt => match value {
            Value::BigInt(x) => Json::String(x.to_string()),
            Value::Int(x) => Json::String(x.to_string()),
            Value::String(s) if INTEGER.is_match(s) => Json::String(s.clone()),
            _ => return Err(fail()),
        },
        PrimitiveKind::Decimal => {
            let text = match value {
                Value::Decimal(s) | Value::String(s) => s.clone(),
                Value::Int(x) => x.to_string(),
                Value::Float(x) => x.to_string(),
                _ => return Err(fail()),
            };
            if !DECIMAL.is_match(&text) {
                return Err(fail());
            }
            Json::String(text)
        }
        PrimitiveKind::Date => {
            let date = match value {
                Value::Date(date) => *date,
                Value::DateTime(datetime) => datetime.date(),
                Value::String(s) => parse_date(s).ok_or_else(fail)?,
                _ => return Err(fail()),
            };
            Json::String(date.format("%Y-%m-%d").to_string())
        }
        PrimitiveKind::DateTime => {
            let datetime = match value {
                Value::DateTime(datetime) => *datetime,
                Value::Date(date) => date.and_hms_opt(0, 0, 0).ok_or_else(fail)?,
                Value::String(s) => parse_datetime(s).ok_or_else(fail)?,
                _ => return Err(fail()),
            };
            Json::String(datetime.format("%Y-%m-%dT%H:%M:%S%.3f").to_string())
        }
        PrimitiveKind::Uuid => match value {
            Value::String(s) if UUID.is_match(s) => Json::String(s.to_ascii_lowercase()),
            _ => return Err(fail()),
        },
        PrimitiveKind::Hex => match value {
            Value::String(s) if HEX.is_match(s) => Json::String(s.to_ascii_lowercase()),
            _ => return Err(fail()),
        },
        PrimitiveKind::Base64 => match value {
            Value::String(s) if strict_base64(s).is_some() => Json::String(s.clone()),
            Value::Bytes(bytes) => Json::String(STANDARD.encode(bytes)),
            _ => return Err(fail()),
        },
        PrimitiveKind::Bytes => match value {
            Value::Bytes(bytes) => Json::String(STANDARD.encode(bytes)),
            _ => return Err(fail()),
        },
        PrimitiveKind::Url => match value {
            Value::String(s) => Json::String(canonical_url(s).ok_or_else(fail)?),
            _ => return Err(fail()),
        },
        PrimitiveKind::Json => match value {
            Value::Json(json) => json.clone(),
            other => other.to_json_lossy(),
        },
        PrimitiveKind::Void => Json::Null,
    };
    Ok(encoded)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn field_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

/// Record `name` on the current alias chain, failing if it is already there.
fn follow_alias(path: &str, name: &str, aliases: &mut Vec<String>) -> Result<(), CodecError> {
    if aliases.iter().any(|seen| seen == name) {
        return Err(CodecError::AliasCycle {
            path: path.to_string(),
            name: name.to_string(),
        });
    }
    aliases.push(name.to_string());
    Ok(())
}

fn invalid(path: &str, expected: &str, found: String) -> CodecError {
    CodecError::Invalid {
        path: path.to_string(),
        expected: expected.to_string(),
        found,
    }
}

fn one_of(members: &[EnumMemberDescription]) -> String {
    let tags: Vec<String> = members.iter().map(|m| format!("\"{}\"", m.tag())).collect();
    format!("one of {}", tags.join(", "))
}

fn snippet(value: &Json) -> String {
    let mut text = value.to_string();
    if let Some((cut, _)) = text.char_indices().nth(SNIPPET_LEN) {
        text.truncate(cut);
        text.push_str("...");
    }
    text
}

fn value_snippet(value: &Value) -> String {
    snippet(&value.to_json_lossy())
}

/// Integral JSON number, including floats with no fractional part.
fn json_integer(value: &Json) -> Option<i64> {
    let Json::Number(n) = value else {
        return None;
    };
    if let Some(x) = n.as_i64() {
        return Some(x);
    }
    float_integer(n.as_f64()?)
}

/// `x` as an `i64` when it is integral and inside the `i64` range. The upper
/// bound is exclusive: `i64::MAX as f64` rounds up to 2^63.
fn float_integer(x: f64) -> Option<i64> {
    const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
    (x.fract() == 0.0 && x >= -TWO_POW_63 && x < TWO_POW_63).then_some(x as i64)
}

fn json_i32(value: &Json) -> Option<i64> {
    json_integer(value).filter(|x| i32::try_from(*x).is_ok())
}

fn value_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Int(x) => Some(*x),
        Value::Float(x) => float_integer(*x),
        _ => None,
    }
}

fn value_i32(value: &Value) -> Option<i64> {
    value_integer(value).filter(|x| i32::try_from(*x).is_ok())
}

/// Bytes of a base64 string that re-encodes to exactly the same text.
fn strict_base64(text: &str) -> Option<Vec<u8>> {
    let bytes = STANDARD.decode(text).ok()?;
    (STANDARD.encode(&bytes) == text).then_some(bytes)
}

fn canonical_url(text: &str) -> Option<String> {
    url::Url::parse(text).ok().map(|url| url.to_string())
}

/// `YYYY-MM-DD`, or a full datetime truncated to its (UTC) day.
fn parse_date(text: &str) -> Option<NaiveDate> {
    match DATE.captures(text) {
        Some(caps) => NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        ),
        None => parse_datetime(text).map(|datetime| datetime.date()),
    }
}

/// ISO-8601 datetime with optional fraction and offset, converted to UTC and
/// truncated to milliseconds.
fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let caps = DATETIME.captures(text)?;
    let field = |i: usize| caps[i].parse::<u32>().ok();
    let date = NaiveDate::from_ymd_opt(caps[1].parse().ok()?, field(2)?, field(3)?)?;
    let nanos = match caps.get(7) {
        Some(fraction) => {
            let digits = fraction.as_str();
            let nanos = digits.parse::<u32>().ok()? * 10u32.pow(9 - digits.len() as u32);
            nanos - nanos % 1_000_000
        }
        None => 0,
    };
    let local = date.and_hms_nano_opt(field(4)?, field(5)?, field(6)?, nanos)?;
    let offset_minutes = match caps.get(8).map(|m| m.as_str()) {
        None | Some("Z") => 0,
        Some(offset) => {
            let sign = if offset.starts_with('-') { -1 } else { 1 };
            let hours: i64 = offset[1..3].parse().ok()?;
            let minutes: i64 = offset[4..6].parse().ok()?;
            sign * (hours * 60 + minutes)
        }
    };
    local.checked_sub_signed(TimeDelta::try_minutes(offset_minutes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> TypeTable {
        serde_json::from_value(json!({
            "Color": ["red", "green"],
            "Point": { "x": "int", "y": "int?" }
        }))
        .unwrap()
    }

    fn dec(ty: &str, value: Json) -> Result<Value, CodecError> {
        decode(&table(), "", &ty.into(), &value)
    }

    #[test]
    fn datetime_offsets_convert_to_utc() {
        let value = dec("datetime", json!("2024-03-01T01:30:00.5+02:00")).unwrap();
        let Value::DateTime(datetime) = value else {
            panic!("expected datetime");
        };
        assert_eq!(
            datetime.format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
            "2024-02-29T23:30:00.500"
        );
    }

    #[test]
    fn date_accepts_datetime_strings() {
        assert_eq!(
            dec("date", json!("2024-01-02T10:00:00Z")).unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
        );
        assert!(dec("date", json!("2024-13-01")).is_err());
    }

    #[test]
    fn int_accepts_integral_floats_only_in_range() {
        assert_eq!(dec("int", json!(4.0)).unwrap(), Value::Int(4));
        assert!(dec("int", json!(2147483648i64)).is_err());
        assert!(dec("int", json!("1")).is_err());
    }

    #[test]
    fn struct_paths_nest() {
        let err = decode(&table(), "f.args", &"Point[]".into(), &json!([{ "x": 1 }, { "x": "a" }]))
            .unwrap_err();
        assert_eq!(err.path(), Some("f.args[1].x"));
    }

    #[test]
    fn snippet_is_truncated() {
        let long = "x".repeat(500);
        let err = dec("int", json!(long)).unwrap_err();
        let CodecError::Invalid { found, .. } = err else {
            panic!("expected invalid");
        };
        assert!(found.chars().count() <= SNIPPET_LEN + 3);
    }

    #[test]
    fn unknown_type_is_reported() {
        assert!(matches!(
            dec("Nope", json!(1)),
            Err(CodecError::UnknownType { .. })
        ));
    }
}
