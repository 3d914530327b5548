//! # Value Converter Registry
//!
//! Maps the declared kind of a Protobuf field to the rule that renders one decoded value of
//! that field as a string, ready to be placed in an HTTP request.
//!
//! The rule is picked once per field with [`converter_for`] and then reused for every call.
//! Dispatch happens in this order:
//!
//! 1. **Map fields**: serialized as a compact JSON object whatever the value kind. Only string
//!    keys are accepted.
//! 2. **Message fields**: serialized as a JSON object (Swagger 2.0 `body` parameters).
//! 3. **Bool & numeric fields**: canonical, locale independent textual form.
//! 4. **String fields**: passed through.
//! 5. **Enum fields**: the ordinal indexes the enum list of the parameter metadata, since the
//!    Protobuf enum names are a lossy translation of the original REST values.
//! 6. **Bytes & group fields**: not supported.
//!
//! Map and enum conversions never fail a call: when the value cannot be rendered they log the
//! problem and produce an empty string.
use crate::parameter::ParameterMetadata;
use base64::{Engine, engine::general_purpose::STANDARD};
use prost_reflect::{FieldDescriptor, Kind, MapKey, Value};
use serde_json::{Map as JsonMap, Number, Value as JsonValue};
use tracing::{error, warn};

/// A field kind (or cardinality) that cannot be expressed as an HTTP parameter.
#[derive(Debug, thiserror::Error)]
#[error("Field '{field}' has unsupported type '{kind}'")]
pub struct UnsupportedTypeError {
    pub field: String,
    pub kind: &'static str,
}

/// A decoded value does not have the shape its field declares.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("Expected a {expected} value, found a {found} value")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// The conversion rule of a single field.
#[derive(Debug, Clone)]
pub enum Converter {
    /// String keyed map, rendered as a JSON object whatever the kind of its values.
    Map,
    /// Nested message, rendered as a JSON object.
    Message,
    /// Bool, integer and floating point values.
    Scalar,
    /// String values, rendered as-is.
    String,
    /// Enum ordinals, re-mapped through the parameter's declared enum values.
    Enum {
        parameter: String,
        values: Vec<JsonValue>,
    },
}

/// Picks the conversion rule for `field`, bound to the parameter described by `param`.
pub fn converter_for(
    field: &FieldDescriptor,
    param: &ParameterMetadata,
) -> Result<Converter, UnsupportedTypeError> {
    // Map fields are repeated message fields at the descriptor level, so they must be
    // recognized before looking at the kind.
    if field.is_map() {
        return Ok(Converter::Map);
    }

    if field.is_group() {
        return Err(UnsupportedTypeError {
            field: field.full_name().to_string(),
            kind: "group",
        });
    }

    match field.kind() {
        Kind::Message(_) => Ok(Converter::Message),
        Kind::Bool
        | Kind::Int32
        | Kind::Int64
        | Kind::Uint32
        | Kind::Uint64
        | Kind::Sint32
        | Kind::Sint64
        | Kind::Fixed32
        | Kind::Fixed64
        | Kind::Sfixed32
        | Kind::Sfixed64
        | Kind::Float
        | Kind::Double => Ok(Converter::Scalar),
        Kind::String => Ok(Converter::String),
        Kind::Enum(_) => {
            let values = param.enum_values.clone().unwrap_or_default();
            if values.is_empty() {
                warn!(
                    parameter = %param.name,
                    field = %field.full_name(),
                    "enum parameter declares no enum values, every value will be sent empty"
                );
            }
            Ok(Converter::Enum {
                parameter: param.name.clone(),
                values,
            })
        }
        Kind::Bytes => Err(UnsupportedTypeError {
            field: field.full_name().to_string(),
            kind: "bytes",
        }),
    }
}

impl Converter {
    /// Renders a single value.
    ///
    /// For repeated fields, `value` is one element of the list. For map fields it is the whole map.
    pub fn convert(&self, value: &Value) -> Result<String, ConvertError> {
        match self {
            Converter::Map => {
                let map = value.as_map().ok_or_else(|| mismatch("map", value))?;
                Ok(map_to_json(map))
            }
            Converter::Message => {
                let message = value.as_message().ok_or_else(|| mismatch("message", value))?;
                match serde_json::to_string(message) {
                    Ok(json) => Ok(json),
                    Err(err) => {
                        warn!(error = %err, "failed to serialize message to JSON, sending it empty");
                        Ok(String::new())
                    }
                }
            }
            Converter::Scalar => match value {
                Value::Bool(v) => Ok(v.to_string()),
                Value::I32(v) => Ok(v.to_string()),
                Value::I64(v) => Ok(v.to_string()),
                Value::U32(v) => Ok(v.to_string()),
                Value::U64(v) => Ok(v.to_string()),
                Value::F32(v) => Ok(v.to_string()),
                Value::F64(v) => Ok(v.to_string()),
                other => Err(mismatch("scalar", other)),
            },
            Converter::String => value
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| mismatch("string", value)),
            Converter::Enum { parameter, values } => {
                let ordinal = value
                    .as_enum_number()
                    .ok_or_else(|| mismatch("enum", value))?;
                Ok(enum_value(parameter, values, ordinal))
            }
        }
    }
}

fn enum_value(parameter: &str, values: &[JsonValue], ordinal: i32) -> String {
    let declared = usize::try_from(ordinal).ok().and_then(|i| values.get(i));

    match declared {
        Some(JsonValue::String(value)) => value.clone(),
        Some(other) => {
            error!(parameter, ordinal, value = %other, "enum value is not a string");
            String::new()
        }
        None => {
            error!(
                parameter,
                ordinal,
                declared = values.len(),
                "raw enum value out of bounds"
            );
            String::new()
        }
    }
}

fn map_to_json(map: &std::collections::HashMap<MapKey, Value>) -> String {
    let mut entries = Vec::with_capacity(map.len());
    for (key, value) in map {
        let MapKey::String(key) = key else {
            warn!(key = ?key, "non-string key in map field, sending it empty");
            return String::new();
        };
        entries.push((key, value));
    }
    // Map iteration order is random, sort to keep the output deterministic
    entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));

    let mut object = JsonMap::with_capacity(entries.len());
    for (key, value) in entries {
        match value_to_json(value) {
            Ok(json) => {
                object.insert(key.clone(), json);
            }
            Err(err) => {
                warn!(key = %key, error = %err, "failed to serialize map value to JSON, sending it empty");
                return String::new();
            }
        }
    }

    match serde_json::to_string(&JsonValue::Object(object)) {
        Ok(json) => json,
        Err(err) => {
            warn!(error = %err, "failed to serialize map to JSON, sending it empty");
            String::new()
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum JsonError {
    #[error("non-finite number '{0}'")]
    NonFinite(f64),
    #[error("{0} values have no plain JSON form")]
    Unrepresentable(&'static str),
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

/// Plain JSON form of a map value: numbers and enum ordinals stay numbers, bytes are base64.
fn value_to_json(value: &Value) -> Result<JsonValue, JsonError> {
    match value {
        Value::Bool(v) => Ok(JsonValue::Bool(*v)),
        Value::I32(v) => Ok(JsonValue::from(*v)),
        Value::I64(v) => Ok(JsonValue::from(*v)),
        Value::U32(v) => Ok(JsonValue::from(*v)),
        Value::U64(v) => Ok(JsonValue::from(*v)),
        // Widening the f32 directly would leak its binary noise (3.34 -> 3.3399999141693115)
        Value::F32(v) => v
            .to_string()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(JsonValue::Number)
            .ok_or(JsonError::NonFinite(f64::from(*v))),
        Value::F64(v) => Number::from_f64(*v)
            .map(JsonValue::Number)
            .ok_or(JsonError::NonFinite(*v)),
        Value::String(v) => Ok(JsonValue::String(v.clone())),
        // Enum names are not the REST values, the ordinal is the only faithful form
        Value::EnumNumber(n) => Ok(JsonValue::from(*n)),
        Value::Message(message) => Ok(serde_json::to_value(message)?),
        Value::List(items) => items
            .iter()
            .map(value_to_json)
            .collect::<Result<Vec<_>, _>>()
            .map(JsonValue::Array),
        Value::Bytes(v) => Ok(JsonValue::String(STANDARD.encode(v))),
        Value::Map(_) => Err(JsonError::Unrepresentable("nested map")),
    }
}

fn mismatch(expected: &'static str, found: &Value) -> ConvertError {
    ConvertError::TypeMismatch {
        expected,
        found: value_type_name(found),
    }
}

pub(crate) fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Bool(_) => "bool",
        Value::I32(_) => "int32",
        Value::I64(_) => "int64",
        Value::U32(_) => "uint32",
        Value::U64(_) => "uint64",
        Value::F32(_) => "float",
        Value::F64(_) => "double",
        Value::String(_) => "string",
        Value::Bytes(_) => "bytes",
        Value::EnumNumber(_) => "enum",
        Value::Message(_) => "message",
        Value::List(_) => "list",
        Value::Map(_) => "map",
    }
}
