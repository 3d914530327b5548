//! # Value Extractor
//!
//! Reads one field out of a decoded message as a list of strings, the shape every
//! [`crate::placement::Placement`] consumes.
//!
//! Maps are repeated fields at the descriptor level, but they are converted as a single value:
//! a map becomes one JSON object, while a repeated field becomes one string per element.
use crate::convert::{ConvertError, Converter, value_type_name};
use prost_reflect::{DynamicMessage, FieldDescriptor};

/// Converts the value(s) of `field` in `message` using `converter`, preserving element order.
pub fn extract(
    message: &DynamicMessage,
    field: &FieldDescriptor,
    converter: &Converter,
) -> Result<Vec<String>, ConvertError> {
    let value = message.get_field(field);

    if field.is_list() {
        let items = value.as_list().ok_or(ConvertError::TypeMismatch {
            expected: "list",
            found: value_type_name(&value),
        })?;
        return items.iter().map(|item| converter.convert(item)).collect();
    }

    Ok(vec![converter.convert(&value)?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        convert::converter_for,
        parameter::ParameterMetadata,
        schema::{ImportPolicy, Schema},
    };
    use prost_reflect::MessageDescriptor;

    const TEST_PROTO: &str = r#"
        syntax = "proto3";

        message TestMessage {
            string singleValue = 1;
            repeated string repeatedValue = 2;
            map<string, int32> mapValue = 3;
            repeated int64 repeatedNumbers = 4;
        }
    "#;

    fn test_message() -> MessageDescriptor {
        Schema::from_source(TEST_PROTO, ImportPolicy::Sandboxed)
            .expect("Couldn't parse test fixture proto")
            .message("TestMessage")
            .expect("Couldn't find TestMessage in parsed proto")
    }

    fn extract_field(field_name: &str, body: serde_json::Value) -> Vec<String> {
        let desc = test_message();
        let field = desc.get_field_by_name(field_name).unwrap();
        let converter = converter_for(&field, &ParameterMetadata::new(field_name, "query")).unwrap();
        let message = DynamicMessage::deserialize(desc, body).unwrap();

        extract(&message, &field, &converter).unwrap()
    }

    #[test]
    fn test_singular_field_yields_one_value() {
        let result = extract_field("singleValue", serde_json::json!({ "singleValue": "foo" }));
        assert_eq!(result, vec!["foo"]);
    }

    #[test]
    fn test_repeated_field_yields_every_element_in_order() {
        let result = extract_field(
            "repeatedValue",
            serde_json::json!({ "repeatedValue": ["foo", "bar", "gaz"] }),
        );
        assert_eq!(result, vec!["foo", "bar", "gaz"]);

        let result = extract_field(
            "repeatedNumbers",
            serde_json::json!({ "repeatedNumbers": [3, 1, 2] }),
        );
        assert_eq!(result, vec!["3", "1", "2"]);
    }

    #[test]
    fn test_empty_repeated_field_yields_nothing() {
        let result = extract_field("repeatedValue", serde_json::json!({}));
        assert!(result.is_empty());
    }

    #[test]
    fn test_map_field_is_not_exploded() {
        let result = extract_field(
            "mapValue",
            serde_json::json!({ "mapValue": { "foo": 1, "bar": 2 } }),
        );
        assert_eq!(result, vec![r#"{"bar":2,"foo":1}"#]);
    }

    #[test]
    fn test_map_reaches_the_converter_whole() {
        let desc = test_message();
        let field = desc.get_field_by_name("mapValue").unwrap();
        let message =
            DynamicMessage::deserialize(desc, serde_json::json!({ "mapValue": { "foo": 1 } }))
                .unwrap();

        // A string converter sees the whole map and rejects it, rather than seeing entries
        let err = extract(&message, &field, &Converter::String).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::TypeMismatch {
                expected: "string",
                found: "map"
            }
        ));
    }
}
