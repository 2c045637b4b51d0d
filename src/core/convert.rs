// src/core/convert.rs

use crate::models::{ContainerKind, ElementType, ScalarKind, Value};
use thiserror::Error;

/// Invalid user input for an element converter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// Not an integer.
    #[error("invalid int value: '{0}'")]
    InvalidInt(String),
    /// Not a number.
    #[error("invalid float value: '{0}'")]
    InvalidFloat(String),
    /// Not a boolean word.
    #[error("invalid bool value: '{0}' (expected true/false, yes/no or 1/0)")]
    InvalidBool(String),
    /// Not a member name or value of the enumeration.
    #[error("invalid choice: '{input}' (choose from {choices})")]
    InvalidChoice {
        /// The rejected token.
        input: String,
        /// The accepted member names, comma separated.
        choices: String,
    },
    /// A dict entry without `=`.
    #[error("invalid dict entry: '{0}' (expected key=value)")]
    InvalidDictEntry(String),
    /// The element type cannot be read from a single token.
    #[error("'{0}' cannot be given directly on the command line")]
    Unsupported(String),
}

/// Converts one token to a scalar.
pub fn convert_scalar(kind: ScalarKind, input: &str) -> Result<Value, ConversionError> {
    match kind {
        ScalarKind::Str => Ok(Value::Str(input.to_string())),
        ScalarKind::Int => input
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| ConversionError::InvalidInt(input.to_string())),
        ScalarKind::Float => input
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| ConversionError::InvalidFloat(input.to_string())),
        ScalarKind::Bool => match input.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" | "on" => Ok(Value::Bool(true)),
            "false" | "no" | "n" | "0" | "off" => Ok(Value::Bool(false)),
            _ => Err(ConversionError::InvalidBool(input.to_string())),
        },
    }
}

/// Converts one token to the element type of an argument.
///
/// Dict entries (`key=value`) convert to a two-item tuple; [`collect_dict`]
/// folds them into a `Value::Dict`.
pub fn convert_element(element: &ElementType, input: &str) -> Result<Value, ConversionError> {
    match element {
        ElementType::Scalar(kind) => convert_scalar(*kind, input),
        ElementType::Enum(def) => def
            .find(input)
            .map(|member| def.value_of(member))
            .ok_or_else(|| ConversionError::InvalidChoice {
                input: input.to_string(),
                choices: def.names().join(", "),
            }),
        ElementType::Dict { key, value } => {
            let (raw_key, raw_value) = input
                .split_once('=')
                .ok_or_else(|| ConversionError::InvalidDictEntry(input.to_string()))?;
            Ok(Value::Tuple(vec![
                convert_element(key, raw_key)?,
                convert_element(value, raw_value)?,
            ]))
        }
        ElementType::Group(model) => Err(ConversionError::Unsupported(model.name.clone())),
    }
}

/// Folds converted `key=value` entries into a dict; later keys replace earlier ones.
pub fn collect_dict(entries: impl IntoIterator<Item = Value>) -> Value {
    let mut pairs: Vec<(Value, Value)> = Vec::new();
    for entry in entries {
        let Value::Tuple(items) = entry else {
            continue;
        };
        let mut items = items.into_iter();
        let (Some(key), Some(value)) = (items.next(), items.next()) else {
            continue;
        };
        match pairs.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => pairs.push((key, value)),
        }
    }
    Value::Dict(pairs)
}

/// Coerces a collected list into the target container.
///
/// Values that already have the target shape, and non-sequences, pass through
/// unchanged, so applying this twice is the same as applying it once.
pub fn resolve_container(value: Value, kind: ContainerKind) -> Value {
    match (value, kind) {
        (Value::List(items), ContainerKind::Set) => Value::set_from(items),
        (Value::List(items), ContainerKind::Tuple) => Value::Tuple(items),
        (other, _) => other,
    }
}

/// Builds a value parser closure for one element type.
pub fn parser_for(element: &ElementType) -> impl Fn(&str) -> Result<Value, ConversionError> + Clone + Send + Sync + 'static {
    let element = element.clone();
    move |input: &str| convert_element(&element, input)
}

// MARK: --- UNIT TESTS ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EnumDef, EnumRepr};
    use std::sync::Arc;

    #[test]
    fn test_scalars() {
        assert_eq!(convert_scalar(ScalarKind::Int, "42"), Ok(Value::Int(42)));
        assert_eq!(convert_scalar(ScalarKind::Float, "2.5"), Ok(Value::Float(2.5)));
        assert_eq!(convert_scalar(ScalarKind::Bool, "Yes"), Ok(Value::Bool(true)));
        assert_eq!(
            convert_scalar(ScalarKind::Int, "four"),
            Err(ConversionError::InvalidInt("four".to_string()))
        );
    }

    #[test]
    fn test_native_enum_by_name_and_value() {
        let color = Arc::new(EnumDef::native("Color", &[("RED", 1), ("BLUE", 2)]));
        let element = ElementType::Enum(color);
        match convert_element(&element, "BLUE").unwrap() {
            Value::Enum(member) => {
                assert_eq!(member.name, "BLUE");
                assert_eq!(member.repr, EnumRepr::Int(2));
            }
            other => panic!("expected enum, got {:?}", other),
        }
        match convert_element(&element, "1").unwrap() {
            Value::Enum(member) => assert_eq!(member.name, "RED"),
            other => panic!("expected enum, got {:?}", other),
        }
        let err = convert_element(&element, "GREEN").unwrap_err();
        assert_eq!(err.to_string(), "invalid choice: 'GREEN' (choose from RED, BLUE)");
    }

    #[test]
    fn test_wrapper_enum_yields_raw_value() {
        let location = Arc::new(EnumDef::wrapper("Location", &[("HOME", 1), ("AWAY", 2)]));
        let element = ElementType::Enum(location);
        assert_eq!(convert_element(&element, "AWAY"), Ok(Value::Int(2)));
    }

    #[test]
    fn test_dict_entries() {
        let element = ElementType::Dict {
            key: Box::new(ElementType::Scalar(ScalarKind::Str)),
            value: Box::new(ElementType::Scalar(ScalarKind::Int)),
        };
        let entries = ["a=1", "b=2", "a=3"]
            .iter()
            .map(|token| convert_element(&element, token).unwrap());
        assert_eq!(
            collect_dict(entries),
            Value::Dict(vec![
                (Value::from("a"), Value::Int(3)),
                (Value::from("b"), Value::Int(2)),
            ])
        );
        assert!(matches!(
            convert_element(&element, "missing"),
            Err(ConversionError::InvalidDictEntry(_))
        ));
    }

    #[test]
    fn test_container_coercion_is_idempotent() {
        let list = Value::List(vec![Value::Int(1), Value::Int(1), Value::Int(2)]);
        let once = resolve_container(list.clone(), ContainerKind::Set);
        let twice = resolve_container(once.clone(), ContainerKind::Set);
        assert_eq!(once, Value::Set(vec![Value::Int(1), Value::Int(2)]));
        assert_eq!(once, twice);

        let tuple = resolve_container(list.clone(), ContainerKind::Tuple);
        assert_eq!(resolve_container(tuple.clone(), ContainerKind::Tuple), tuple);
        assert_eq!(resolve_container(list.clone(), ContainerKind::List), list);
        assert_eq!(resolve_container(Value::None, ContainerKind::Set), Value::None);
    }
}
