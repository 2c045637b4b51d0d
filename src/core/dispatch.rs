// src/core/dispatch.rs

use crate::constants::RESERVED_KEYS;
use crate::core::convert::resolve_container;
use crate::core::parameters::extract_parameters;
use crate::models::{CommandSchema, ContainerKind, Instance, Invocation, Value};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Parsed command-line values keyed by `flag_name`.
pub type ParsedValues = BTreeMap<String, Value>;

/// Errors raised while turning parsed values into an invocation.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// A structured group is missing required fields.
    #[error("Invalid '{param}' ({model}): missing required field(s): {}", .missing.join(", "))]
    StructuredGroupValidation {
        /// The group parameter.
        param: String,
        /// The model name.
        model: String,
        /// Fields without a value or default.
        missing: Vec<String>,
    },
    /// The constructor of a method's class failed.
    #[error("Failed to initialize class {class}")]
    Constructor {
        /// The class whose constructor failed.
        class: String,
        /// The constructor's error.
        #[source]
        source: anyhow::Error,
    },
}

/// Maps parsed values back onto the callable's parameters.
///
/// Reserved keys are dropped, inverted booleans are renamed back and negated,
/// structured groups are rebuilt, the receiver of a method is constructed and
/// collected lists are coerced into their declared container.
pub fn resolve(schema: &CommandSchema, mut parsed: ParsedValues) -> Result<Invocation, DispatchError> {
    log::trace!("Resolving {} parsed value(s) for '{}'", parsed.len(), schema.qualified_name());

    for key in RESERVED_KEYS {
        parsed.remove(*key);
    }

    for spec in schema.all_specs().filter(|spec| spec.inverted_boolean) {
        if let Some(value) = parsed.remove(&spec.flag_name) {
            let restored = match value {
                Value::Bool(b) => Value::Bool(!b),
                other => other,
            };
            parsed.insert(spec.param_name.clone(), restored);
        }
    }

    let containers: HashMap<&str, ContainerKind> = schema
        .all_specs()
        .filter_map(|spec| spec.type_spec.container.map(|kind| (spec.param_name.as_str(), kind)))
        .collect();
    let coerce = |name: &str, value: Value| match containers.get(name) {
        Some(kind) => resolve_container(value, *kind),
        None => value,
    };

    for binding in &schema.group_bindings {
        let mut instance = Instance::new(binding.model.name.clone());
        let mut missing = Vec::new();

        for field_name in &binding.field_names {
            // The spec feeding this field; its key survives boolean inversion.
            let key = schema
                .all_specs()
                .find(|spec| {
                    spec.group_origin
                        .as_ref()
                        .is_some_and(|origin| origin.param == binding.param_name && &origin.field == field_name)
                })
                .map_or(field_name.as_str(), |spec| spec.param_name.as_str());
            let default = binding
                .model
                .fields
                .iter()
                .find(|field| &field.name == field_name)
                .and_then(|field| field.default.as_ref());

            match (parsed.remove(key), default) {
                (Some(value), _) => instance.fields.push((field_name.clone(), coerce(key, value))),
                (None, Some(default)) => instance.fields.push((field_name.clone(), default.clone())),
                (None, None) => missing.push(field_name.clone()),
            }
        }

        if !missing.is_empty() {
            return Err(DispatchError::StructuredGroupValidation {
                param: binding.param_name.clone(),
                model: binding.model.name.clone(),
                missing,
            });
        }
        log::debug!("Rebuilt group '{}' as {}", binding.param_name, instance);
        parsed.insert(binding.param_name.clone(), Value::Object(instance));
    }

    let mut positional = Vec::new();
    if let Some(ctor) = &schema.constructor {
        let mut keywords = BTreeMap::new();
        for param in extract_parameters(&ctor.callable) {
            if let Some(value) = parsed.remove(&param.name) {
                keywords.insert(param.name.clone(), coerce(&param.name, value));
            }
        }
        let receiver = ctor
            .callable
            .call(Invocation {
                positional: Vec::new(),
                keywords,
            })
            .map_err(|source| DispatchError::Constructor {
                class: ctor.class_name.clone(),
                source,
            })?;
        positional.push(receiver);
    }

    let keywords = parsed
        .into_iter()
        .map(|(name, value)| {
            let value = coerce(&name, value);
            (name, value)
        })
        .collect();

    Ok(Invocation { positional, keywords })
}

// MARK: --- UNIT TESTS ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NameStyle;
    use crate::core::compiler::compile_registry;
    use crate::models::{
        Annotation, CallableDescriptor, ClassDescriptor, FieldDef, ModelDef, ParameterDescriptor,
    };
    use crate::state::RegistryState;
    use std::sync::Arc;

    fn compile_one(registry: &RegistryState) -> CommandSchema {
        let table = compile_registry(registry, NameStyle::Kebab).unwrap();
        table.iter().next().unwrap().clone()
    }

    fn parsed(pairs: &[(&str, Value)]) -> ParsedValues {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_reserved_keys_are_stripped() {
        let mut registry = RegistryState::new();
        registry.register(
            "",
            CallableDescriptor::new("echo", |_| Ok(Value::None)).with_param(ParameterDescriptor::new("text")),
        );
        let schema = compile_one(&registry);
        let call = resolve(
            &schema,
            parsed(&[
                ("text", Value::from("hi")),
                ("raw", Value::Bool(true)),
                ("command", Value::from("echo")),
                ("timing", Value::Bool(false)),
            ]),
        )
        .unwrap();
        assert_eq!(call.keywords.len(), 1);
        assert_eq!(call.get("text"), Some(&Value::from("hi")));
    }

    #[test]
    fn test_boolean_inversion_symmetry() {
        let mut registry = RegistryState::new();
        registry.register(
            "",
            CallableDescriptor::new("report", |_| Ok(Value::None))
                .with_param(ParameterDescriptor::new("sums").typed(Annotation::bool()).with_default(true)),
        );
        let schema = compile_one(&registry);

        // Flag absent: parser default false, restored to the declared true.
        let call = resolve(&schema, parsed(&[("no_sums", Value::Bool(false))])).unwrap();
        assert_eq!(call.get("sums"), Some(&Value::Bool(true)));
        assert!(call.get("no_sums").is_none());

        // Flag given: false.
        let call = resolve(&schema, parsed(&[("no_sums", Value::Bool(true))])).unwrap();
        assert_eq!(call.get("sums"), Some(&Value::Bool(false)));
    }

    fn item_registry() -> RegistryState {
        let item = Arc::new(ModelDef::new(
            "Item",
            vec![
                FieldDef::required("a", Annotation::str()),
                FieldDef::optional("b", Annotation::int(), 1),
            ],
        ));
        let mut registry = RegistryState::new();
        registry.register(
            "",
            CallableDescriptor::new("store", |_| Ok(Value::None))
                .with_param(ParameterDescriptor::new("item").typed(Annotation::group(&item)))
                .with_param(ParameterDescriptor::new("force").with_default(false)),
        );
        registry
    }

    #[test]
    fn test_group_reconstruction() {
        let schema = compile_one(&item_registry());
        let call = resolve(
            &schema,
            parsed(&[
                ("a", Value::from("x")),
                ("b", Value::Int(3)),
                ("force", Value::Bool(false)),
            ]),
        )
        .unwrap();

        let item = call.object("item").unwrap();
        assert_eq!(item.type_name, "Item");
        assert_eq!(item.get("a"), Some(&Value::from("x")));
        assert_eq!(item.get("b"), Some(&Value::Int(3)));
        assert!(call.get("a").is_none());
        assert!(call.get("b").is_none());
        assert_eq!(call.get("force"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_group_uses_field_defaults() {
        let schema = compile_one(&item_registry());
        let call = resolve(&schema, parsed(&[("a", Value::from("x"))])).unwrap();
        assert_eq!(call.object("item").unwrap().get("b"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_group_follows_bound_fields() {
        let mut schema = compile_one(&item_registry());
        // Only the fields recorded in the binding are reassembled, in binding order.
        schema.group_bindings[0].field_names = vec!["b".to_string()];
        let call = resolve(&schema, parsed(&[("a", Value::from("x")), ("b", Value::Int(7))])).unwrap();

        let item = call.object("item").unwrap();
        assert_eq!(item.fields, vec![("b".to_string(), Value::Int(7))]);
        assert_eq!(call.get("a"), Some(&Value::from("x")));
    }

    #[test]
    fn test_inverted_group_field() {
        let flags = Arc::new(ModelDef::new(
            "Flags",
            vec![FieldDef::optional("color", Annotation::bool(), true)],
        ));
        let mut registry = RegistryState::new();
        registry.register(
            "",
            CallableDescriptor::new("show", |_| Ok(Value::None))
                .with_param(ParameterDescriptor::new("opts").typed(Annotation::group(&flags))),
        );
        let schema = compile_one(&registry);
        assert_eq!(schema.argument_specs[0].flag_name, "no_color");

        let call = resolve(&schema, parsed(&[("no_color", Value::Bool(true))])).unwrap();
        assert_eq!(call.object("opts").unwrap().get("color"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_group_validation_error() {
        let schema = compile_one(&item_registry());
        let err = resolve(&schema, parsed(&[("b", Value::Int(3))])).unwrap_err();
        match err {
            DispatchError::StructuredGroupValidation { param, model, missing } => {
                assert_eq!(param, "item");
                assert_eq!(model, "Item");
                assert_eq!(missing, vec!["a"]);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_constructor_receiver_is_prepended() {
        let class = Arc::new(ClassDescriptor::new("Counter").with_constructor(vec![
            ParameterDescriptor::new("self"),
            ParameterDescriptor::new("start").typed(Annotation::int()).with_default(0),
        ]));
        let mut registry = RegistryState::new();
        registry.register_method(
            "",
            class,
            CallableDescriptor::new("bump", |_| Ok(Value::None))
                .with_param(ParameterDescriptor::new("self"))
                .with_param(ParameterDescriptor::new("by").typed(Annotation::int()).with_default(1)),
        );
        let schema = compile_one(&registry);
        let call = resolve(&schema, parsed(&[("start", Value::Int(5)), ("by", Value::Int(2))])).unwrap();

        let receiver = call.receiver().unwrap();
        assert_eq!(receiver.type_name, "Counter");
        assert_eq!(receiver.get("start"), Some(&Value::Int(5)));
        assert!(call.get("start").is_none());
        assert_eq!(call.get("by"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_failing_constructor() {
        let class = Arc::new(ClassDescriptor::new("Broken").with_custom_constructor(
            CallableDescriptor::new("new", |_| Err(anyhow::anyhow!("no connection"))),
        ));
        let mut registry = RegistryState::new();
        registry.register_method("", class, CallableDescriptor::new("go", |_| Ok(Value::None)));
        let schema = compile_one(&registry);
        let err = resolve(&schema, ParsedValues::new()).unwrap_err();
        assert!(matches!(err, DispatchError::Constructor { ref class, .. } if class == "Broken"));
    }

    #[test]
    fn test_container_coercion() {
        let mut registry = RegistryState::new();
        registry.register(
            "",
            CallableDescriptor::new("uniq", |_| Ok(Value::None))
                .with_param(ParameterDescriptor::new("xs").typed(Annotation::set(Annotation::int())))
                .with_param(ParameterDescriptor::new("ys").typed(Annotation::tuple(Annotation::int())).with_default(Value::None)),
        );
        let schema = compile_one(&registry);
        let call = resolve(
            &schema,
            parsed(&[
                ("xs", Value::List(vec![Value::Int(2), Value::Int(2), Value::Int(1)])),
                ("ys", Value::None),
            ]),
        )
        .unwrap();
        assert_eq!(call.get("xs"), Some(&Value::Set(vec![Value::Int(2), Value::Int(1)])));
        assert_eq!(call.get("ys"), Some(&Value::None));
    }
}
