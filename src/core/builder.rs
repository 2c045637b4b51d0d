// src/core/builder.rs

//! # Builder
//!
//! Turns the parameters of a callable into ordered [`ArgumentSpec`]s: the type
//! of each parameter is resolved, booleans that default to true are inverted
//! into `no_<name>` flags, structured-group parameters are expanded into one
//! flag per model field, and the constructor of a method's class contributes
//! its own spec list.

use crate::constants::INVERTED_PREFIX;
use crate::core::compiler::SchemaError;
use crate::core::docstring::parse_doc_params;
use crate::core::lookup::LookupTable;
use crate::core::parameters::extract_parameters;
use crate::core::resolver::TypeResolver;
use crate::models::{
    ArgumentSpec, CallableDescriptor, ClassDescriptor, ConstructorSchema, ElementType, EnumDef,
    EnumKind, EnumRepr, GroupBinding, GroupOrigin, ModelDef, TypeSpec, Value,
};
use std::sync::Arc;

/// Everything the builder produces for one command.
#[derive(Debug, Clone, Default)]
pub struct BuiltArguments {
    /// Method arguments in declaration order.
    pub specs: Vec<ArgumentSpec>,
    /// Constructor arguments, for methods of a class with a constructor.
    pub constructor: Option<ConstructorSchema>,
    /// Structured groups of both the constructor and the method.
    pub bindings: Vec<GroupBinding>,
}

/// Builds argument specs from callables.
#[derive(Debug, Clone, Copy)]
pub struct ArgumentSpecBuilder<'a> {
    resolver: TypeResolver<'a>,
}

impl<'a> ArgumentSpecBuilder<'a> {
    /// Creates a builder resolving textual annotations through `lookup`.
    pub fn new(lookup: &'a LookupTable) -> Self {
        Self {
            resolver: TypeResolver::new(lookup),
        }
    }

    /// Builds the specs of a callable and, when it is a method, of its class constructor.
    ///
    /// # Arguments
    ///
    /// * `callable` - The function or method exposed as a command.
    /// * `class` - The owning class of a method.
    ///
    /// # Returns
    ///
    /// The specs, or a `SchemaError` for unsupported unions and nested groups.
    pub fn build(
        &self,
        callable: &CallableDescriptor,
        class: Option<&ClassDescriptor>,
    ) -> Result<BuiltArguments, SchemaError> {
        let mut built = BuiltArguments::default();

        if let Some((owner, ctor)) = class.and_then(ClassDescriptor::find_constructor) {
            log::trace!("Building constructor specs of {} for {}", owner.name, callable.name);
            let mut specs = Vec::new();
            self.build_into(ctor, &mut specs, &mut built.bindings)?;
            built.constructor = Some(ConstructorSchema {
                class_name: owner.name.clone(),
                callable: Arc::clone(ctor),
                specs,
            });
        }

        self.build_into(callable, &mut built.specs, &mut built.bindings)?;
        Ok(built)
    }

    fn build_into(
        &self,
        callable: &CallableDescriptor,
        specs: &mut Vec<ArgumentSpec>,
        bindings: &mut Vec<GroupBinding>,
    ) -> Result<(), SchemaError> {
        let docs = parse_doc_params(&callable.doc);

        for param in extract_parameters(callable) {
            let type_spec = self
                .resolver
                .resolve(param.annotation.as_ref(), param.default.as_ref())?;

            if let ElementType::Group(model) = &type_spec.element
                && type_spec.container.is_none()
            {
                let model = Arc::clone(model);
                bindings.push(self.expand_group(&param.name, &model, specs)?);
                continue;
            }

            let doc = docs.get(&param.name).map(String::as_str).unwrap_or_default();
            specs.push(parameter_spec(&param.name, param.default.as_ref(), type_spec, doc));
        }
        Ok(())
    }

    /// One flag per model field; the group parameter itself never becomes a spec.
    fn expand_group(
        &self,
        param_name: &str,
        model: &Arc<ModelDef>,
        specs: &mut Vec<ArgumentSpec>,
    ) -> Result<GroupBinding, SchemaError> {
        let mut field_names = Vec::with_capacity(model.fields.len());

        for field in &model.fields {
            let default = field.default.as_ref().filter(|d| !d.is_none());
            let type_spec = self.resolver.resolve(field.annotation.as_ref(), default)?;
            if matches!(type_spec.element, ElementType::Group(_)) {
                return Err(SchemaError::NestedGroup {
                    param: param_name.to_string(),
                    field: field.name.clone(),
                });
            }

            let origin = GroupOrigin {
                param: param_name.to_string(),
                field: field.name.clone(),
            };
            specs.push(field_spec(&field.name, default, type_spec, origin));
            field_names.push(field.name.clone());
        }

        Ok(GroupBinding {
            param_name: param_name.to_string(),
            model: Arc::clone(model),
            field_names,
        })
    }
}

fn parameter_spec(name: &str, default: Option<&Value>, type_spec: TypeSpec, doc: &str) -> ArgumentSpec {
    if type_spec.is_bool() {
        return boolean_spec(name, default, type_spec, doc, None);
    }

    let help_text = help_text(&type_spec, default, doc);
    let parser_default = match (default, type_spec.container) {
        (Some(value), _) => Some(value.clone()),
        (None, Some(_)) => Some(Value::List(Vec::new())),
        (None, None) if type_spec.is_multi() => Some(Value::Dict(Vec::new())),
        (None, None) => None,
    };

    ArgumentSpec {
        flag_name: name.to_string(),
        param_name: name.to_string(),
        positional: default.is_none(),
        type_spec,
        default: parser_default,
        help_text,
        inverted_boolean: false,
        group_origin: None,
    }
}

fn field_spec(name: &str, default: Option<&Value>, type_spec: TypeSpec, origin: GroupOrigin) -> ArgumentSpec {
    if type_spec.is_bool() {
        return boolean_spec(name, default, type_spec, "", Some(origin));
    }

    ArgumentSpec {
        flag_name: name.to_string(),
        param_name: name.to_string(),
        positional: false,
        help_text: help_text(&type_spec, default, ""),
        type_spec,
        default: default.cloned(),
        inverted_boolean: false,
        group_origin: Some(origin),
    }
}

/// `--x` store-true switch, or `--no-x` for a boolean defaulting to true.
fn boolean_spec(
    name: &str,
    default: Option<&Value>,
    type_spec: TypeSpec,
    doc: &str,
    origin: Option<GroupOrigin>,
) -> ArgumentSpec {
    let inverted = matches!(default, Some(Value::Bool(true)));
    let flag_name = if inverted {
        format!("{}{}", INVERTED_PREFIX, name)
    } else {
        name.to_string()
    };

    ArgumentSpec {
        flag_name,
        param_name: name.to_string(),
        positional: false,
        // Help shows the declared default.
        help_text: help_text(&type_spec, default, doc),
        type_spec,
        default: Some(Value::Bool(false)),
        inverted_boolean: inverted,
        group_origin: origin,
    }
}

/// `|<type>| Default: <value> | <doc>`, the default part only when one is declared.
fn help_text(type_spec: &TypeSpec, default: Option<&Value>, doc: &str) -> String {
    let default_help = default
        .map(|value| format!("Default: {} | ", format_default(value, type_spec)))
        .unwrap_or_default();
    format!("|{}| {}{}", type_spec.type_name, default_help, doc)
        .trim_end()
        .to_string()
}

/// Renders a default for help text; wrapper enum values show their member names.
pub fn format_default(value: &Value, type_spec: &TypeSpec) -> String {
    match &type_spec.element {
        ElementType::Enum(def) if def.kind == EnumKind::Wrapper => wrapper_names(def, value).to_string(),
        _ => value.to_string(),
    }
}

fn wrapper_names(def: &EnumDef, value: &Value) -> Value {
    let rename = |items: &[Value]| items.iter().map(|item| wrapper_names(def, item)).collect();
    match value {
        Value::Int(i) => def
            .name_of(&EnumRepr::Int(*i))
            .map_or_else(|| value.clone(), Value::from),
        Value::List(items) => Value::List(rename(items)),
        Value::Set(items) => Value::Set(rename(items)),
        Value::Tuple(items) => Value::Tuple(rename(items)),
        other => other.clone(),
    }
}
