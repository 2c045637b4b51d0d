// src/core/resolver.rs

use crate::core::classifier::{Shape, classify};
use crate::core::compiler::SchemaError;
use crate::core::lookup::LookupTable;
use crate::models::{Annotation, ContainerKind, ElementType, ScalarKind, TypeSpec, Value};

/// Normalizes annotations and defaults into CLI-facing type specs.
#[derive(Debug, Clone, Copy)]
pub struct TypeResolver<'a> {
    lookup: &'a LookupTable,
}

impl<'a> TypeResolver<'a> {
    /// Creates a resolver over the declaring module's lookup table.
    pub fn new(lookup: &'a LookupTable) -> Self {
        Self { lookup }
    }

    /// Resolves the type of one parameter.
    ///
    /// A missing annotation is inferred from the default. A container or dict
    /// default decides the container kind over the annotation. Optional types
    /// resolve to their non-absent member.
    pub fn resolve(
        &self,
        annotation: Option<&Annotation>,
        default: Option<&Value>,
    ) -> Result<TypeSpec, SchemaError> {
        let annotation = match annotation {
            Some(annotation) => annotation.clone(),
            None => annotation_of(default),
        };
        let shape = self.classify_required(&annotation)?;

        if let Some(Value::Dict(pairs)) = default {
            let declared = match shape {
                Shape::Dict(args) => args,
                _ => None,
            };
            return self.dict_spec(declared, pairs.first());
        }

        if let Some(kind) = default.and_then(Value::container_kind) {
            let declared = match shape {
                Shape::Container(_, inner) => inner,
                _ => None,
            };
            let first = default.and_then(Value::items).and_then(<[Value]>::first);
            return self.container_spec(kind, declared.as_ref(), first);
        }

        match shape {
            Shape::Container(kind, inner) => self.container_spec(kind, inner.as_ref(), None),
            Shape::Dict(args) => self.dict_spec(args, None),
            Shape::Enum(def) => Ok(TypeSpec {
                type_name: def.name.clone(),
                element: ElementType::Enum(def),
                container: None,
            }),
            Shape::Group(model) => Ok(TypeSpec {
                type_name: model.name.clone(),
                element: ElementType::Group(model),
                container: None,
            }),
            Shape::Scalar(kind) => Ok(scalar_spec(kind)),
            Shape::Optional(_) => Ok(scalar_spec(ScalarKind::Str)),
        }
    }

    /// Classifies, peeling `Optional` layers until a concrete shape remains.
    fn classify_required(&self, annotation: &Annotation) -> Result<Shape, SchemaError> {
        let mut shape = classify(annotation, self.lookup)?;
        while let Shape::Optional(inner) = shape {
            shape = classify(&inner, self.lookup)?;
        }
        Ok(shape)
    }

    /// Element type of a declared container member.
    fn element_of(&self, annotation: &Annotation) -> Result<ElementType, SchemaError> {
        Ok(match self.classify_required(annotation)? {
            Shape::Enum(def) => ElementType::Enum(def),
            Shape::Scalar(kind) => ElementType::Scalar(kind),
            other => {
                log::debug!("Unsupported container element {:?}, using str", other);
                ElementType::Scalar(ScalarKind::Str)
            }
        })
    }

    fn container_spec(
        &self,
        kind: ContainerKind,
        declared: Option<&Annotation>,
        first_default: Option<&Value>,
    ) -> Result<TypeSpec, SchemaError> {
        let declared = declared.map(|a| self.element_of(a)).transpose()?;
        let element = match (declared, first_default) {
            // Wrapper defaults are raw integers; the declared enum still decides.
            (Some(ElementType::Enum(def)), _) => ElementType::Enum(def),
            (_, Some(value)) => element_of_value(value),
            (Some(element), None) => element,
            (None, None) => ElementType::Scalar(ScalarKind::Str),
        };
        Ok(TypeSpec {
            type_name: format!("1 or more of: {}", element.display_name()),
            element,
            container: Some(kind),
        })
    }

    fn dict_spec(
        &self,
        declared: Option<(Annotation, Annotation)>,
        first_default: Option<&(Value, Value)>,
    ) -> Result<TypeSpec, SchemaError> {
        let (key, value) = match (declared, first_default) {
            (Some((key, value)), _) => (self.element_of(&key)?, self.element_of(&value)?),
            (None, Some((key, value))) => (element_of_value(key), element_of_value(value)),
            (None, None) => (
                ElementType::Scalar(ScalarKind::Str),
                ElementType::Scalar(ScalarKind::Str),
            ),
        };
        let element = ElementType::Dict {
            key: Box::new(key),
            value: Box::new(value),
        };
        Ok(TypeSpec {
            type_name: element.display_name(),
            element,
            container: None,
        })
    }
}

fn scalar_spec(kind: ScalarKind) -> TypeSpec {
    TypeSpec {
        element: ElementType::Scalar(kind),
        type_name: kind.name().to_string(),
        container: None,
    }
}

/// The annotation a default value implies when none is declared.
pub fn annotation_of(default: Option<&Value>) -> Annotation {
    match default {
        None | Some(Value::None | Value::Str(_) | Value::Object(_)) => Annotation::str(),
        Some(Value::Bool(_)) => Annotation::bool(),
        Some(Value::Int(_)) => Annotation::int(),
        Some(Value::Float(_)) => Annotation::float(),
        Some(Value::List(_)) => Annotation::Container(ContainerKind::List, None),
        Some(Value::Set(_)) => Annotation::Container(ContainerKind::Set, None),
        Some(Value::Tuple(_)) => Annotation::Container(ContainerKind::Tuple, None),
        Some(Value::Dict(_)) => Annotation::Dict(None),
        Some(Value::Enum(member)) => Annotation::Enum(member.def.clone()),
    }
}

fn element_of_value(value: &Value) -> ElementType {
    match value {
        Value::Int(_) => ElementType::Scalar(ScalarKind::Int),
        Value::Float(_) => ElementType::Scalar(ScalarKind::Float),
        Value::Bool(_) => ElementType::Scalar(ScalarKind::Bool),
        Value::Enum(member) => ElementType::Enum(member.def.clone()),
        _ => ElementType::Scalar(ScalarKind::Str),
    }
}
