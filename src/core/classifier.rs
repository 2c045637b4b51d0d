// src/core/classifier.rs

//! Annotation shape classification.
//!
//! Textual annotations are parsed here (`X | None`, `Optional[X]`, `List[X]`,
//! `Dict[K, V]`, bare names) and their names resolved through the module's
//! [`LookupTable`]. Parsing never yields `Annotation::Unresolved`, so
//! classification of a parsed annotation always terminates.

use crate::core::compiler::SchemaError;
use crate::core::lookup::{LookupTable, Symbol};
use crate::models::{Annotation, ContainerKind, EnumDef, ModelDef, ScalarKind};
use std::sync::Arc;

/// The structural category of an annotation.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// `X | None`; carries `X`.
    Optional(Annotation),
    /// A homogeneous container and its declared element, if any.
    Container(ContainerKind, Option<Annotation>),
    /// A dict and its declared key/value types, if both are present.
    Dict(Option<(Annotation, Annotation)>),
    /// An enumeration.
    Enum(Arc<EnumDef>),
    /// A structured model.
    Group(Arc<ModelDef>),
    /// A primitive, the fallback for everything else.
    Scalar(ScalarKind),
}

/// Classifies an annotation.
///
/// # Arguments
///
/// * `annotation` - The declared annotation, possibly textual.
/// * `lookup` - The symbol table of the declaring module.
///
/// # Returns
///
/// The shape, or `SchemaError::UnsupportedUnion` for any union other than `X | None`.
pub fn classify(annotation: &Annotation, lookup: &LookupTable) -> Result<Shape, SchemaError> {
    match annotation {
        Annotation::Optional(inner) => Ok(Shape::Optional((**inner).clone())),
        Annotation::Union(members) => optional_member(members, lookup)
            .map(Shape::Optional)
            .ok_or_else(|| SchemaError::UnsupportedUnion {
                annotation: annotation.to_string(),
            }),
        Annotation::Container(kind, inner) => Ok(Shape::Container(*kind, inner.as_deref().cloned())),
        Annotation::Dict(args) => Ok(Shape::Dict(
            args.as_ref().map(|(k, v)| ((**k).clone(), (**v).clone())),
        )),
        Annotation::Enum(def) => Ok(Shape::Enum(Arc::clone(def))),
        Annotation::Group(model) => Ok(Shape::Group(Arc::clone(model))),
        Annotation::Scalar(kind) => Ok(Shape::Scalar(*kind)),
        Annotation::NoneType => Ok(Shape::Scalar(ScalarKind::Str)),
        Annotation::Unresolved(text) => classify(&parse_annotation(text, lookup), lookup),
    }
}

/// The non-absent member of a two-member union containing `None`.
fn optional_member(members: &[Annotation], lookup: &LookupTable) -> Option<Annotation> {
    let resolved: Vec<Annotation> = members
        .iter()
        .map(|member| match member {
            Annotation::Unresolved(text) => parse_annotation(text, lookup),
            other => other.clone(),
        })
        .collect();

    match resolved.as_slice() {
        [Annotation::NoneType, other] | [other, Annotation::NoneType]
            if !matches!(other, Annotation::NoneType) =>
        {
            Some(other.clone())
        }
        _ => None,
    }
}

/// Parses a textual annotation into a structured one, resolving names.
pub fn parse_annotation(text: &str, lookup: &LookupTable) -> Annotation {
    let text = text.trim().trim_matches(|c| c == '\'' || c == '"').trim();

    let members = split_top_level(text, '|');
    if members.len() > 1 {
        return Annotation::Union(
            members
                .iter()
                .map(|member| parse_annotation(member, lookup))
                .collect(),
        );
    }

    if text == "None" || text == "NoneType" {
        return Annotation::NoneType;
    }

    if let Some((head, args)) = split_subscript(text) {
        let head = head.rsplit('.').next().unwrap_or(head).trim();
        let args = split_top_level(args, ',');
        if let Some(parsed) = parse_generic(head, &args, lookup) {
            return parsed;
        }
    }

    match lookup.resolve(text) {
        Some(Symbol::Scalar(kind)) => Annotation::Scalar(kind),
        Some(Symbol::Enum(def)) => Annotation::Enum(def),
        Some(Symbol::Model(model)) => Annotation::Group(model),
        None => {
            let bare = text.rsplit('.').next().unwrap_or(text);
            if let Some(kind) = ContainerKind::from_name(bare) {
                Annotation::Container(kind, None)
            } else if is_dict_name(bare) {
                Annotation::Dict(None)
            } else {
                log::debug!("Unresolved annotation '{}', falling back to str", text);
                Annotation::Scalar(ScalarKind::Str)
            }
        }
    }
}

fn parse_generic(head: &str, args: &[String], lookup: &LookupTable) -> Option<Annotation> {
    if head == "Optional" {
        return match args {
            [inner] => Some(Annotation::optional(parse_annotation(inner, lookup))),
            _ => None,
        };
    }
    if head == "Union" {
        return Some(Annotation::Union(
            args.iter().map(|arg| parse_annotation(arg, lookup)).collect(),
        ));
    }
    if let Some(kind) = ContainerKind::from_name(head) {
        let inner = args
            .first()
            .filter(|arg| arg.trim() != "...")
            .map(|arg| Box::new(parse_annotation(arg, lookup)));
        return Some(Annotation::Container(kind, inner));
    }
    if is_dict_name(head) {
        return Some(match args {
            [key, value] => Annotation::dict(parse_annotation(key, lookup), parse_annotation(value, lookup)),
            _ => Annotation::Dict(None),
        });
    }
    None
}

fn is_dict_name(name: &str) -> bool {
    matches!(
        name.trim().to_ascii_lowercase().as_str(),
        "dict" | "mapping" | "hashmap" | "btreemap"
    )
}

/// Splits `Head[args]` into its head and the text between the brackets.
fn split_subscript(text: &str) -> Option<(&str, &str)> {
    let (head, rest) = text.split_once('[')?;
    let inner = rest.strip_suffix(']')?;
    Some((head, inner))
}

/// Splits on `sep` outside of brackets and parentheses.
fn split_top_level(text: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth: usize = 0;

    for c in text.chars() {
        match c {
            '[' | '(' => {
                depth += 1;
                current.push(c);
            }
            ']' | ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            c if c == sep && depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            c => current.push(c),
        }
    }
    parts.push(current.trim().to_string());
    parts
}

// MARK: --- UNIT TESTS ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lookup::Namespace;

    fn table() -> LookupTable {
        let color = Arc::new(EnumDef::native("Color", &[("RED", 1), ("BLUE", 2)]));
        let location = Arc::new(EnumDef::wrapper("Location", &[("HOME", 1)]));
        LookupTable::from_namespace(&Namespace::new().with_enum(&color).with_enum(&location))
    }

    #[test]
    fn test_optional_forms() {
        let lookup = table();
        for text in ["int | None", "None | int", "Optional[int]", "typing.Optional[int]"] {
            let shape = classify(&Annotation::text(text), &lookup).unwrap();
            assert_eq!(shape, Shape::Optional(Annotation::int()), "for {}", text);
        }
        let shape = classify(&Annotation::optional(Annotation::float()), &lookup).unwrap();
        assert_eq!(shape, Shape::Optional(Annotation::float()));
    }

    #[test]
    fn test_unsupported_unions() {
        let lookup = table();
        for text in ["int | str", "int | str | None", "None | None", "Union[int, float]"] {
            let err = classify(&Annotation::text(text), &lookup).unwrap_err();
            assert!(matches!(err, SchemaError::UnsupportedUnion { .. }), "for {}", text);
        }
    }

    #[test]
    fn test_container_forms() {
        let lookup = table();
        let cases = [
            ("List[int]", ContainerKind::List),
            ("list[int]", ContainerKind::List),
            ("Iterable[int]", ContainerKind::List),
            ("Set[int]", ContainerKind::Set),
            ("tuple[int, ...]", ContainerKind::Tuple),
        ];
        for (text, kind) in cases {
            let shape = classify(&Annotation::text(text), &lookup).unwrap();
            assert_eq!(shape, Shape::Container(kind, Some(Annotation::int())), "for {}", text);
        }
        let shape = classify(&Annotation::text("list"), &lookup).unwrap();
        assert_eq!(shape, Shape::Container(ContainerKind::List, None));
    }

    #[test]
    fn test_dict_forms() {
        let lookup = table();
        let shape = classify(&Annotation::text("Dict[str, int]"), &lookup).unwrap();
        assert_eq!(shape, Shape::Dict(Some((Annotation::str(), Annotation::int()))));
        let shape = classify(&Annotation::text("dict"), &lookup).unwrap();
        assert_eq!(shape, Shape::Dict(None));
        let shape = classify(&Annotation::text("dict[str]"), &lookup).unwrap();
        assert_eq!(shape, Shape::Dict(None));
    }

    #[test]
    fn test_enum_resolution_through_lookup() {
        let lookup = table();
        match classify(&Annotation::text("Color"), &lookup).unwrap() {
            Shape::Enum(def) => assert_eq!(def.name, "Color"),
            other => panic!("expected enum, got {:?}", other),
        }
        match classify(&Annotation::text("Location.V"), &lookup).unwrap() {
            Shape::Enum(def) => assert_eq!(def.name, "Location"),
            other => panic!("expected enum, got {:?}", other),
        }
        match classify(&Annotation::text("List[Color]"), &lookup).unwrap() {
            Shape::Container(ContainerKind::List, Some(Annotation::Enum(def))) => {
                assert_eq!(def.name, "Color");
            }
            other => panic!("expected list of enum, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_text_falls_back_to_str() {
        let shape = classify(&Annotation::text("SomethingElse"), &table()).unwrap();
        assert_eq!(shape, Shape::Scalar(ScalarKind::Str));
    }

    #[test]
    fn test_split_top_level_respects_brackets() {
        assert_eq!(
            split_top_level("Dict[str, int], List[int]", ','),
            vec!["Dict[str, int]".to_string(), "List[int]".to_string()]
        );
    }
}
