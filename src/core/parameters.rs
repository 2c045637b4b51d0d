// src/core/parameters.rs

use crate::constants::RECEIVER_NAMES;
use crate::models::{CallableDescriptor, ParameterDescriptor, Value};

/// Returns the parameters exposed on the command line, in declaration order.
///
/// Receiver parameters (`self`, `cls`) are skipped. Each descriptor carries its
/// default, or `None` when no default was declared.
pub fn extract_parameters(callable: &CallableDescriptor) -> impl Iterator<Item = &ParameterDescriptor> {
    callable
        .params
        .iter()
        .filter(|param| !is_receiver(&param.name))
}

/// Whether `name` denotes the receiver of a method.
pub fn is_receiver(name: &str) -> bool {
    RECEIVER_NAMES.contains(&name)
}

/// Renders a callable's signature for diagnostics, e.g. `add(a: int, b: int = 10)`.
pub fn render_signature(callable: &CallableDescriptor) -> String {
    let params: Vec<String> = callable.params.iter().map(render_parameter).collect();
    format!("{}({})", callable.name, params.join(", "))
}

fn render_parameter(param: &ParameterDescriptor) -> String {
    let mut rendered = param.name.clone();
    if let Some(annotation) = &param.annotation {
        rendered.push_str(&format!(": {}", annotation));
    }
    if let Some(default) = &param.default {
        rendered.push_str(&format!(" = {}", render_default(default)));
    }
    rendered
}

fn render_default(value: &Value) -> String {
    match value {
        Value::Str(s) => format!("{:?}", s),
        other => other.to_string(),
    }
}

// MARK: --- UNIT TESTS ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Annotation, Value};

    fn method() -> CallableDescriptor {
        CallableDescriptor::new("scale", |_| Ok(Value::None))
            .with_param(ParameterDescriptor::new("self"))
            .with_param(ParameterDescriptor::new("factor").typed(Annotation::float()))
            .with_param(
                ParameterDescriptor::new("label")
                    .typed(Annotation::str())
                    .with_default("x"),
            )
    }

    #[test]
    fn test_receiver_is_skipped() {
        let callable = method();
        let names: Vec<&str> = extract_parameters(&callable).map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["factor", "label"]);
    }

    #[test]
    fn test_defaults_are_carried() {
        let callable = method();
        let params: Vec<&ParameterDescriptor> = extract_parameters(&callable).collect();
        assert!(!params[0].has_default());
        assert_eq!(params[1].default, Some(Value::from("x")));
    }

    #[test]
    fn test_render_signature() {
        let callable = CallableDescriptor::new("add", |_| Ok(Value::None))
            .with_param(ParameterDescriptor::new("a").typed(Annotation::int()))
            .with_param(ParameterDescriptor::new("b").typed(Annotation::int()).with_default(10));
        assert_eq!(render_signature(&callable), "add(a: int, b: int = 10)");
        assert_eq!(
            render_signature(&method()),
            "scale(self, factor: float, label: str = \"x\")"
        );
    }
}
