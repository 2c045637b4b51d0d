// src/bin/cliform.rs

use anyhow::{Context, Result};
use cliform::{
    Annotation, App, CallableDescriptor, ClassDescriptor, Config, EnumDef, FieldDef, ModelDef,
    Namespace, ParameterDescriptor, RegistryState, Value,
    constants::CONFIG_FILENAME,
};
use colored::*;
use std::path::Path;
use std::sync::Arc;

const MODULE: &str = "demo";

/// Declares the demonstration commands.
fn build_registry() -> RegistryState {
    let color = Arc::new(EnumDef::native("Color", &[("BLUE", 1), ("RED", 2)]));
    let item = Arc::new(ModelDef::new(
        "Item",
        vec![
            FieldDef::optional("a", Annotation::str(), "good_one"),
            FieldDef::required("b", Annotation::str()),
        ],
    ));

    let mut registry = RegistryState::new();
    registry.add_namespace(MODULE, Namespace::new().with_enum(&color).with_model(&item));

    // --- math group ---
    registry
        .register(
            "math",
            CallableDescriptor::new("add", |call| Ok(Value::Int(call.int("a")? + call.int("b")?)))
                .in_module(MODULE)
                .with_doc("Adds two numbers.")
                .with_param(ParameterDescriptor::new("a").typed(Annotation::int()))
                .with_param(ParameterDescriptor::new("b").typed(Annotation::int())),
        )
        .register(
            "math",
            CallableDescriptor::new("sum_or_multiply", |call| {
                let (a, b) = (call.int("a_number")?, call.int("b_number")?);
                Ok(Value::Int(if call.bool("sums")? { a + b } else { a * b }))
            })
            .in_module(MODULE)
            .with_doc(
                "Sums or multiplies a and b\n\n\
                 :param a_number: the first one\n\
                 :param b_number: the second one\n\
                 :param sums: Sums when true, otherwise multiply",
            )
            .with_param(ParameterDescriptor::new("a_number").typed(Annotation::int()))
            .with_param(ParameterDescriptor::new("b_number").typed(Annotation::int()).with_default(10))
            .with_param(ParameterDescriptor::new("sums").typed(Annotation::bool()).with_default(true)),
        );

    // --- top-level commands ---
    registry
        .register(
            "",
            CallableDescriptor::new("paint", |call| Ok(call.get("color").cloned().unwrap_or(Value::None)))
                .in_module(MODULE)
                .with_doc("Echoes a color.")
                .with_param(ParameterDescriptor::new("color").typed(Annotation::text("Color"))),
        )
        .register(
            "",
            CallableDescriptor::new("total", |call| {
                let sum = call
                    .items("z")?
                    .iter()
                    .filter_map(|v| match v {
                        Value::Int(i) => Some(*i),
                        _ => None,
                    })
                    .sum::<i64>();
                Ok(Value::Int(sum))
            })
            .in_module(MODULE)
            .with_doc("Sums a list of integers.")
            .with_param(
                ParameterDescriptor::new("z")
                    .typed(Annotation::text("List[int]"))
                    .with_default(Value::List(vec![Value::Int(1), Value::Int(1)])),
            ),
        )
        .register(
            "",
            CallableDescriptor::new("greet", |call| {
                Ok(match call.get("name") {
                    Some(Value::Str(name)) => Value::from(format!("Hello, {}!", name)),
                    _ => Value::from("Hello!"),
                })
            })
            .in_module(MODULE)
            .with_param(
                ParameterDescriptor::new("name")
                    .typed(Annotation::text("Optional[str]"))
                    .with_default(Value::None),
            ),
        )
        .register(
            "",
            CallableDescriptor::new("print_item", |call| {
                let item = call.object("item")?.clone();
                Ok(Value::List(vec![Value::Object(item), Value::Int(call.int("count_b")?)]))
            })
            .in_module(MODULE)
            .with_doc("Prints an item.")
            .with_param(ParameterDescriptor::new("item").typed(Annotation::text("Item")))
            .with_param(ParameterDescriptor::new("count_b").typed(Annotation::int()).with_default(2)),
        );

    // --- class methods ---
    let base = Arc::new(ClassDescriptor::new("A").with_constructor(vec![
        ParameterDescriptor::new("self"),
        ParameterDescriptor::new("c"),
        ParameterDescriptor::new("d").with_default(1),
    ]));
    let derived = Arc::new(ClassDescriptor::new("B").inherits(base));
    registry.register_method(
        "shapes",
        derived,
        CallableDescriptor::new("printer", |call| {
            let receiver = call
                .receiver()
                .cloned()
                .context("printer needs a receiver")?;
            Ok(Value::List(vec![
                Value::Object(receiver),
                call.get("a").cloned().unwrap_or(Value::None),
            ]))
        })
        .in_module(MODULE)
        .with_param(ParameterDescriptor::new("self"))
        .with_param(ParameterDescriptor::new("a")),
    );

    registry
}

fn build_app() -> Result<App> {
    let config = Config::load_or_default(Path::new(CONFIG_FILENAME))?.with_env_overrides()?;
    let app = App::new(&build_registry(), config)?;
    log::debug!("Compiled {} command(s)", app.table().len());
    Ok(app)
}

/// The main entry point of the `cliform` demonstration program.
/// It sets up logging, compiles the declared commands and runs them,
/// with centralized error handling.
fn main() {
    env_logger::init();

    let code = match build_app() {
        Ok(app) => app.run(),
        Err(e) => {
            eprintln!("\n{}: {}", "Error".red().bold(), e);
            1
        }
    };
    std::process::exit(code);
}
