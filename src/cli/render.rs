// src/cli/render.rs

//! Renders compiled command schemas into `clap` commands and reads the
//! resulting matches back into parsed values.
//!
//! Each argument is first described by an [`ArgInstruction`], a plain
//! description of flags, converter, arity and default, and only then turned
//! into a `clap::Arg`. Defaults are never handed to `clap`; they are filled in
//! from the schema when matches are extracted, so an absent optional argument
//! without a default stays absent.

use crate::config::NameStyle;
use crate::constants::{META_FLAGS, META_HEADING};
use crate::core::convert::{collect_dict, parser_for};
use crate::core::dispatch::ParsedValues;
use crate::models::{ArgumentSpec, CommandSchema, ElementType, Value};
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};

/// How many tokens an argument takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nargs {
    /// Exactly one.
    One,
    /// Any number, collected into a list.
    ZeroOrMore,
}

/// What the parser does with the tokens of an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Plain conversion through the element converter.
    None,
    /// A switch storing `true` when present.
    StoreTrue,
    /// A switch storing `false` when present.
    StoreFalse,
    /// Enumeration member lookup by name or value.
    EnumLookup,
    /// `key=value` entries folded into a dict.
    DictLookup,
}

/// A parser-agnostic description of one argument.
#[derive(Debug, Clone)]
pub struct ArgInstruction {
    /// Key the parsed value is stored under.
    pub dest: String,
    /// `-x` and `--name` forms; empty for positionals.
    pub flags: Vec<String>,
    /// Hidden long aliases in the other name style.
    pub aliases: Vec<String>,
    /// What each token converts to.
    pub converter: ElementType,
    /// Arity.
    pub nargs: Nargs,
    /// Value used when the argument is not given.
    pub default: Option<Value>,
    /// Help text.
    pub help: String,
    /// Parser action.
    pub action: ActionKind,
    /// Help section.
    pub heading: Option<String>,
}

impl ArgInstruction {
    /// Whether the argument is positional.
    pub fn is_positional(&self) -> bool {
        self.flags.is_empty()
    }

    fn from_spec(spec: &ArgumentSpec, schema: &CommandSchema, style: NameStyle, heading: Option<String>) -> Self {
        let action = if spec.type_spec.is_bool() {
            ActionKind::StoreTrue
        } else {
            match spec.type_spec.element {
                ElementType::Enum(_) => ActionKind::EnumLookup,
                ElementType::Dict { .. } => ActionKind::DictLookup,
                _ => ActionKind::None,
            }
        };
        let aliases = if spec.positional {
            Vec::new()
        } else {
            style.alternate(&spec.flag_name).into_iter().collect()
        };

        Self {
            dest: spec.flag_name.clone(),
            flags: schema.flags.get(&spec.flag_name).cloned().unwrap_or_default(),
            aliases,
            converter: spec.type_spec.element.clone(),
            nargs: if spec.type_spec.is_multi() {
                Nargs::ZeroOrMore
            } else {
                Nargs::One
            },
            default: spec.default.clone(),
            help: spec.help_text.clone(),
            action,
            heading,
        }
    }
}

/// Instructions for every argument of a command: constructor first, then method.
pub fn instructions(schema: &CommandSchema, style: NameStyle) -> Vec<ArgInstruction> {
    let mut out = Vec::new();

    if let Some(ctor) = &schema.constructor {
        let heading = ctor.heading();
        out.extend(
            ctor.specs
                .iter()
                .map(|spec| ArgInstruction::from_spec(spec, schema, style, Some(heading.clone()))),
        );
    }

    for spec in &schema.argument_specs {
        let heading = spec.group_origin.as_ref().and_then(|origin| {
            schema
                .group_bindings
                .iter()
                .find(|binding| binding.param_name == origin.param)
                .map(|binding| binding.model.name.clone())
        });
        out.push(ArgInstruction::from_spec(spec, schema, style, heading));
    }

    demote_inner_multi_positionals(&mut out, style);
    out
}

/// Only the last positional may collect several tokens; earlier ones become long flags.
fn demote_inner_multi_positionals(instructions: &mut [ArgInstruction], style: NameStyle) {
    let last_positional = instructions.iter().rposition(ArgInstruction::is_positional);
    for (i, instr) in instructions.iter_mut().enumerate() {
        if instr.is_positional() && instr.nargs == Nargs::ZeroOrMore && Some(i) != last_positional {
            log::debug!("Positional '{}' is not last; exposing it as a flag", instr.dest);
            instr.flags.push(format!("--{}", style.apply(&instr.dest)));
        }
    }
}

/// Turns one instruction into a `clap` argument.
pub fn to_arg(instr: &ArgInstruction) -> Arg {
    let mut arg = Arg::new(instr.dest.clone()).help(instr.help.clone());
    if let Some(heading) = &instr.heading {
        arg = arg.help_heading(heading.clone());
    }

    for flag in &instr.flags {
        if let Some(long) = flag.strip_prefix("--") {
            arg = arg.long(long.to_string());
        } else if let Some(short) = flag.strip_prefix('-').and_then(|s| s.chars().next()) {
            arg = arg.short(short);
        }
    }
    for alias in &instr.aliases {
        arg = arg.alias(alias.clone());
    }

    match instr.action {
        ActionKind::StoreTrue => return arg.action(ArgAction::SetTrue),
        ActionKind::StoreFalse => return arg.action(ArgAction::SetFalse),
        ActionKind::None | ActionKind::EnumLookup | ActionKind::DictLookup => {}
    }

    arg = arg
        .value_parser(parser_for(&instr.converter))
        .action(ArgAction::Set)
        .value_name(instr.dest.to_ascii_uppercase());
    match instr.nargs {
        Nargs::One => arg.num_args(1).required(instr.is_positional()),
        Nargs::ZeroOrMore => arg.num_args(0..),
    }
}

/// The meta options every generated parser carries, inherited by subcommands.
pub fn meta_args() -> Vec<Arg> {
    META_FLAGS
        .iter()
        .map(|name| {
            let help = match *name {
                "notraceback" => "Print a single line instead of the error chain on failure",
                "raw" => "Print the result as is instead of as JSON",
                "timing" => "Report timings of argument parsing and the call",
                "cli" => "Print executable and version information and exit",
                _ => "",
            };
            Arg::new(*name)
                .long(*name)
                .action(ArgAction::SetTrue)
                .help(help)
                .help_heading(META_HEADING)
                .global(true)
        })
        .collect()
}

/// Adds the arguments of `schema` to `cmd`.
pub fn mount(mut cmd: Command, schema: &CommandSchema, style: NameStyle) -> Command {
    for instr in instructions(schema, style) {
        cmd = cmd.arg(to_arg(&instr));
    }
    cmd
}

/// A subcommand for `schema`, named in `style` with the other spelling as an alias.
pub fn subcommand(schema: &CommandSchema, style: NameStyle) -> Command {
    let mut cmd = Command::new(style.apply(&schema.name)).about(schema.description.clone());
    if let Some(alternate) = style.alternate(&schema.name) {
        cmd = cmd.alias(alternate);
    }
    mount(cmd, schema, style)
}

/// Whether a meta option was given.
pub fn meta_flag(matches: &ArgMatches, name: &str) -> bool {
    matches
        .try_get_one::<bool>(name)
        .ok()
        .flatten()
        .copied()
        .unwrap_or(false)
}

/// Reads the values of `schema`'s arguments, filling defaults for absent ones.
pub fn extract(schema: &CommandSchema, matches: &ArgMatches) -> ParsedValues {
    let mut parsed = ParsedValues::new();

    for spec in schema.all_specs() {
        let dest = spec.flag_name.as_str();
        let given = matches!(matches.value_source(dest), Some(ValueSource::CommandLine));

        let value = if spec.type_spec.is_bool() {
            Some(Value::Bool(meta_flag(matches, dest)))
        } else if !given {
            spec.default.clone()
        } else if spec.type_spec.is_multi() {
            let items: Vec<Value> = matches
                .try_get_many::<Value>(dest)
                .ok()
                .flatten()
                .map(|values| values.cloned().collect())
                .unwrap_or_default();
            Some(if spec.type_spec.container.is_some() {
                Value::List(items)
            } else {
                collect_dict(items)
            })
        } else {
            matches.try_get_one::<Value>(dest).ok().flatten().cloned()
        };

        if let Some(value) = value {
            parsed.insert(dest.to_string(), value);
        }
    }

    log::trace!("Extracted values: {:?}", parsed);
    parsed
}

// MARK: --- UNIT TESTS ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::compiler::compile_registry;
    use crate::models::{
        Annotation, CallableDescriptor, ClassDescriptor, EnumDef, FieldDef, ModelDef,
        ParameterDescriptor,
    };
    use crate::state::RegistryState;
    use std::sync::Arc;

    fn schema_of(callable: CallableDescriptor) -> CommandSchema {
        let mut registry = RegistryState::new();
        registry.register("", callable);
        compile_registry(&registry, NameStyle::Kebab)
            .unwrap()
            .iter()
            .next()
            .unwrap()
            .clone()
    }

    fn parse(schema: &CommandSchema, args: &[&str]) -> ParsedValues {
        let cmd = mount(Command::new("prog").args(meta_args()), schema, NameStyle::Kebab);
        let matches = cmd
            .try_get_matches_from(std::iter::once("prog").chain(args.iter().copied()))
            .unwrap();
        extract(schema, &matches)
    }

    fn calculator() -> CommandSchema {
        schema_of(
            CallableDescriptor::new("add", |_| Ok(Value::None))
                .with_param(ParameterDescriptor::new("a").typed(Annotation::int()))
                .with_param(ParameterDescriptor::new("b").typed(Annotation::int()).with_default(10))
                .with_param(ParameterDescriptor::new("dry_run").with_default(false)),
        )
    }

    #[test]
    fn test_defaults_round_trip() {
        let schema = calculator();
        let parsed = parse(&schema, &["1"]);
        assert_eq!(parsed["a"], Value::Int(1));
        assert_eq!(parsed["b"], Value::Int(10));
        assert_eq!(parsed["dry_run"], Value::Bool(false));

        let parsed = parse(&schema, &["1", "-b", "5", "--dry-run"]);
        assert_eq!(parsed["b"], Value::Int(5));
        assert_eq!(parsed["dry_run"], Value::Bool(true));
    }

    #[test]
    fn test_alternate_spelling_is_accepted() {
        let parsed = parse(&calculator(), &["1", "--dry_run"]);
        assert_eq!(parsed["dry_run"], Value::Bool(true));
    }

    #[test]
    fn test_invalid_input_is_a_usage_error() {
        let schema = calculator();
        let cmd = mount(Command::new("prog"), &schema, NameStyle::Kebab);
        let err = cmd.try_get_matches_from(["prog", "one"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_empty_list_default() {
        let schema = schema_of(
            CallableDescriptor::new("total", |_| Ok(Value::None))
                .with_param(ParameterDescriptor::new("items").typed(Annotation::list(Annotation::int()))),
        );
        assert_eq!(parse(&schema, &[])["items"], Value::List(Vec::new()));
        assert_eq!(
            parse(&schema, &["1", "2"])["items"],
            Value::List(vec![Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn test_optional_without_default_stays_absent() {
        let schema = schema_of(
            CallableDescriptor::new("greet", |_| Ok(Value::None)).with_param(
                ParameterDescriptor::new("name")
                    .typed(Annotation::text("str | None"))
                    .with_default(Value::None),
            ),
        );
        assert_eq!(parse(&schema, &[])["name"], Value::None);
        assert_eq!(parse(&schema, &["--name", "bo"])["name"], Value::from("bo"));
    }

    #[test]
    fn test_enum_and_dict_arguments() {
        let color = Arc::new(EnumDef::native("Color", &[("RED", 1), ("BLUE", 2)]));
        let schema = schema_of(
            CallableDescriptor::new("paint", |_| Ok(Value::None))
                .with_param(ParameterDescriptor::new("color").typed(Annotation::enumeration(&color)))
                .with_param(
                    ParameterDescriptor::new("tags")
                        .typed(Annotation::dict(Annotation::str(), Annotation::int()))
                        .with_default(Value::Dict(Vec::new())),
                ),
        );
        let instrs = instructions(&schema, NameStyle::Kebab);
        assert_eq!(instrs[0].action, ActionKind::EnumLookup);
        assert_eq!(instrs[1].action, ActionKind::DictLookup);
        assert_eq!(instrs[1].nargs, Nargs::ZeroOrMore);

        let parsed = parse(&schema, &["BLUE", "--tags", "a=1", "b=2"]);
        assert!(matches!(&parsed["color"], Value::Enum(member) if member.name == "BLUE"));
        assert_eq!(
            parsed["tags"],
            Value::Dict(vec![
                (Value::from("a"), Value::Int(1)),
                (Value::from("b"), Value::Int(2)),
            ])
        );
    }

    #[test]
    fn test_headings() {
        let item = Arc::new(ModelDef::new("Item", vec![FieldDef::required("a", Annotation::str())]));
        let class = Arc::new(
            ClassDescriptor::new("Store").with_constructor(vec![ParameterDescriptor::new("path").with_default(".")]),
        );
        let mut registry = RegistryState::new();
        registry.register_method(
            "",
            class,
            CallableDescriptor::new("put", |_| Ok(Value::None))
                .with_param(ParameterDescriptor::new("self"))
                .with_param(ParameterDescriptor::new("item").typed(Annotation::group(&item))),
        );
        let table = compile_registry(&registry, NameStyle::Kebab).unwrap();
        let schema = table.single().unwrap();

        let instrs = instructions(schema, NameStyle::Kebab);
        assert_eq!(instrs[0].heading.as_deref(), Some("INITIALIZE CLASS: Store()"));
        assert_eq!(instrs[0].flags, vec!["-p", "--path"]);
        assert_eq!(instrs[1].heading.as_deref(), Some("Item"));
        assert_eq!(instrs[1].flags, vec!["-a", "--a"]);
    }

    #[test]
    fn test_inner_multi_positional_becomes_flag() {
        let schema = schema_of(
            CallableDescriptor::new("tag", |_| Ok(Value::None))
                .with_param(ParameterDescriptor::new("labels").typed(Annotation::list(Annotation::str())))
                .with_param(ParameterDescriptor::new("target")),
        );
        let instrs = instructions(&schema, NameStyle::Kebab);
        assert_eq!(instrs[0].flags, vec!["--labels"]);
        assert!(instrs[1].is_positional());

        let parsed = parse(&schema, &["x", "--labels", "a", "b"]);
        assert_eq!(parsed["target"], Value::from("x"));
        assert_eq!(parsed["labels"], Value::List(vec![Value::from("a"), Value::from("b")]));
    }
}
