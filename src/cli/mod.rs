// src/cli/mod.rs

//! # CLI runner
//!
//! Routes an argument vector to one compiled command, builds a `clap` parser
//! for just the commands the route needs, parses, dispatches and prints the
//! result. All failures are returned as `anyhow::Error`; [`report`] maps them
//! to an exit status.

pub mod output;
pub mod render;
pub mod router;

use crate::config::Config;
use crate::constants::{EXIT_FAILURE, EXIT_NO_COMMANDS};
use crate::core::compiler::{CommandTable, SchemaError};
use crate::core::dispatch;
use crate::core::parameters::render_signature;
use crate::models::{CommandSchema, Value};
use crate::state::{RegistryState, canonical_name};
use crate::timing::BlockTimer;
use clap::builder::styling::AnsiColor;
use clap::builder::Styles;
use clap::{ArgMatches, Command};
use colored::Colorize;
use router::Route;
use std::path::Path;
use thiserror::Error;

/// Failures of a run that are not parse errors.
#[derive(Error, Debug)]
pub enum RunError {
    /// The registry is empty.
    #[error("No commands have been registered.")]
    NoCommands,
    /// The invoked callable returned an error.
    #[error("Fault while calling {target} with the above arguments")]
    Fault {
        /// `module.signature` of the callable.
        target: String,
        /// The callable's error.
        #[source]
        source: anyhow::Error,
    },
    /// A failure collapsed into one line, for `--notraceback`.
    #[error("{message}")]
    Terse {
        /// The whole error chain on one line.
        message: String,
    },
}

/// What a successful run did.
#[derive(Debug)]
pub enum Outcome {
    /// A command ran and returned a value.
    Completed(Value),
    /// No command was selected; the rendered help was printed.
    Help(String),
    /// `--cli` printed the executable report.
    Info,
}

/// A compiled command-line program.
#[derive(Debug)]
pub struct App {
    table: CommandTable,
    config: Config,
}

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Yellow.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Green.on_default())
}

impl App {
    /// Compiles `registry` under `config`.
    pub fn new(registry: &RegistryState, config: Config) -> Result<Self, SchemaError> {
        let table = registry.compile(&config)?;
        Ok(Self { table, config })
    }

    /// The compiled commands.
    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    /// The active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs against the process arguments and returns the exit status.
    pub fn run(&self) -> i32 {
        match self.run_from(std::env::args()) {
            Ok(_) => 0,
            Err(e) => report(&e),
        }
    }

    /// Runs against `argv`, whose first element is the executable.
    ///
    /// # Arguments
    ///
    /// * `argv` - The full argument vector, executable included.
    ///
    /// # Returns
    ///
    /// The [`Outcome`], or an error: a `clap::Error` for usage problems and
    /// `--help`, a [`RunError`] or dispatch error otherwise.
    pub fn run_from<I, T>(&self, argv: I) -> anyhow::Result<Outcome>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let argv: Vec<String> = argv.into_iter().map(Into::into).collect();
        let executable = argv.first().cloned().unwrap_or_default();
        let program = self.program_name(&executable);
        let args = argv.get(1..).unwrap_or_default();

        if args.iter().any(|a| a == "--cli") {
            for line in output::cli_info_lines(&program, self.config.version.as_deref(), &executable) {
                println!("{}", line);
            }
            return Ok(Outcome::Info);
        }

        let parse_timer = BlockTimer::new("arg parsing", args.iter().any(|a| a == "--timing"));
        let route = router::route(&self.table, args);
        let rest = args.get(route.consumed()..).unwrap_or_default();
        let style = self.config.name_style;

        match route {
            Route::Empty => Err(RunError::NoCommands.into()),
            Route::Direct(schema) => {
                let bin = format!(
                    "{} {} {}",
                    program,
                    style.apply(schema.group.as_deref().unwrap_or_default()),
                    style.apply(&schema.name)
                );
                let cmd = render::mount(self.root(&bin, Some(&schema.description)), schema, style);
                let matches = parse(cmd, &bin, rest)?;
                self.invoke(schema, &matches, parse_timer)
            }
            Route::Single(schema) => {
                let cmd = render::mount(self.root(&program, Some(&schema.description)), schema, style);
                let matches = parse(cmd, &program, rest)?;
                self.invoke(schema, &matches, parse_timer)
            }
            Route::Group(group) => {
                let bin = format!("{} {}", program, style.apply(group));
                let mut cmd = self.root(&bin, None);
                for schema in self.table.in_group(group) {
                    cmd = cmd.subcommand(render::subcommand(schema, style));
                }
                let matches = parse(cmd.clone(), &bin, rest)?;
                match matches.subcommand() {
                    Some((name, sub)) => match self.table.get(Some(group), &canonical_name(name)) {
                        Some(schema) => self.invoke(schema, sub, parse_timer),
                        None => Ok(show_help(&mut cmd)),
                    },
                    None => Ok(show_help(&mut cmd)),
                }
            }
            Route::Tree => {
                let mut cmd = self.tree(&program);
                let matches = parse(cmd.clone(), &program, rest)?;
                let Some((name, sub)) = matches.subcommand() else {
                    return Ok(show_help(&mut cmd));
                };

                let name = canonical_name(name);
                if let Some(schema) = self.table.get(None, &name) {
                    return self.invoke(schema, sub, parse_timer);
                }
                match sub.subcommand() {
                    Some((leaf, leaf_matches)) => match self.table.get(Some(&name), &canonical_name(leaf)) {
                        Some(schema) => self.invoke(schema, leaf_matches, parse_timer),
                        None => Ok(show_help(&mut cmd)),
                    },
                    None => match cmd.find_subcommand_mut(style.apply(&name)) {
                        Some(group_cmd) => Ok(show_help(group_cmd)),
                        None => Ok(show_help(&mut cmd)),
                    },
                }
            }
        }
    }

    fn program_name(&self, executable: &str) -> String {
        self.config.program_name.clone().unwrap_or_else(|| {
            Path::new(executable)
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("cli")
                .to_string()
        })
    }

    fn root(&self, bin: &str, description: Option<&str>) -> Command {
        let mut cmd = Command::new(bin.to_string())
            .bin_name(bin.to_string())
            .styles(styles())
            .disable_help_subcommand(true)
            .args(render::meta_args());
        let about = self
            .config
            .about
            .clone()
            .or_else(|| description.filter(|d| !d.is_empty()).map(str::to_string));
        if let Some(about) = about {
            cmd = cmd.about(about);
        }
        cmd
    }

    /// The full tree: top-level commands, then one subcommand per group.
    fn tree(&self, program: &str) -> Command {
        let style = self.config.name_style;
        let mut cmd = self.root(program, None);

        for schema in self.table.ungrouped() {
            cmd = cmd.subcommand(render::subcommand(schema, style));
        }
        for group in self.table.groups() {
            let commands = self.table.in_group(group);
            let names: Vec<String> = commands.iter().map(|c| style.apply(&c.name)).collect();
            let mut group_cmd = Command::new(style.apply(group))
                .about(format!("SUBCOMMAND -> ({})", names.join(", ")))
                .disable_help_subcommand(true);
            if let Some(alternate) = style.alternate(group) {
                group_cmd = group_cmd.alias(alternate);
            }
            for schema in commands {
                group_cmd = group_cmd.subcommand(render::subcommand(schema, style));
            }
            cmd = cmd.subcommand(group_cmd);
        }
        cmd
    }

    fn invoke(&self, schema: &CommandSchema, matches: &ArgMatches, parse_timer: BlockTimer) -> anyhow::Result<Outcome> {
        let raw = render::meta_flag(matches, "raw");
        let timing = render::meta_flag(matches, "timing");
        let terse = render::meta_flag(matches, "notraceback") || self.config.terse_errors;
        log::debug!("Invoking '{}' (raw={}, timing={}, terse={})", schema.qualified_name(), raw, timing, terse);

        let parsed = render::extract(schema, matches);
        let invocation = dispatch::resolve(schema, parsed);
        drop(parse_timer);
        let invocation = invocation.map_err(|e| collapse(terse, e.into()))?;

        let mut call_timer = BlockTimer::new("function call success", timing);
        match schema.callable.call(invocation) {
            Ok(value) => {
                drop(call_timer);
                output::print_result(&value, raw);
                Ok(Outcome::Completed(value))
            }
            Err(source) => {
                call_timer.rename("function call exception");
                drop(call_timer);
                let fault = RunError::Fault {
                    target: fault_target(schema),
                    source,
                };
                Err(collapse(terse, fault.into()))
            }
        }
    }
}

fn parse(cmd: Command, bin: &str, rest: &[String]) -> Result<ArgMatches, clap::Error> {
    cmd.try_get_matches_from(std::iter::once(bin.to_string()).chain(rest.iter().cloned()))
}

fn show_help(cmd: &mut Command) -> Outcome {
    let help = cmd.render_help();
    println!("{}", help.ansi());
    Outcome::Help(help.to_string())
}

fn fault_target(schema: &CommandSchema) -> String {
    let signature = render_signature(&schema.callable);
    if schema.callable.module.is_empty() {
        signature
    } else {
        format!("{}.{}", schema.callable.module, signature)
    }
}

fn collapse(terse: bool, err: anyhow::Error) -> anyhow::Error {
    if terse {
        RunError::Terse {
            message: format!("{:#}", err),
        }
        .into()
    } else {
        err
    }
}

/// Prints `err` the way the runner does and returns the exit status for it.
pub fn report(err: &anyhow::Error) -> i32 {
    if let Some(clap_err) = err.downcast_ref::<clap::Error>() {
        if let Err(e) = clap_err.print() {
            log::debug!("Failed to print usage error: {}", e);
        }
        return clap_err.exit_code();
    }

    match err.downcast_ref::<RunError>() {
        Some(RunError::NoCommands) => {
            output::warn(&err.to_string());
            EXIT_NO_COMMANDS
        }
        Some(RunError::Terse { message }) => {
            output::warn(message);
            EXIT_FAILURE
        }
        _ => {
            eprintln!("\n{}: {:?}", "Error".red().bold(), err);
            EXIT_FAILURE
        }
    }
}

// MARK: --- UNIT TESTS ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Annotation, CallableDescriptor, ParameterDescriptor};

    fn add() -> CallableDescriptor {
        CallableDescriptor::new("add", |call| Ok(Value::Int(call.int("a")? + call.int("b")?)))
            .in_module("calc")
            .with_doc("Adds two numbers.")
            .with_param(ParameterDescriptor::new("a").typed(Annotation::int()))
            .with_param(ParameterDescriptor::new("b").typed(Annotation::int()).with_default(10))
    }

    fn sub() -> CallableDescriptor {
        CallableDescriptor::new("sub", |call| Ok(Value::Int(call.int("a")? - call.int("b")?)))
            .with_param(ParameterDescriptor::new("a").typed(Annotation::int()))
            .with_param(ParameterDescriptor::new("b").typed(Annotation::int()))
    }

    fn div() -> CallableDescriptor {
        CallableDescriptor::new("div", |call| {
            let b = call.int("b")?;
            if b == 0 {
                anyhow::bail!("division by zero");
            }
            Ok(Value::Int(call.int("a")? / b))
        })
        .with_param(ParameterDescriptor::new("a").typed(Annotation::int()))
        .with_param(ParameterDescriptor::new("b").typed(Annotation::int()))
    }

    fn math_app(config: Config) -> App {
        let mut registry = RegistryState::new();
        registry
            .register("math", add())
            .register("math", sub())
            .register("", div());
        App::new(&registry, config).unwrap()
    }

    fn completed(outcome: Outcome) -> Value {
        match outcome {
            Outcome::Completed(value) => value,
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_direct_two_token_dispatch() {
        let app = math_app(Config::default());
        let value = completed(app.run_from(["prog", "math", "add", "1", "2"]).unwrap());
        assert_eq!(value, Value::Int(3));
        let value = completed(app.run_from(["prog", "math", "add", "1"]).unwrap());
        assert_eq!(value, Value::Int(11));
    }

    #[test]
    fn test_group_listing() {
        let app = math_app(Config::default());
        match app.run_from(["prog", "math"]).unwrap() {
            Outcome::Help(help) => {
                assert!(help.contains("add"));
                assert!(help.contains("sub"));
                assert!(!help.contains("div"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_group_subcommand_through_listing_parser() {
        let app = math_app(Config::default());
        // Unknown second token falls back to the group parser, which rejects it.
        let err = app.run_from(["prog", "math", "mul"]).unwrap_err();
        assert!(err.downcast_ref::<clap::Error>().is_some());
    }

    #[test]
    fn test_tree_dispatch_and_listing() {
        let app = math_app(Config::default());
        let value = completed(app.run_from(["prog", "div", "9", "3"]).unwrap());
        assert_eq!(value, Value::Int(3));

        match app.run_from(["prog"]).unwrap() {
            Outcome::Help(help) => {
                assert!(help.contains("div"));
                assert!(help.contains("SUBCOMMAND -> (add, sub)"));
                assert!(help.contains("OPTIONAL CLI ARGUMENTS"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_single_command_mode() {
        let mut registry = RegistryState::new();
        registry.register("", add());
        let app = App::new(&registry, Config::default()).unwrap();
        let value = completed(app.run_from(["prog", "4", "-b", "1"]).unwrap());
        assert_eq!(value, Value::Int(5));
    }

    #[test]
    fn test_failure_is_a_fault() {
        let app = math_app(Config::default());
        let err = app.run_from(["prog", "div", "1", "0"]).unwrap_err();
        let fault = err.downcast_ref::<RunError>().unwrap();
        assert_eq!(
            fault.to_string(),
            "Fault while calling div(a: int, b: int) with the above arguments"
        );
        assert_eq!(report(&err), EXIT_FAILURE);
    }

    #[test]
    fn test_fault_target_includes_module() {
        let app = math_app(Config::default());
        let schema = app.table().get(Some("math"), "add").unwrap();
        assert_eq!(fault_target(schema), "calc.add(a: int, b: int = 10)");
    }

    #[test]
    fn test_notraceback_collapses_to_one_line() {
        let app = math_app(Config::default());
        let err = app.run_from(["prog", "div", "1", "0", "--notraceback"]).unwrap_err();
        match err.downcast_ref::<RunError>() {
            Some(RunError::Terse { message }) => {
                assert!(message.starts_with("Fault while calling div"));
                assert!(message.ends_with("division by zero"));
                assert!(!message.contains('\n'));
            }
            other => panic!("unexpected error {:?}", other),
        }

        let app = math_app(Config {
            terse_errors: true,
            ..Config::default()
        });
        let err = app.run_from(["prog", "div", "1", "0"]).unwrap_err();
        assert!(matches!(err.downcast_ref::<RunError>(), Some(RunError::Terse { .. })));
    }

    #[test]
    fn test_no_commands() {
        let app = App::new(&RegistryState::new(), Config::default()).unwrap();
        let err = app.run_from(["prog"]).unwrap_err();
        assert!(matches!(err.downcast_ref::<RunError>(), Some(RunError::NoCommands)));
        assert_eq!(report(&err), EXIT_NO_COMMANDS);
    }

    #[test]
    fn test_help_and_usage_errors() {
        let app = math_app(Config::default());
        let err = app.run_from(["prog", "math", "add", "--help"]).unwrap_err();
        let clap_err = err.downcast_ref::<clap::Error>().unwrap();
        assert_eq!(clap_err.kind(), clap::error::ErrorKind::DisplayHelp);
        assert_eq!(clap_err.exit_code(), 0);

        let err = app.run_from(["prog", "math", "add", "one"]).unwrap_err();
        assert_eq!(report(&err), 2);
    }

    #[test]
    fn test_command_named_like_a_group_fails_to_compile() {
        let mut registry = RegistryState::new();
        registry
            .register("", CallableDescriptor::new("math", |_| Ok(Value::None)))
            .register("math", add())
            .register("math", sub());
        let err = App::new(&registry, Config::default()).unwrap_err();
        assert!(matches!(err, SchemaError::NameClash { ref name } if name == "math"));
    }

    #[test]
    fn test_cli_info() {
        let app = math_app(Config::default());
        assert!(matches!(app.run_from(["prog", "--cli"]).unwrap(), Outcome::Info));
    }

    #[test]
    fn test_meta_flags_do_not_reach_the_callable() {
        let app = math_app(Config::default());
        let value = completed(app.run_from(["prog", "math", "sub", "5", "2", "--raw", "--timing"]).unwrap());
        assert_eq!(value, Value::Int(3));
    }
}
