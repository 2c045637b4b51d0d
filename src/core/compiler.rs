//! # Compiler
//!
//! This module compiles declared commands into [`CommandSchema`]s. Each command
//! is compiled independently with its own [`FlagAllocator`], so a whole
//! registry is compiled in parallel with `rayon` and collected into an
//! immutable [`CommandTable`] once declaration has ended.

use crate::{
    config::NameStyle,
    constants::RESERVED_KEYS,
    core::{
        abbrev::FlagAllocator,
        builder::{ArgumentSpecBuilder, BuiltArguments},
        docstring,
        lookup::LookupTable,
    },
    models::{CallableDescriptor, CommandSchema},
    state::{CommandDeclaration, RegistryState},
};
use rayon::prelude::*;
use std::{
    collections::{BTreeSet, HashSet},
    sync::Arc,
};
use thiserror::Error;

/// Represents errors that can occur while compiling a command schema.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// A union other than `X | None`.
    #[error("Unsupported union '{annotation}': only `X | None` is allowed")]
    UnsupportedUnion {
        /// The rendered annotation.
        annotation: String,
    },
    /// A structured group nested inside another one.
    #[error("Cannot use a nested group: field '{field}' of parameter '{param}'")]
    NestedGroup {
        /// The outer group parameter.
        param: String,
        /// The field holding the inner group.
        field: String,
    },
    /// Two arguments of one command share a flag name.
    #[error("Duplicate flag '{flag}'")]
    DuplicateFlag {
        /// The colliding canonical flag name.
        flag: String,
    },
    /// An argument uses a name taken by the runner.
    #[error("Parameter name '{name}' is reserved")]
    ReservedName {
        /// The reserved name.
        name: String,
    },
    /// A top-level command shares its name with a command group.
    #[error("Command '{name}' has the same name as a command group")]
    NameClash {
        /// The clashing name.
        name: String,
    },
    /// Any of the above, tagged with the command it was raised for.
    #[error("Failed to compile command '{command}': {source}")]
    Command {
        /// Qualified command name.
        command: String,
        /// The underlying error.
        #[source]
        source: Box<SchemaError>,
    },
}

impl SchemaError {
    /// The innermost error, without command context.
    pub fn root(&self) -> &Self {
        match self {
            SchemaError::Command { source, .. } => source.root(),
            other => other,
        }
    }
}

// --- PUBLIC COMPILER API ---

/// Assembles built arguments into a command schema and allocates its flags.
///
/// # Arguments
///
/// * `group` - The owning command group, if any.
/// * `name` - The command name.
/// * `callable` - The callable the command invokes.
/// * `built` - The specs produced by the builder.
/// * `style` - The flag spelling.
///
/// # Returns
///
/// A `Result` containing the schema, or a `SchemaError` when two arguments
/// share a flag name or an argument uses a reserved name.
pub fn assemble(
    group: Option<&str>,
    name: &str,
    callable: Arc<CallableDescriptor>,
    built: BuiltArguments,
    style: NameStyle,
) -> Result<CommandSchema, SchemaError> {
    let constructor_specs = built.constructor.iter().flat_map(|ctor| ctor.specs.iter());
    let mut seen = HashSet::new();
    for spec in constructor_specs.clone().chain(built.specs.iter()) {
        if spec.flag_name == "help" || RESERVED_KEYS.contains(&spec.flag_name.as_str()) {
            return Err(SchemaError::ReservedName {
                name: spec.flag_name.clone(),
            });
        }
        if !seen.insert(spec.flag_name.as_str()) {
            return Err(SchemaError::DuplicateFlag {
                flag: spec.flag_name.clone(),
            });
        }
    }

    // Constructor flags are handed out first, on the same allocator.
    let flags = FlagAllocator::new(style).allocate(constructor_specs.chain(built.specs.iter()));

    Ok(CommandSchema {
        name: name.to_string(),
        group: group.map(str::to_string),
        description: docstring::summary(&callable.doc),
        argument_specs: built.specs,
        constructor: built.constructor,
        group_bindings: built.bindings,
        flags,
        callable,
    })
}

/// Compiles one declared command.
pub fn compile_command(
    declaration: &CommandDeclaration,
    lookup: &LookupTable,
    style: NameStyle,
) -> Result<CommandSchema, SchemaError> {
    let qualified = declaration.qualified_name();
    log::trace!("Compiling command '{}'", qualified);

    let wrap = |source: SchemaError| SchemaError::Command {
        command: qualified.clone(),
        source: Box::new(source),
    };

    let built = ArgumentSpecBuilder::new(lookup)
        .build(&declaration.callable, declaration.class.as_deref())
        .map_err(wrap)?;
    assemble(
        declaration.group.as_deref(),
        &declaration.name,
        Arc::clone(&declaration.callable),
        built,
        style,
    )
    .map_err(wrap)
}

/// Compiles every declared command in parallel.
///
/// # Arguments
///
/// * `registry` - The finished declaration table.
/// * `style` - The flag spelling.
///
/// # Returns
///
/// The compiled table, or the first `SchemaError` encountered.
pub fn compile_registry(registry: &RegistryState, style: NameStyle) -> Result<CommandTable, SchemaError> {
    let tables = registry.lookup_tables();
    let empty = LookupTable::default();

    let commands = registry
        .declarations()
        .par_iter()
        .map(|declaration| {
            let lookup = tables
                .get(&declaration.callable.module)
                .map_or(&empty, Arc::as_ref);
            compile_command(declaration, lookup, style)
        })
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!("Compiled {} command(s)", commands.len());
    let table = CommandTable::new(commands);
    check_name_clashes(&table)?;
    Ok(table)
}

/// A top-level command named like a group could never be routed to.
fn check_name_clashes(table: &CommandTable) -> Result<(), SchemaError> {
    let groups = table.groups();
    match table.ungrouped().into_iter().find(|cmd| groups.contains(&cmd.name.as_str())) {
        Some(cmd) => Err(SchemaError::NameClash {
            name: cmd.name.clone(),
        }),
        None => Ok(()),
    }
}

// --- COMPILED TABLE ---

/// The immutable set of compiled commands.
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    commands: Vec<CommandSchema>,
}

impl CommandTable {
    /// Creates a table, ordering commands by group then name.
    pub fn new(mut commands: Vec<CommandSchema>) -> Self {
        commands.sort_by(|a, b| (&a.group, &a.name).cmp(&(&b.group, &b.name)));
        Self { commands }
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no command was registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// All commands, ordered.
    pub fn iter(&self) -> impl Iterator<Item = &CommandSchema> {
        self.commands.iter()
    }

    /// Exact lookup of a command.
    pub fn get(&self, group: Option<&str>, name: &str) -> Option<&CommandSchema> {
        self.commands
            .iter()
            .find(|cmd| cmd.group.as_deref() == group && cmd.name == name)
    }

    /// The only command, when exactly one is registered.
    pub fn single(&self) -> Option<&CommandSchema> {
        match self.commands.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Whether `name` is a command group.
    pub fn is_group(&self, name: &str) -> bool {
        self.commands
            .iter()
            .any(|cmd| cmd.group.as_deref() == Some(name))
    }

    /// Group names, ordered and unique.
    pub fn groups(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|cmd| cmd.group.as_deref())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Commands of one group.
    pub fn in_group(&self, group: &str) -> Vec<&CommandSchema> {
        self.commands
            .iter()
            .filter(|cmd| cmd.group.as_deref() == Some(group))
            .collect()
    }

    /// Commands outside any group.
    pub fn ungrouped(&self) -> Vec<&CommandSchema> {
        self.commands.iter().filter(|cmd| cmd.group.is_none()).collect()
    }
}
