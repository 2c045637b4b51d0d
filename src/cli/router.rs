// src/cli/router.rs

use crate::core::compiler::CommandTable;
use crate::models::CommandSchema;
use crate::state::canonical_name;

/// Which parser the runner builds for a given argument vector.
#[derive(Debug, Clone, Copy)]
pub enum Route<'t> {
    /// Nothing is registered.
    Empty,
    /// `<group> <command> ...` named an existing command; the first two tokens are consumed.
    Direct(&'t CommandSchema),
    /// Exactly one command exists and the first token is not its name; nothing is consumed.
    Single(&'t CommandSchema),
    /// The first token is a group; it is consumed and its commands are listed.
    Group(&'t str),
    /// Everything else: the full command tree.
    Tree,
}

impl Route<'_> {
    /// How many leading tokens the route consumed.
    pub fn consumed(&self) -> usize {
        match self {
            Route::Direct(_) => 2,
            Route::Group(_) => 1,
            Route::Empty | Route::Single(_) | Route::Tree => 0,
        }
    }
}

/// Picks a route from the arguments after the program name.
///
/// The cascade, in order:
/// 1. An exact `(group, command)` match on the first two tokens.
/// 2. A lone command when the first token does not name it.
/// 3. A known group name.
/// 4. The command tree.
///
/// Tokens are compared in canonical spelling, so `my-group` and `my_group` match alike.
pub fn route<'t>(table: &'t CommandTable, args: &[String]) -> Route<'t> {
    log::debug!("Routing args: {:?}", args);

    if table.is_empty() {
        return Route::Empty;
    }

    let first = args.first().map(|arg| canonical_name(arg));
    let second = args.get(1).map(|arg| canonical_name(arg));

    // Rule 1: `<group> <command> [args...]`
    if let (Some(group), Some(name)) = (&first, &second)
        && let Some(schema) = table.get(Some(group.as_str()), name)
    {
        return Route::Direct(schema);
    }

    // Rule 2: a single command owns the whole command line.
    if let Some(only) = table.single()
        && first.as_deref() != Some(only.name.as_str())
    {
        return Route::Single(only);
    }

    // Rule 3: `<group>` alone lists the group.
    if let Some(group) = &first
        && let Some(known) = table.groups().into_iter().find(|g| *g == group.as_str())
    {
        return Route::Group(known);
    }

    // Rule 4: the tree.
    Route::Tree
}
