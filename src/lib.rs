//! cliform: compiles declared function signatures into a command-line
//! interface and dispatches parsed input back to them.
//!
//! Commands are declared on a [`RegistryState`] as [`CallableDescriptor`]s,
//! compiled once into an immutable [`CommandTable`] and run through an
//! [`App`], which builds a `clap` parser for the route the arguments select.

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod models;
pub mod state;
pub mod timing;

pub use crate::cli::{App, Outcome, RunError};
pub use crate::config::{Config, NameStyle};
pub use crate::core::compiler::{CommandTable, SchemaError};
pub use crate::core::lookup::Namespace;
pub use crate::models::{
    Annotation, CallableDescriptor, ClassDescriptor, EnumDef, FieldDef, Instance, Invocation,
    ModelDef, ParameterDescriptor, Value,
};
pub use crate::state::RegistryState;
