// src/state.rs

use crate::config::Config;
use crate::core::compiler::{self, CommandTable, SchemaError};
use crate::core::lookup::{LookupTable, Namespace};
use crate::models::{CallableDescriptor, ClassDescriptor};
use std::collections::HashMap;
use std::sync::Arc;

/// A command as declared, before compilation.
#[derive(Debug, Clone)]
pub struct CommandDeclaration {
    /// Owning group; `None` for top-level commands.
    pub group: Option<String>,
    /// Command name, canonical (underscore) spelling.
    pub name: String,
    /// The callable to expose.
    pub callable: Arc<CallableDescriptor>,
    /// The owning class of a method.
    pub class: Option<Arc<ClassDescriptor>>,
}

impl CommandDeclaration {
    /// `group name` or `name`.
    pub fn qualified_name(&self) -> String {
        match &self.group {
            Some(group) => format!("{} {}", group, self.name),
            None => self.name.clone(),
        }
    }
}

/// The declaration table: commands and the namespaces their annotations resolve in.
///
/// Written while commands are declared, then compiled once into an immutable
/// [`CommandTable`].
#[derive(Debug, Default)]
pub struct RegistryState {
    declarations: Vec<CommandDeclaration>,
    namespaces: HashMap<String, Namespace>,
}

/// Canonical spelling of a command or group name.
pub fn canonical_name(name: &str) -> String {
    name.trim().replace('-', "_")
}

impl RegistryState {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a function as a command. An empty `group` declares a top-level command.
    pub fn register(&mut self, group: &str, callable: CallableDescriptor) -> &mut Self {
        self.insert(group, callable, None)
    }

    /// Declares a method of `class` as a command; its receiver is built from the
    /// class constructor's arguments at dispatch.
    pub fn register_method(
        &mut self,
        group: &str,
        class: Arc<ClassDescriptor>,
        method: CallableDescriptor,
    ) -> &mut Self {
        self.insert(group, method, Some(class))
    }

    fn insert(
        &mut self,
        group: &str,
        callable: CallableDescriptor,
        class: Option<Arc<ClassDescriptor>>,
    ) -> &mut Self {
        let group = Some(canonical_name(group)).filter(|g| !g.is_empty());
        let declaration = CommandDeclaration {
            name: canonical_name(&callable.name),
            group,
            callable: Arc::new(callable),
            class,
        };

        if let Some(existing) = self
            .declarations
            .iter_mut()
            .find(|d| d.group == declaration.group && d.name == declaration.name)
        {
            log::warn!(
                "Command '{}' declared twice; the last declaration wins",
                declaration.qualified_name()
            );
            *existing = declaration;
        } else {
            log::trace!("Declared command '{}'", declaration.qualified_name());
            self.declarations.push(declaration);
        }
        self
    }

    /// Registers the symbols textual annotations in `module` may refer to.
    pub fn add_namespace(&mut self, module: impl Into<String>, namespace: Namespace) -> &mut Self {
        self.namespaces.insert(module.into(), namespace);
        self
    }

    /// Drops every command declared in a module whose name contains one of `names`.
    pub fn exclude_modules(&mut self, names: &[&str]) -> &mut Self {
        self.declarations.retain(|d| {
            let excluded = names.iter().any(|name| d.callable.module.contains(name));
            if excluded {
                log::debug!("Excluding command '{}'", d.qualified_name());
            }
            !excluded
        });
        self
    }

    /// The declarations in declaration order.
    pub fn declarations(&self) -> &[CommandDeclaration] {
        &self.declarations
    }

    /// One lookup table per registered module namespace.
    pub fn lookup_tables(&self) -> HashMap<String, Arc<LookupTable>> {
        self.namespaces
            .iter()
            .map(|(module, namespace)| {
                (module.clone(), Arc::new(LookupTable::from_namespace(namespace)))
            })
            .collect()
    }

    /// Compiles every declaration.
    pub fn compile(&self, config: &Config) -> Result<CommandTable, SchemaError> {
        compiler::compile_registry(self, config.name_style)
    }
}
