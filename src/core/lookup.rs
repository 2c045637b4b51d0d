// src/core/lookup.rs

//! Per-module symbol tables used to resolve textual annotations.
//!
//! A module declares the enums, models and type aliases visible to its
//! callables in a [`Namespace`]. The table built from it is keyed by dotted
//! path segments, so `"Color"`, `"colors.Color"` and `"pkg.colors.Color"` all
//! reach the same symbol through suffix matching.

use crate::constants::{WRAPPER_VALUE_SEGMENT, WRAPPER_VALUE_SUFFIX};
use crate::models::{EnumDef, EnumKind, ModelDef, ScalarKind};
use std::collections::HashMap;
use std::sync::Arc;

/// A named type a textual annotation can refer to.
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    /// An alias for a primitive.
    Scalar(ScalarKind),
    /// An enumeration.
    Enum(Arc<EnumDef>),
    /// A structured model.
    Model(Arc<ModelDef>),
}

impl Symbol {
    /// The display name of the symbol.
    pub fn name(&self) -> String {
        match self {
            Symbol::Scalar(kind) => kind.name().to_string(),
            Symbol::Enum(def) => def.name.clone(),
            Symbol::Model(model) => model.name.clone(),
        }
    }
}

/// The names a module exposes, including one level of submodules.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    items: Vec<(String, Symbol)>,
    submodules: Vec<(String, Vec<(String, Symbol)>)>,
}

impl Namespace {
    /// An empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exposes an enumeration under its own name.
    pub fn with_enum(mut self, def: &Arc<EnumDef>) -> Self {
        self.items.push((def.name.clone(), Symbol::Enum(Arc::clone(def))));
        self
    }

    /// Exposes a model under its own name.
    pub fn with_model(mut self, model: &Arc<ModelDef>) -> Self {
        self.items
            .push((model.name.clone(), Symbol::Model(Arc::clone(model))));
        self
    }

    /// Exposes a primitive under an alias.
    pub fn with_alias(mut self, name: impl Into<String>, kind: ScalarKind) -> Self {
        self.items.push((name.into(), Symbol::Scalar(kind)));
        self
    }

    /// Exposes the symbols of an imported submodule.
    pub fn with_submodule(mut self, name: impl Into<String>, symbols: Namespace) -> Self {
        self.submodules.push((name.into(), symbols.items));
        self
    }
}

/// Dotted path tuples to symbols, built once per module namespace.
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    entries: HashMap<Vec<String>, Symbol>,
}

fn key(segments: &[&str]) -> Vec<String> {
    segments.iter().map(|s| (*s).to_string()).collect()
}

impl LookupTable {
    /// Builds the table for a namespace.
    ///
    /// Wrapper enums are additionally reachable as `NameValue` and `Name.V`,
    /// the paths their generated value tables live under.
    pub fn from_namespace(namespace: &Namespace) -> Self {
        let mut entries = HashMap::new();

        for (name, symbol) in &namespace.items {
            entries.insert(key(&[name]), symbol.clone());
            if is_wrapper(symbol) {
                let suffixed = format!("{}{}", name, WRAPPER_VALUE_SUFFIX);
                entries.insert(key(&[&suffixed]), symbol.clone());
                entries.insert(key(&[name, WRAPPER_VALUE_SEGMENT]), symbol.clone());
            }
        }

        for (module, items) in &namespace.submodules {
            for (name, symbol) in items {
                entries.insert(key(&[module, name]), symbol.clone());
                if is_wrapper(symbol) {
                    let suffixed = format!("{}{}", name, WRAPPER_VALUE_SUFFIX);
                    entries.insert(key(&[module, &suffixed]), symbol.clone());
                }
            }
        }

        log::trace!("Built lookup table with {} entries", entries.len());
        Self { entries }
    }

    /// Number of reachable paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finds a symbol by dotted path, trying ever shorter suffixes of the path.
    pub fn find(&self, dotted: &str) -> Option<&Symbol> {
        let segments: Vec<String> = dotted
            .split('.')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        (0..segments.len()).find_map(|start| {
            segments
                .get(start..)
                .and_then(|suffix| self.entries.get(suffix))
        })
    }

    /// Resolves a type name: table symbols first, then primitive names.
    ///
    /// Returns `None` for names nothing knows about; callers fall back to `str`.
    pub fn resolve(&self, name: &str) -> Option<Symbol> {
        let name = name.trim().trim_matches(|c| c == '\'' || c == '"');
        if let Some(symbol) = self.find(name) {
            return Some(symbol.clone());
        }
        ScalarKind::from_name(name).map(Symbol::Scalar)
    }
}

fn is_wrapper(symbol: &Symbol) -> bool {
    matches!(symbol, Symbol::Enum(def) if def.kind == EnumKind::Wrapper)
}
