// src/core/mod.rs

//! Signature analysis, schema compilation and dispatch.

pub mod abbrev;
pub mod builder;
pub mod classifier;
pub mod compiler;
pub mod convert;
pub mod dispatch;
pub mod docstring;
pub mod lookup;
pub mod parameters;
pub mod resolver;
