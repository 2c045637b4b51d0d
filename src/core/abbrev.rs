// src/core/abbrev.rs

use crate::config::NameStyle;
use crate::constants::HELP_SHORT_FLAG;
use crate::models::ArgumentSpec;
use std::collections::{BTreeMap, HashSet};

/// Hands out long and short flags for the arguments of one command.
///
/// Short flags are first come, first served: the first character of the name,
/// then its uppercase form, otherwise none. `-h` is always taken.
#[derive(Debug, Clone)]
pub struct FlagAllocator {
    style: NameStyle,
    used_short_flags: HashSet<char>,
}

impl FlagAllocator {
    /// A fresh allocator with only `-h` reserved.
    pub fn new(style: NameStyle) -> Self {
        Self {
            style,
            used_short_flags: HashSet::from([HELP_SHORT_FLAG]),
        }
    }

    /// Flags for one spec; positional specs get none.
    pub fn flags_for(&mut self, spec: &ArgumentSpec) -> Vec<String> {
        if spec.positional {
            return Vec::new();
        }

        let mut flags = Vec::with_capacity(2);
        if !spec.inverted_boolean
            && let Some(short) = self.claim_short(&spec.flag_name)
        {
            flags.push(format!("-{}", short));
        }
        flags.push(format!("--{}", self.style.apply(&spec.flag_name)));
        flags
    }

    /// Allocates flags for every spec in order, keyed by `flag_name`.
    pub fn allocate<'s, I>(&mut self, specs: I) -> BTreeMap<String, Vec<String>>
    where
        I: IntoIterator<Item = &'s ArgumentSpec>,
    {
        specs
            .into_iter()
            .map(|spec| (spec.flag_name.clone(), self.flags_for(spec)))
            .collect()
    }

    fn claim_short(&mut self, name: &str) -> Option<char> {
        let first = name.chars().next().filter(char::is_ascii_alphanumeric)?;
        let candidates = [first, first.to_ascii_uppercase()];
        let short = candidates
            .into_iter()
            .find(|c| !self.used_short_flags.contains(c))?;
        self.used_short_flags.insert(short);
        Some(short)
    }
}
