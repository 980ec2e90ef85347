// ABOUTME: Pre-compiled CSS selectors for one batch, built up front and read by every item.
// ABOUTME: Compiles each excluded selector once and remembers parse failures as well as successes.

//! Selector compilation for repeated DOM queries.
//!
//! Batches usually repeat the same `excludedSelectors` across items, and
//! selector parsing costs more than matching on small documents. A
//! [`CompiledSelectors`] set is built once per batch and dropped with it, so
//! nothing accumulates across batches. Invalid selectors are stored too, with
//! the parser's message, so every item that names them fails the same way.

use std::collections::HashMap;

use dom_query::Matcher;

type Compiled = Result<Matcher, String>;

fn compile(css: &str) -> Compiled {
    Matcher::new(css).map_err(|e| format!("invalid selector `{}`: {:?}", css, e))
}

/// A read-only set of compiled selectors keyed by their source text.
#[derive(Default)]
pub struct CompiledSelectors {
    compiled: HashMap<String, Compiled>,
}

impl CompiledSelectors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile every selector once. Repeats are skipped.
    pub fn compile<I, S>(selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for css in selectors {
            set.insert(css.as_ref());
        }
        set
    }

    /// Compile and store one selector unless it is already present.
    pub fn insert(&mut self, css: &str) {
        if !self.compiled.contains_key(css) {
            self.compiled.insert(css.to_string(), compile(css));
        }
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    /// The compiled matcher for `css`, or the parser's message when it is invalid.
    ///
    /// A selector missing from the set is compiled on the spot and not stored.
    pub fn get(&self, css: &str) -> Compiled {
        match self.compiled.get(css) {
            Some(entry) => entry.clone(),
            None => compile(css),
        }
    }
}

impl std::fmt::Debug for CompiledSelectors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&String> = self.compiled.keys().collect();
        keys.sort();
        f.debug_struct("CompiledSelectors")
            .field("selectors", &keys)
            .finish()
    }
}
