//! A module consist of the scoped managers for operator precedence and
//! semantic actions.
//!
//! Both managers resolve items through the inheritance chain of the
//! requesting grammar: the most derived definition wins. Results are
//! memoized per `(grammar, item)` composite key and validated against the
//! resolver [epoch](crate::inheritance::InheritanceResolver::epoch), so a
//! registry change never serves a stale definition.
mod precedence;
mod semantic_actions;

use crate::grammar::{AssociativityRule, PrecedenceRule, SemanticActionTemplate};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;


// A memo table tied to the resolver epoch it was filled under.
struct EpochCache<V> {
    epoch: u64,
    entries: HashMap<(String, String), V>,
}

/// Inheritance-aware lookup of named semantic actions.
pub struct SemanticActionManager {
    overrides: HashMap<String, HashMap<String, Rc<SemanticActionTemplate>>>,
    cache: RefCell<EpochCache<Option<Rc<SemanticActionTemplate>>>>,
    lookups: Cell<u64>,
    cache_hits: Cell<u64>,
    invalidations: Cell<u64>,
}

/// Inheritance-aware lookup of operator precedence and associativity.
pub struct PrecedenceManager {
    precedence_overrides: HashMap<String, Vec<PrecedenceRule>>,
    associativity_overrides: HashMap<String, Vec<AssociativityRule>>,
    precedence_cache: RefCell<EpochCache<Option<PrecedenceRule>>>,
    associativity_cache: RefCell<EpochCache<Option<AssociativityRule>>>,
    lookups: Cell<u64>,
    cache_hits: Cell<u64>,
    invalidations: Cell<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Counters describing manager usage.
pub struct ManagerStats {
    pub registered: usize,
    pub lookups: u64,
    pub cache_hits: u64,
    pub invalidations: u64,
}

impl<V> EpochCache<V> {
    fn new() -> Self {
        Self {
            epoch: 0,
            entries: HashMap::new(),
        }
    }

    // Drop all entries filled under an older registry epoch.
    fn sync(&mut self, epoch: u64) {
        if self.epoch != epoch {
            self.entries.clear();
            self.epoch = epoch;
        }
    }

    fn invalidate_grammars<'g>(&mut self, grammars: impl Iterator<Item = &'g str>) {
        let names: Vec<&str> = grammars.collect();
        self.entries
            .retain(|(grammar, _), _| !names.iter().any(|n| n == grammar));
    }
}
