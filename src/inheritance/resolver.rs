use super::{InheritanceResolver, ResolverStats};
use crate::grammar::Grammar;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;

impl InheritanceResolver {
    pub fn new() -> Self {
        Self {
            grammars: HashMap::new(),
            chain_cache: RefCell::new(HashMap::new()),
            dependents_cache: RefCell::new(HashMap::new()),
            epoch: Cell::new(0),
            chains_computed: Cell::new(0),
            chain_cache_hits: Cell::new(0),
            dependents_computed: Cell::new(0),
            dependents_cache_hits: Cell::new(0),
        }
    }

    /// Register a grammar, replacing any previous registration under the
    /// same name. Cached chains and dependent sets touching the grammar are
    /// invalidated.
    pub fn register(&mut self, grammar: Rc<Grammar>) {
        let name = grammar.name().to_string();
        self.grammars.insert(name.clone(), grammar);
        self.invalidate(&name);
    }

    /// Remove a grammar from the registry.
    pub fn unregister(&mut self, name: &str) -> Option<Rc<Grammar>> {
        let removed = self.grammars.remove(name);
        if removed.is_some() {
            self.invalidate(name);
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<&Rc<Grammar>> {
        self.grammars.get(name)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.grammars.contains_key(name)
    }

    pub fn registered_names(&self) -> impl Iterator<Item = &str> {
        self.grammars.keys().map(|k| k.as_str())
    }

    /// A monotonic counter bumped on every registry change. Consumers that
    /// cache resolution results validate against it.
    pub fn epoch(&self) -> u64 {
        self.epoch.get()
    }

    /// The inheritance chain of a grammar in depth-first order, starting at
    /// the grammar itself. Every transitive base appears exactly once; a
    /// cyclic edge terminates that branch of the walk.
    pub fn inheritance_chain(&self, name: &str) -> Rc<Vec<String>> {
        if let Some(chain) = self.chain_cache.borrow().get(name) {
            self.chain_cache_hits.set(self.chain_cache_hits.get() + 1);
            return Rc::clone(chain);
        }

        let mut chain = Vec::new();
        let mut on_path = Vec::new();
        self.walk_chain(name, &mut chain, &mut on_path);
        let chain = Rc::new(chain);

        self.chains_computed.set(self.chains_computed.get() + 1);
        self.chain_cache
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&chain));
        chain
    }

    fn walk_chain(&self, name: &str, chain: &mut Vec<String>, on_path: &mut Vec<String>) {
        if on_path.iter().any(|n| n == name) {
            return;
        }
        if !chain.iter().any(|n| n == name) {
            chain.push(name.to_string());
        }
        let grammar = match self.grammars.get(name) {
            Some(grammar) => grammar,
            None => return,
        };
        on_path.push(name.to_string());
        for base in grammar.base_grammars() {
            self.walk_chain(base, chain, on_path);
        }
        on_path.pop();
    }

    /// The transitive set of grammars that inherit from the named grammar.
    pub fn dependents(&self, name: &str) -> Rc<BTreeSet<String>> {
        if let Some(dependents) = self.dependents_cache.borrow().get(name) {
            self.dependents_cache_hits
                .set(self.dependents_cache_hits.get() + 1);
            return Rc::clone(dependents);
        }

        let mut dependents = BTreeSet::new();
        for candidate in self.grammars.keys() {
            if candidate == name {
                continue;
            }
            if self
                .inheritance_chain(candidate)
                .iter()
                .any(|n| n == name)
            {
                dependents.insert(candidate.clone());
            }
        }
        let dependents = Rc::new(dependents);

        self.dependents_computed
            .set(self.dependents_computed.get() + 1);
        self.dependents_cache
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&dependents));
        dependents
    }

    /// Whether `derived` reaches `base` along base-grammar edges.
    pub fn inherits_from(&self, derived: &str, base: &str) -> bool {
        self.inheritance_chain(derived).iter().any(|n| n == base)
    }

    /// The most derived grammar present in every given grammar's chain.
    pub fn common_base(&self, names: &[&str]) -> Option<String> {
        let (first, rest) = names.split_first()?;
        let first_chain = self.inheritance_chain(first);
        first_chain
            .iter()
            .find(|candidate| {
                rest.iter().all(|name| {
                    self.inheritance_chain(name)
                        .iter()
                        .any(|n| n == candidate.as_str())
                })
            })
            .cloned()
    }

    /// Report every registered grammar that participates in an inheritance
    /// cycle. An empty result means the registry forms a DAG.
    pub fn validate(&self) -> Vec<String> {
        let mut cyclic: Vec<String> = self
            .grammars
            .keys()
            .filter(|name| {
                let mut visited = HashSet::new();
                self.reaches(name, name, &mut visited)
            })
            .cloned()
            .collect();
        cyclic.sort();
        cyclic
    }

    fn reaches(&self, from: &str, target: &str, visited: &mut HashSet<String>) -> bool {
        if !visited.insert(from.to_string()) {
            return false;
        }
        let grammar = match self.grammars.get(from) {
            Some(grammar) => grammar,
            None => return false,
        };
        for base in grammar.base_grammars() {
            if base == target || self.reaches(base, target, visited) {
                return true;
            }
        }
        false
    }

    pub fn stats(&self) -> ResolverStats {
        ResolverStats {
            registered: self.grammars.len(),
            chains_computed: self.chains_computed.get(),
            chain_cache_hits: self.chain_cache_hits.get(),
            dependents_computed: self.dependents_computed.get(),
            dependents_cache_hits: self.dependents_cache_hits.get(),
        }
    }

    // Drop every cached chain that contains the grammar and every dependent
    // set; dependent sets are registry wide and cheap to rebuild.
    fn invalidate(&mut self, name: &str) {
        self.chain_cache
            .borrow_mut()
            .retain(|key, chain| key != name && !chain.iter().any(|n| n == name));
        self.dependents_cache.borrow_mut().clear();
        self.epoch.set(self.epoch.get() + 1);
    }
}

impl Default for InheritanceResolver {
    fn default() -> Self {
        Self::new()
    }
}
