use super::{EpochCache, ManagerStats, SemanticActionManager};
use crate::grammar::SemanticActionTemplate;
use crate::inheritance::InheritanceResolver;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

impl SemanticActionManager {
    pub fn new() -> Self {
        Self {
            overrides: HashMap::new(),
            cache: RefCell::new(EpochCache::new()),
            lookups: Cell::new(0),
            cache_hits: Cell::new(0),
            invalidations: Cell::new(0),
        }
    }

    /// Register an action for a grammar, shadowing any definition the
    /// grammar model or a base grammar carries under the same name.
    /// Cached lookups of the grammar and of every dependent grammar are
    /// invalidated.
    pub fn register(
        &mut self,
        resolver: &InheritanceResolver,
        grammar: &str,
        template: SemanticActionTemplate,
    ) {
        let dependents = resolver.dependents(grammar);
        {
            let mut cache = self.cache.borrow_mut();
            cache.invalidate_grammars(
                std::iter::once(grammar).chain(dependents.iter().map(|d| d.as_str())),
            );
        }
        self.invalidations.set(self.invalidations.get() + 1);
        self.overrides
            .entry(grammar.to_string())
            .or_default()
            .insert(template.name.clone(), Rc::new(template));
    }

    /// Remove a registered action, exposing whatever the inheritance walk
    /// finds next for the affected grammars.
    pub fn unregister(
        &mut self,
        resolver: &InheritanceResolver,
        grammar: &str,
        action: &str,
    ) -> Option<Rc<SemanticActionTemplate>> {
        let dependents = resolver.dependents(grammar);
        {
            let mut cache = self.cache.borrow_mut();
            cache.invalidate_grammars(
                std::iter::once(grammar).chain(dependents.iter().map(|d| d.as_str())),
            );
        }
        self.invalidations.set(self.invalidations.get() + 1);
        self.overrides.get_mut(grammar)?.remove(action)
    }

    /// Resolve an action for the requesting grammar. The walk follows the
    /// inheritance chain and returns the first definition found, preferring
    /// a registered override over the grammar model at each link.
    pub fn get(
        &self,
        resolver: &InheritanceResolver,
        grammar: &str,
        action: &str,
    ) -> Option<Rc<SemanticActionTemplate>> {
        self.lookups.set(self.lookups.get() + 1);

        let key = (grammar.to_string(), action.to_string());
        {
            let mut cache = self.cache.borrow_mut();
            cache.sync(resolver.epoch());
            if let Some(entry) = cache.entries.get(&key) {
                self.cache_hits.set(self.cache_hits.get() + 1);
                return entry.clone();
            }
        }

        let resolved = self.resolve(resolver, grammar, action);
        self.cache
            .borrow_mut()
            .entries
            .insert(key, resolved.clone());
        resolved
    }

    fn resolve(
        &self,
        resolver: &InheritanceResolver,
        grammar: &str,
        action: &str,
    ) -> Option<Rc<SemanticActionTemplate>> {
        for link in resolver.inheritance_chain(grammar).iter() {
            if let Some(template) = self
                .overrides
                .get(link)
                .and_then(|actions| actions.get(action))
            {
                return Some(Rc::clone(template));
            }
            if let Some(template) = resolver
                .get(link)
                .and_then(|g| g.get_semantic_action(action))
            {
                return Some(Rc::clone(template));
            }
        }
        None
    }

    pub fn stats(&self) -> ManagerStats {
        ManagerStats {
            registered: self.overrides.values().map(|actions| actions.len()).sum(),
            lookups: self.lookups.get(),
            cache_hits: self.cache_hits.get(),
            invalidations: self.invalidations.get(),
        }
    }
}

impl Default for SemanticActionManager {
    fn default() -> Self {
        Self::new()
    }
}
