use super::{EpochCache, ManagerStats, PrecedenceManager};
use crate::grammar::{AssociativityRule, PrecedenceRule};
use crate::inheritance::InheritanceResolver;
use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::HashMap;

impl PrecedenceManager {
    pub fn new() -> Self {
        Self {
            precedence_overrides: HashMap::new(),
            associativity_overrides: HashMap::new(),
            precedence_cache: RefCell::new(EpochCache::new()),
            associativity_cache: RefCell::new(EpochCache::new()),
            lookups: Cell::new(0),
            cache_hits: Cell::new(0),
            invalidations: Cell::new(0),
        }
    }

    /// Register a precedence rule for a grammar, shadowing the grammar
    /// model and base definitions for the operators it covers.
    pub fn register_precedence(
        &mut self,
        resolver: &InheritanceResolver,
        grammar: &str,
        rule: PrecedenceRule,
    ) {
        self.invalidate(resolver, grammar);
        self.precedence_overrides
            .entry(grammar.to_string())
            .or_default()
            .push(rule);
    }

    pub fn register_associativity(
        &mut self,
        resolver: &InheritanceResolver,
        grammar: &str,
        rule: AssociativityRule,
    ) {
        self.invalidate(resolver, grammar);
        self.associativity_overrides
            .entry(grammar.to_string())
            .or_default()
            .push(rule);
    }

    /// Resolve the precedence rule covering an operator through the
    /// inheritance chain of the requesting grammar.
    pub fn get_precedence(
        &self,
        resolver: &InheritanceResolver,
        grammar: &str,
        operator: &str,
    ) -> Option<PrecedenceRule> {
        self.lookups.set(self.lookups.get() + 1);

        let key = (grammar.to_string(), operator.to_string());
        {
            let mut cache = self.precedence_cache.borrow_mut();
            cache.sync(resolver.epoch());
            if let Some(entry) = cache.entries.get(&key) {
                self.cache_hits.set(self.cache_hits.get() + 1);
                return entry.clone();
            }
        }

        let resolved = self.resolve_precedence(resolver, grammar, operator);
        self.precedence_cache
            .borrow_mut()
            .entries
            .insert(key, resolved.clone());
        resolved
    }

    fn resolve_precedence(
        &self,
        resolver: &InheritanceResolver,
        grammar: &str,
        operator: &str,
    ) -> Option<PrecedenceRule> {
        for link in resolver.inheritance_chain(grammar).iter() {
            if let Some(rule) = self
                .precedence_overrides
                .get(link)
                .and_then(|rules| rules.iter().rev().find(|rule| rule.covers(operator)))
            {
                return Some(rule.clone());
            }
            if let Some(rule) = resolver.get(link).and_then(|g| {
                g.precedence_rules()
                    .iter()
                    .find(|rule| rule.covers(operator))
            }) {
                return Some(rule.clone());
            }
        }
        None
    }

    /// Resolve the associativity assigned to an operator.
    pub fn get_associativity(
        &self,
        resolver: &InheritanceResolver,
        grammar: &str,
        operator: &str,
    ) -> Option<AssociativityRule> {
        self.lookups.set(self.lookups.get() + 1);

        let key = (grammar.to_string(), operator.to_string());
        {
            let mut cache = self.associativity_cache.borrow_mut();
            cache.sync(resolver.epoch());
            if let Some(entry) = cache.entries.get(&key) {
                self.cache_hits.set(self.cache_hits.get() + 1);
                return entry.clone();
            }
        }

        let resolved = self.resolve_associativity(resolver, grammar, operator);
        self.associativity_cache
            .borrow_mut()
            .entries
            .insert(key, resolved.clone());
        resolved
    }

    fn resolve_associativity(
        &self,
        resolver: &InheritanceResolver,
        grammar: &str,
        operator: &str,
    ) -> Option<AssociativityRule> {
        for link in resolver.inheritance_chain(grammar).iter() {
            if let Some(rule) = self
                .associativity_overrides
                .get(link)
                .and_then(|rules| rules.iter().rev().find(|rule| rule.operator == operator))
            {
                return Some(rule.clone());
            }
            if let Some(rule) = resolver.get(link).and_then(|g| {
                g.associativity_rules()
                    .iter()
                    .find(|rule| rule.operator == operator)
            }) {
                return Some(rule.clone());
            }
        }
        None
    }

    /// Compare two operators by resolved precedence level.
    /// An operator without a rule loses; two unresolved operators compare
    /// equal. Associativity consumers decide reduction direction on ties.
    pub fn compare_precedence(
        &self,
        resolver: &InheritanceResolver,
        grammar: &str,
        op1: &str,
        op2: &str,
    ) -> Ordering {
        let level1 = self.get_precedence(resolver, grammar, op1).map(|r| r.level);
        let level2 = self.get_precedence(resolver, grammar, op2).map(|r| r.level);
        match (level1, level2) {
            (Some(l1), Some(l2)) => l1.cmp(&l2),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        }
    }

    pub fn stats(&self) -> ManagerStats {
        ManagerStats {
            registered: self
                .precedence_overrides
                .values()
                .map(|rules| rules.len())
                .sum::<usize>()
                + self
                    .associativity_overrides
                    .values()
                    .map(|rules| rules.len())
                    .sum::<usize>(),
            lookups: self.lookups.get(),
            cache_hits: self.cache_hits.get(),
            invalidations: self.invalidations.get(),
        }
    }

    fn invalidate(&mut self, resolver: &InheritanceResolver, grammar: &str) {
        let dependents = resolver.dependents(grammar);
        let names = std::iter::once(grammar).chain(dependents.iter().map(|d| d.as_str()));
        let names: Vec<&str> = names.collect();
        self.precedence_cache
            .borrow_mut()
            .invalidate_grammars(names.iter().copied());
        self.associativity_cache
            .borrow_mut()
            .invalidate_grammars(names.iter().copied());
        self.invalidations.set(self.invalidations.get() + 1);
    }
}

impl Default for PrecedenceManager {
    fn default() -> Self {
        Self::new()
    }
}
