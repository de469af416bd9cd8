use super::{CallbackContext, CallbackRegistry, CancelToken, StepParser, StepParserOptions};
use crate::context::ContextAdapter;
use crate::grammar::{
    Grammar, PartKind, PrecedenceRule, Production, ProductionPart, SemanticActionTemplate, Terminal,
};
use crate::inheritance::InheritanceResolver;
use crate::managers::{PrecedenceManager, SemanticActionManager};
use crate::pool::{Arena, ObjectPool, PoolStats};
use crate::symbols::SymbolTable;
use crate::util::Log;
use crate::{ParserError, PoolError};
use once_cell::unsync::OnceCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;

impl StepParser {
    /// Create an engine with the default sizing options.
    pub fn new() -> Self {
        match Self::with_options(StepParserOptions::default()) {
            Ok(parser) => parser,
            Err(_) => panic!("Internal error: default pool sizing exceeds its arena budget"),
        }
    }

    /// Create an engine with explicit arena and pool sizing.
    pub fn with_options(options: StepParserOptions) -> Result<Self, PoolError> {
        let arena = Rc::new(Arena::new(options.arena_bytes));
        let paths = ObjectPool::new(&arena, options.pool_initial, options.pool_max)?;
        Ok(Self {
            arena,
            paths,
            live_paths: Vec::new(),
            active_parts: HashMap::new(),
            resolver: InheritanceResolver::new(),
            actions: SemanticActionManager::new(),
            precedence: PrecedenceManager::new(),
            symbols: SymbolTable::new(),
            adapter: ContextAdapter::new(),
            callbacks: CallbackRegistry::new(),
            callback_context: HashMap::new(),
            active_grammar: None,
            next_path_id: 1,
            paths_explored: 0,
            fork_limit: options.fork_limit.max(1),
            cancel: CancelToken::default(),
            debug: OnceCell::new(),
        })
    }

    /// Register a grammar with the inheritance resolver without activating
    /// it. Base grammars are registered this way so derived lookups can
    /// walk to them.
    pub fn register_grammar(&mut self, grammar: Rc<Grammar>) {
        self.resolver.register(grammar);
    }

    /// Activate a grammar: register it, seed the context adapter and reset
    /// all path state. Activating the same grammar twice is equivalent to
    /// activating it once.
    pub fn set_active_grammar(&mut self, grammar: Rc<Grammar>) -> Result<(), ParserError> {
        self.resolver.register(Rc::clone(&grammar));
        self.adapter.set_grammar(&grammar, &self.resolver);
        self.active_grammar = Some(grammar);
        self.reset_paths()?;
        self.active_parts.clear();
        self.symbols.clear();
        self.next_path_id = 1;
        Ok(())
    }

    pub fn active_grammar(&self) -> Option<&Rc<Grammar>> {
        self.active_grammar.as_ref()
    }

    /// The valid next terminals for a lexer path, considering the recorded
    /// active production parts (or the grammar start terminals when none),
    /// the context filter and the lexer path's own parser paths.
    pub fn valid_terminals_for_lexer_path(&self, lexer_path_id: u64) -> Vec<String> {
        let grammar = match &self.active_grammar {
            Some(grammar) => grammar,
            None => return Vec::new(),
        };

        let mut terminals: BTreeSet<String> = BTreeSet::new();
        match self.active_parts.get(&lexer_path_id) {
            Some(parts) if !parts.is_empty() => {
                let mut visited = HashSet::new();
                self.parts_first_terminals(grammar, parts, &mut terminals, &mut visited);
            }
            _ => {
                if grammar.valid_start_terminals().is_empty() {
                    let mut visited = HashSet::new();
                    for name in self.start_productions_for(grammar) {
                        if let Some(production) = self.lookup_production(grammar, &name) {
                            self.parts_first_terminals(
                                grammar,
                                production.parts(),
                                &mut terminals,
                                &mut visited,
                            );
                        }
                    }
                } else {
                    terminals.extend(grammar.valid_start_terminals().iter().cloned());
                }
            }
        }

        // Narrow by the candidate productions of live parser paths on this
        // lexer path, when there are any.
        let mut path_leads: BTreeSet<String> = BTreeSet::new();
        let mut has_paths = false;
        for handle in &self.live_paths {
            let path = match self.paths.get(*handle) {
                Ok(path) => path,
                Err(_) => continue,
            };
            if path.lexer_path_id != lexer_path_id {
                continue;
            }
            has_paths = true;
            let mut visited = HashSet::new();
            for production in &path.active_productions {
                self.parts_first_terminals(grammar, production.parts(), &mut path_leads, &mut visited);
            }
        }
        if has_paths && !path_leads.is_empty() {
            terminals = terminals.intersection(&path_leads).cloned().collect();
        }

        terminals
            .into_iter()
            .filter(|name| {
                self.adapter
                    .is_terminal_valid_in_context(&Terminal::new(name))
            })
            .collect()
    }

    /// Toggle a named contextual flag propagated to the context adapter.
    pub fn set_context_state(&mut self, name: &str, value: bool) {
        self.adapter.set_context_state(name, value);
    }

    pub fn context_state(&self, name: &str) -> bool {
        self.adapter.context_state(name)
    }

    /// Bind a callback to a production name, replacing any prior binding.
    pub fn register_callback<F: Fn(&CallbackContext) + 'static>(
        &mut self,
        production: &str,
        callback: F,
    ) {
        self.callbacks.register(production, Box::new(callback));
    }

    pub fn unregister_callback(&mut self, production: &str) -> bool {
        self.callbacks.unregister(production)
    }

    pub fn clear_callbacks(&mut self) {
        self.callbacks.clear();
    }

    /// Install the caller supplied map handed to every callback invocation.
    pub fn set_callback_context(&mut self, context: HashMap<String, String>) {
        self.callback_context = context;
    }

    pub fn callback_context(&self) -> &HashMap<String, String> {
        &self.callback_context
    }

    pub fn clear_callback_context(&mut self) {
        self.callback_context.clear();
    }

    /// A cancellation handle for the next parse run.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// The bound on paths sharing one ambiguity step (consuming path plus
    /// forks). The default is 3.
    pub fn set_fork_limit(&mut self, limit: usize) {
        self.fork_limit = limit.max(1);
    }

    pub fn fork_limit(&self) -> usize {
        self.fork_limit
    }

    /// Set a log label to debug the engine based on the level of [Log].
    pub fn set_log(&self, debugger: Log<&'static str>) -> Result<(), String> {
        self.debug
            .set(debugger)
            .map_err(|err| format!("Log label {} is already assigned.", err))
    }

    pub fn resolver(&self) -> &InheritanceResolver {
        &self.resolver
    }

    pub fn action_manager(&self) -> &SemanticActionManager {
        &self.actions
    }

    pub fn precedence_manager(&self) -> &PrecedenceManager {
        &self.precedence
    }

    /// Register a semantic action for a grammar through the engine owned
    /// manager and resolver.
    pub fn register_semantic_action(&mut self, grammar: &str, template: SemanticActionTemplate) {
        self.actions.register(&self.resolver, grammar, template);
    }

    /// Resolve a semantic action through the inheritance chain.
    pub fn get_semantic_action(
        &self,
        grammar: &str,
        action: &str,
    ) -> Option<Rc<SemanticActionTemplate>> {
        self.actions.get(&self.resolver, grammar, action)
    }

    /// Register a precedence rule for a grammar.
    pub fn register_precedence_rule(&mut self, grammar: &str, rule: PrecedenceRule) {
        self.precedence
            .register_precedence(&self.resolver, grammar, rule);
    }

    /// Compare two operators by precedence resolved through inheritance.
    pub fn compare_precedence(&self, grammar: &str, op1: &str, op2: &str) -> std::cmp::Ordering {
        self.precedence
            .compare_precedence(&self.resolver, grammar, op1, op2)
    }

    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn context_adapter(&self) -> &ContextAdapter {
        &self.adapter
    }

    pub fn context_adapter_mut(&mut self) -> &mut ContextAdapter {
        &mut self.adapter
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.paths.stats()
    }

    pub fn live_path_count(&self) -> usize {
        self.live_paths.len()
    }

    /// Tear the engine down: dispose the path pool, then the arena. Any
    /// later parse fails with [PoolError::Disposed].
    pub fn dispose(&mut self) {
        self.live_paths.clear();
        self.paths.dispose();
        self.arena.dispose();
    }

    pub(crate) fn debug_log(&self) -> Log<&'static str> {
        self.debug.get().copied().unwrap_or(Log::None)
    }

    // Release every live path back to the pool.
    pub(crate) fn reset_paths(&mut self) -> Result<(), ParserError> {
        let handles: Vec<_> = self.live_paths.drain(..).collect();
        for handle in handles {
            self.paths.release(handle)?;
        }
        Ok(())
    }

    // The start productions used to bootstrap a fresh path: the grammar's
    // own, or the nearest base grammar's when the derived grammar declares
    // none.
    pub(crate) fn start_productions_for(&self, grammar: &Rc<Grammar>) -> Vec<String> {
        if !grammar.start_productions().is_empty() {
            return grammar.start_productions().to_vec();
        }
        for link in self.resolver.inheritance_chain(grammar.name()).iter() {
            if let Some(base) = self.resolver.get(link) {
                if !base.start_productions().is_empty() {
                    return base.start_productions().to_vec();
                }
            }
        }
        Vec::new()
    }

    // Resolve a production through the inheritance chain of the grammar.
    pub(crate) fn lookup_production(
        &self,
        grammar: &Rc<Grammar>,
        name: &str,
    ) -> Option<Rc<Production>> {
        if let Some(production) = grammar.get_production(name) {
            return Some(Rc::clone(production));
        }
        for link in self.resolver.inheritance_chain(grammar.name()).iter() {
            if let Some(production) = self
                .resolver
                .get(link)
                .and_then(|g| g.get_production(name))
            {
                return Some(Rc::clone(production));
            }
        }
        None
    }

    // Collect the terminals a parts list can start with. Returns whether
    // the whole list is nullable.
    pub(crate) fn parts_first_terminals(
        &self,
        grammar: &Rc<Grammar>,
        parts: &[ProductionPart],
        out: &mut BTreeSet<String>,
        visited: &mut HashSet<String>,
    ) -> bool {
        for part in parts {
            if !self.part_first_terminals(grammar, part, out, visited) {
                return false;
            }
        }
        true
    }

    fn part_first_terminals(
        &self,
        grammar: &Rc<Grammar>,
        part: &ProductionPart,
        out: &mut BTreeSet<String>,
        visited: &mut HashSet<String>,
    ) -> bool {
        match &part.kind {
            PartKind::Terminal(name) => {
                out.insert(name.clone());
                false
            }
            PartKind::NonTerminal(name) => {
                if visited.insert(name.clone()) {
                    if let Some(production) = self.lookup_production(grammar, name) {
                        return self.parts_first_terminals(grammar, production.parts(), out, visited);
                    }
                }
                false
            }
            PartKind::Optional(inner) | PartKind::ZeroOrMore(inner) => {
                self.part_first_terminals(grammar, inner, out, visited);
                true
            }
            PartKind::OneOrMore(inner) => self.part_first_terminals(grammar, inner, out, visited),
            PartKind::Group(parts) => self.parts_first_terminals(grammar, parts, out, visited),
        }
    }
}

impl Default for StepParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StepParser {
    fn drop(&mut self) {
        self.dispose();
    }
}
