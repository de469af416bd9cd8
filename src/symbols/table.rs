use super::{ScopeInfo, ScopeType, SymbolInfo, SymbolKind, SymbolStats, SymbolTable};
use crate::util::CodePosition;
use crate::SymbolError;
use std::cell::Cell;
use std::collections::HashMap;

pub const GLOBAL_SCOPE: u32 = 0;

impl SymbolInfo {
    pub fn new(name: &str, kind: SymbolKind, scope_id: u32, defined_at: CodePosition) -> Self {
        Self {
            name: name.to_string(),
            symbol_type: String::new(),
            kind,
            scope_id,
            defined_at,
            references: Vec::new(),
            context_labels: Vec::new(),
        }
    }

    pub fn with_type(mut self, symbol_type: &str) -> Self {
        self.symbol_type = symbol_type.to_string();
        self
    }

    pub fn with_context_label(mut self, label: &str) -> Self {
        self.context_labels.push(label.to_string());
        self
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = Self {
            symbols: HashMap::new(),
            scopes: HashMap::new(),
            scope_parents: HashMap::new(),
            scope_stack: Vec::new(),
            next_scope_id: 0,
            declarations: Cell::new(0),
            lookups: Cell::new(0),
            lookup_hits: Cell::new(0),
        };
        table.install_global_scope();
        table
    }

    fn install_global_scope(&mut self) {
        let global = ScopeInfo {
            id: GLOBAL_SCOPE,
            name: None,
            scope_type: ScopeType::Global,
            start: CodePosition::origin(),
            end: None,
        };
        self.scopes.insert(GLOBAL_SCOPE, global);
        self.scope_stack.push(GLOBAL_SCOPE);
        self.next_scope_id = 1;
    }

    /// Open a nested scope under the current one and make it current.
    pub fn enter_scope(
        &mut self,
        scope_type: ScopeType,
        name: Option<&str>,
        start: CodePosition,
    ) -> u32 {
        let id = self.next_scope_id;
        self.next_scope_id += 1;
        let parent = self.current_scope_id();
        self.scopes.insert(
            id,
            ScopeInfo {
                id,
                name: name.map(|n| n.to_string()),
                scope_type,
                start,
                end: None,
            },
        );
        self.scope_parents.insert(id, parent);
        self.scope_stack.push(id);
        id
    }

    /// Close the current scope and restore its parent. The global scope is
    /// never popped.
    pub fn exit_scope(&mut self, end: CodePosition) -> Option<ScopeInfo> {
        if self.scope_stack.len() <= 1 {
            return None;
        }
        let id = self.scope_stack.pop()?;
        if let Some(scope) = self.scopes.get_mut(&id) {
            scope.end = Some(end);
            return Some(scope.clone());
        }
        None
    }

    pub fn current_scope_id(&self) -> u32 {
        *self.scope_stack.last().unwrap_or(&GLOBAL_SCOPE)
    }

    pub fn scope_stack(&self) -> &[u32] {
        &self.scope_stack
    }

    pub fn get_scope(&self, id: u32) -> Option<&ScopeInfo> {
        self.scopes.get(&id)
    }

    /// Declare a symbol. A `(name, scope)` pair may be declared at most
    /// once; a duplicate fails with [SymbolError::Redeclaration].
    pub fn declare(&mut self, symbol: SymbolInfo) -> Result<(), SymbolError> {
        if !self.scopes.contains_key(&symbol.scope_id) {
            return Err(SymbolError::UnknownScope(symbol.scope_id));
        }
        let key = (symbol.name.clone(), symbol.scope_id);
        if self.symbols.contains_key(&key) {
            return Err(SymbolError::Redeclaration {
                name: symbol.name,
                scope_id: key.1,
            });
        }
        self.symbols.insert(key, symbol);
        self.declarations.set(self.declarations.get() + 1);
        Ok(())
    }

    pub fn is_declared(&self, name: &str, scope_id: u32) -> bool {
        self.symbols.contains_key(&(name.to_string(), scope_id))
    }

    /// Resolve a name starting at the given scope and walking the scope
    /// parentage to the root.
    pub fn lookup(&self, name: &str, scope_id: u32) -> Option<&SymbolInfo> {
        self.lookups.set(self.lookups.get() + 1);
        let mut current = Some(scope_id);
        while let Some(scope) = current {
            if let Some(symbol) = self.symbols.get(&(name.to_string(), scope)) {
                self.lookup_hits.set(self.lookup_hits.get() + 1);
                return Some(symbol);
            }
            current = self.scope_parents.get(&scope).copied();
        }
        None
    }

    /// Record a reference to a name resolved from the given scope.
    pub fn add_reference(
        &mut self,
        name: &str,
        scope_id: u32,
        position: CodePosition,
    ) -> Result<(), SymbolError> {
        let mut current = Some(scope_id);
        while let Some(scope) = current {
            let key = (name.to_string(), scope);
            if let Some(symbol) = self.symbols.get_mut(&key) {
                symbol.references.push(position);
                return Ok(());
            }
            current = self.scope_parents.get(&scope).copied();
        }
        Err(SymbolError::UnknownScope(scope_id))
    }

    /// All reference positions recorded for a name across every scope.
    pub fn references_of(&self, name: &str) -> Vec<CodePosition> {
        let mut references: Vec<(u32, &SymbolInfo)> = self
            .symbols
            .iter()
            .filter(|((n, _), _)| n == name)
            .map(|((_, scope), symbol)| (*scope, symbol))
            .collect();
        references.sort_by_key(|(scope, _)| *scope);
        references
            .into_iter()
            .flat_map(|(_, symbol)| symbol.references.iter().copied())
            .collect()
    }

    /// Names visible from the current scope, innermost shadowing outermost.
    pub fn visible_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .scope_stack
            .iter()
            .flat_map(|scope| {
                self.symbols
                    .keys()
                    .filter(move |(_, s)| s == scope)
                    .map(|(name, _)| name.clone())
            })
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Reset the table to a single empty global scope.
    pub fn clear(&mut self) {
        self.symbols.clear();
        self.scopes.clear();
        self.scope_parents.clear();
        self.scope_stack.clear();
        self.install_global_scope();
    }

    pub fn stats(&self) -> SymbolStats {
        SymbolStats {
            declared: self.symbols.len(),
            scopes: self.scopes.len(),
            declarations: self.declarations.get(),
            lookups: self.lookups.get(),
            lookup_hits: self.lookup_hits.get(),
        }
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
