use super::{ContextAdapter, ContextSnapshot};
use crate::symbols::SymbolTable;
use std::fmt::Write;

impl ContextAdapter {
    /// Pin the current context into a snapshot with a stable hash.
    pub fn snapshot(&self, symbols: &SymbolTable) -> ContextSnapshot {
        let scope_stack = symbols.scope_stack().to_vec();
        let symbol_context = symbols.visible_names();
        let hash = fold_hash(&canonical_form(
            &scope_stack,
            &symbol_context,
            self.position().line,
            self.position().column,
            self.position().offset,
        ));
        ContextSnapshot {
            scope_stack,
            symbol_context,
            parse_state: self.context().parse_state.clone(),
            position: self.position(),
            hash,
        }
    }

    /// The stable hash of the current context without pinning a snapshot.
    pub fn hash(&self, symbols: &SymbolTable) -> i64 {
        self.snapshot(symbols).hash
    }
}

impl ContextSnapshot {
    /// Recompute the hash of the snapshot's own fields. Equal snapshots
    /// always produce equal hashes.
    pub fn rehash(&self) -> i64 {
        fold_hash(&canonical_form(
            &self.scope_stack,
            &self.symbol_context,
            self.position.line,
            self.position.column,
            self.position.offset,
        ))
    }
}

// Canonical serialization of the hashed context fields. Symbol names are
// received sorted from the symbol table, so identical contexts serialize
// identically regardless of declaration order.
fn canonical_form(
    scope_stack: &[u32],
    symbol_context: &[String],
    line: usize,
    column: usize,
    offset: usize,
) -> String {
    let mut text = String::new();
    text.push_str("scopes=");
    for (index, scope) in scope_stack.iter().enumerate() {
        if index != 0 {
            text.push(',');
        }
        write!(text, "{}", scope).expect("writing to a string cannot fail");
    }
    text.push_str(";symbols=");
    for (index, name) in symbol_context.iter().enumerate() {
        if index != 0 {
            text.push(',');
        }
        text.push_str(name);
    }
    write!(text, ";pos={}:{}:{}", line, column, offset)
        .expect("writing to a string cannot fail");
    text
}

// The 31-multiplier string fold: h = ((h << 5) - h) + c, on wrapping i64
// arithmetic so the result is stable across runs and platforms.
fn fold_hash(text: &str) -> i64 {
    let mut hash: i64 = 0;
    for c in text.chars() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(c as i64);
    }
    hash
}
