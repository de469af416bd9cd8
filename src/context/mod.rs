//! A module consist of the context adapter, the decision surface of the
//! step parser.
//!
//! The adapter maintains the rolling [ContextInfo] of a parse: the scope
//! stack, the visible symbols, the parse state and the cursor position. It
//! produces pinnable [ContextSnapshot]s with a stable hash, filters and
//! ranks candidate productions, scores confidence and proposes error
//! recovery. The engine consults it on every token; the scoring heuristics
//! are deliberately simple constants collected in one place.
mod adapter;
mod snapshot;

use crate::grammar::{GrammarFormat, RecoveryStrategy};
use crate::symbols::{ScopeInfo, ScopeType};
use crate::util::{CodePosition, SourceText};
use std::collections::{BTreeSet, HashMap};

#[cfg(test)]
mod __tests__;

#[derive(Debug, Clone, PartialEq, Default)]
/// The grammar related portion of the parse state.
pub struct GrammarState {
    pub active_grammar: String,
    pub format: GrammarFormat,
    pub base_grammars: Vec<String>,
    pub active_rules: Vec<String>,
    pub context_modifiers: Vec<String>,
    pub inheritance_chain: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
/// The full parse state carried by the rolling context.
pub struct ParseStateInfo {
    pub current_rule: Option<String>,
    pub position: CodePosition,
    pub context_stack: Vec<String>,
    pub scope_stack: Vec<u32>,
    pub valid_terminals: Vec<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
    pub grammar_state: GrammarState,
}

#[derive(Debug, Clone, PartialEq)]
/// The running context snapshot maintained by the adapter.
pub struct ContextInfo {
    pub scope: ScopeInfo,
    pub scope_stack: Vec<ScopeInfo>,
    pub context_stack: Vec<String>,
    pub symbols: Vec<String>,
    pub parse_state: ParseStateInfo,
    pub active_grammar: Option<String>,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq)]
/// A pinnable record of scopes, symbols, parse state and position.
///
/// The hash is a deterministic function of the scope ids, the symbol names
/// in scope and the position; equal snapshots produce equal hashes.
pub struct ContextSnapshot {
    pub scope_stack: Vec<u32>,
    pub symbol_context: Vec<String>,
    pub parse_state: ParseStateInfo,
    pub position: CodePosition,
    pub hash: i64,
}

#[derive(Debug, Clone, PartialEq)]
/// The adapter's proposal for handling a token no production matched.
pub struct RecoveryPlan {
    pub can_recover: bool,
    pub strategy: RecoveryStrategy,
    pub suggestion: String,
    pub confidence: f64,
}

/// Maintains the rolling parse context and exposes the context sensitive
/// predicates of the engine.
pub struct ContextAdapter {
    context: ContextInfo,
    position: CodePosition,
    source: Option<SourceText>,
    context_states: HashMap<String, bool>,
    recovery: RecoveryStrategy,
    forbidden_terminals: HashMap<ScopeType, BTreeSet<String>>,
    forbidden_productions: HashMap<ScopeType, BTreeSet<String>>,
}

// Confidence model constants. A production starts at the base and collects
// the bonuses it qualifies for; the sum is clamped to 1.0.
pub(crate) const CONFIDENCE_BASE: f64 = 0.5;
pub(crate) const CONFIDENCE_SCOPE_BONUS: f64 = 0.3;
pub(crate) const CONFIDENCE_PATTERN_BONUS: f64 = 0.2;
