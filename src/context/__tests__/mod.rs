use crate::context::ContextAdapter;
use crate::grammar::{Grammar, Production, ProductionPart, RecoveryStrategy, Terminal};
use crate::inheritance::InheritanceResolver;
use crate::symbols::{ScopeType, SymbolKind, SymbolTable};
use crate::{Token, VecTokenSource};
use pretty_assertions::assert_eq;
use std::rc::Rc;

fn token(terminal: &str, value: &str) -> Token {
    Token::new(0, terminal, value, 1, 1)
}

fn production(name: &str) -> Rc<Production> {
    Rc::new(Production::with_parts(
        name,
        vec![ProductionPart::terminal("TERM_A")],
    ))
}

#[test]
fn position_advances_character_by_character() {
    let mut adapter = ContextAdapter::new();
    let source = VecTokenSource::from_tokens(vec![], "ab\ncd");
    adapter.initialize_for_parsing(&source);

    assert_eq!(adapter.position().line, 1);
    assert_eq!(adapter.position().column, 1);
    assert_eq!(adapter.position().offset, 0);

    adapter.update_with_token(&token("TERM_A", "ab"), None);
    assert_eq!(adapter.position().line, 1);
    assert_eq!(adapter.position().column, 3);
    assert_eq!(adapter.position().offset, 2);

    adapter.update_with_token(&token("TERM_NL", "\n"), None);
    assert_eq!(adapter.position().line, 2);
    assert_eq!(adapter.position().column, 1);
    assert_eq!(adapter.position().offset, 3);
}

#[test]
fn snapshot_synchronises_position() {
    let mut adapter = ContextAdapter::new();
    let symbols = SymbolTable::new();
    let source = VecTokenSource::from_tokens(vec![], "abcdef");
    adapter.initialize_for_parsing(&source);

    adapter.update_with_token(&token("TERM_A", "abc"), None);
    let snapshot = adapter.snapshot(&symbols);

    adapter.update_with_token(&token("TERM_A", "xyzxyz"), None);
    assert_eq!(adapter.position().offset, 9);

    // Resuming from the pinned snapshot rewinds before advancing.
    adapter.update_with_token(&token("TERM_A", "d"), Some(&snapshot));
    assert_eq!(adapter.position().offset, 4);
}

#[test]
fn equal_contexts_hash_equal() {
    let mut adapter = ContextAdapter::new();
    let mut symbols = SymbolTable::new();
    let source = VecTokenSource::from_tokens(vec![], "text");
    adapter.initialize_for_parsing(&source);

    symbols.enter_scope(ScopeType::Function, Some("f"), adapter.position());
    let first = adapter.snapshot(&symbols);
    let second = adapter.snapshot(&symbols);

    assert_eq!(first, second);
    assert_eq!(first.hash, second.hash);
    assert_eq!(first.hash, first.rehash());
}

#[test]
fn hash_tracks_scope_symbol_and_position_changes() {
    let mut adapter = ContextAdapter::new();
    let mut symbols = SymbolTable::new();
    let source = VecTokenSource::from_tokens(vec![], "text");
    adapter.initialize_for_parsing(&source);

    let base = adapter.snapshot(&symbols).hash;

    let scoped = {
        symbols.enter_scope(ScopeType::Block, None, adapter.position());
        adapter.snapshot(&symbols).hash
    };
    assert_ne!(base, scoped);

    adapter.update_with_token(&token("TERM_A", "te"), None);
    let moved = adapter.snapshot(&symbols).hash;
    assert_ne!(scoped, moved);
}

#[test]
fn ranking_is_deterministic_with_name_tie_break() {
    let adapter = ContextAdapter::new();
    let candidates = vec![
        production("prog_alt"),
        production("prog"),
        production("other"),
    ];

    let ranked = adapter.rank_productions_by_context(&candidates);

    // `prog*` names score the global scope bonus; the tie breaks on name.
    assert_eq!(ranked[0].name(), "prog");
    assert_eq!(ranked[1].name(), "prog_alt");
    assert_eq!(ranked[2].name(), "other");
}

#[test]
fn confidence_is_clamped_and_bounded() {
    let mut adapter = ContextAdapter::new();
    let mut symbols = SymbolTable::new();

    let plain = adapter.production_confidence(&production("other"));
    assert!((plain - 0.5).abs() < 1e-9);

    let scoped = adapter.production_confidence(&production("prog"));
    assert!((scoped - 0.8).abs() < 1e-9);

    // Consuming a sibling rule first adds the pattern bonus.
    adapter.update_with_production(&production("prog_head"), &token("TERM_A", "x"), &mut symbols);
    let patterned = adapter.production_confidence(&production("prog_tail"));
    assert!(patterned >= 0.9 && patterned <= 1.0);
}

#[test]
fn recovery_plan_follows_grammar_policy() {
    let mut adapter = ContextAdapter::new();
    let resolver = InheritanceResolver::new();

    let mut grammar = Grammar::new("g");
    grammar.set_recovery(RecoveryStrategy::Backtrack);
    adapter.set_grammar(&grammar, &resolver);

    let plan = adapter.error_recovery_strategy(&token("TERM_X", "?"));
    assert!(plan.can_recover);
    assert_eq!(plan.strategy, RecoveryStrategy::Backtrack);

    let mut grammar = Grammar::new("g");
    grammar.set_recovery(RecoveryStrategy::None);
    adapter.set_grammar(&grammar, &resolver);

    let plan = adapter.error_recovery_strategy(&token("TERM_X", "?"));
    assert!(!plan.can_recover);
    assert_eq!(plan.confidence, 0.0);
}

#[test]
fn skip_recovery_is_confident_on_blank_tokens() {
    let adapter = ContextAdapter::new();
    let blank = adapter.error_recovery_strategy(&token("TERM_WS", "  "));
    let other = adapter.error_recovery_strategy(&token("TERM_X", "?"));
    assert!(blank.confidence > other.confidence);
    assert_eq!(blank.strategy, RecoveryStrategy::Skip);
}

#[test]
fn scope_opening_production_pushes_scope_and_declares() {
    let mut adapter = ContextAdapter::new();
    let mut symbols = SymbolTable::new();

    adapter.update_with_production(
        &production("function_block_start"),
        &token("TERM_ID", "main"),
        &mut symbols,
    );

    assert_eq!(symbols.scope_stack().len(), 2);
    let scope = symbols.get_scope(symbols.current_scope_id()).unwrap();
    assert_eq!(scope.scope_type, ScopeType::Function);
    assert_eq!(scope.name.as_deref(), Some("main"));
    assert_eq!(adapter.context().context_stack.len(), 1);

    adapter.update_with_production(
        &production("function_block_end"),
        &token("TERM_BRACE", "}"),
        &mut symbols,
    );
    assert_eq!(symbols.scope_stack().len(), 1);
    assert!(adapter.context().context_stack.is_empty());
}

#[test]
fn symbol_defining_production_extracts_symbol() {
    let mut adapter = ContextAdapter::new();
    let mut symbols = SymbolTable::new();

    let extracted = adapter
        .extract_symbol_info(
            &production("function_declaration"),
            &token("TERM_ID", "main"),
            &symbols,
        )
        .unwrap();
    assert_eq!(extracted.kind, SymbolKind::Function);
    assert_eq!(extracted.name, "main");

    let extracted = adapter
        .extract_symbol_info(
            &production("class_definition"),
            &token("TERM_ID", "Widget"),
            &symbols,
        )
        .unwrap();
    assert_eq!(extracted.kind, SymbolKind::Class);

    let extracted = adapter
        .extract_symbol_info(
            &production("variable_declaration"),
            &token("TERM_ID", "x"),
            &symbols,
        )
        .unwrap();
    assert_eq!(extracted.kind, SymbolKind::Variable);

    assert!(adapter
        .extract_symbol_info(&production("expr"), &token("TERM_ID", "x"), &symbols)
        .is_none());

    // Applying the production declares the symbol.
    adapter.update_with_production(
        &production("variable_declaration"),
        &token("TERM_ID", "x"),
        &mut symbols,
    );
    assert!(symbols.lookup("x", symbols.current_scope_id()).is_some());

    // A second application records a reference instead of failing.
    adapter.update_with_production(
        &production("variable_declaration"),
        &token("TERM_ID", "x"),
        &mut symbols,
    );
    assert_eq!(symbols.references_of("x").len(), 1);
}

#[test]
fn terminal_validity_respects_scope_refusals() {
    let mut adapter = ContextAdapter::new();
    let mut symbols = SymbolTable::new();

    let terminal = Terminal::new("TERM_RETURN");
    assert!(adapter.is_terminal_valid_in_context(&terminal));

    adapter.forbid_terminal_in_scope(ScopeType::Global, "TERM_RETURN");
    assert!(!adapter.is_terminal_valid_in_context(&terminal));

    // Inside a function scope the terminal is allowed again.
    adapter.update_with_production(
        &production("function_body_start"),
        &token("TERM_ID", "f"),
        &mut symbols,
    );
    assert!(adapter.is_terminal_valid_in_context(&terminal));
}

#[test]
fn production_validity_respects_scope_refusals() {
    let mut adapter = ContextAdapter::new();
    let terminal = Terminal::new("TERM_A");
    let candidate = production("prog");

    assert!(adapter.is_production_valid_in_context(&candidate, &terminal));
    adapter.forbid_production_in_scope(ScopeType::Global, "prog");
    assert!(!adapter.is_production_valid_in_context(&candidate, &terminal));
}

#[test]
fn context_states_update_grammar_modifiers() {
    let mut adapter = ContextAdapter::new();
    adapter.set_context_state("strict", true);
    adapter.set_context_state("legacy", true);
    adapter.set_context_state("legacy", false);

    assert!(adapter.context_state("strict"));
    assert!(!adapter.context_state("legacy"));
    assert_eq!(
        adapter.context().parse_state.grammar_state.context_modifiers,
        vec!["strict".to_string()]
    );
}

#[test]
fn grammar_state_reflects_inheritance_chain() {
    let mut adapter = ContextAdapter::new();
    let mut resolver = InheritanceResolver::new();

    resolver.register(Rc::new(Grammar::new("base")));
    let mut derived = Grammar::new("derived");
    derived.set_base_grammars(vec!["base".to_string()]);
    let derived = Rc::new(derived);
    resolver.register(Rc::clone(&derived));

    adapter.set_grammar(&derived, &resolver);

    let state = &adapter.context().parse_state.grammar_state;
    assert_eq!(state.active_grammar, "derived");
    assert_eq!(
        state.inheritance_chain,
        vec!["derived".to_string(), "base".to_string()]
    );
    assert_eq!(state.base_grammars, vec!["base".to_string()]);
}
