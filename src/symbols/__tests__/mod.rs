use crate::symbols::{ScopeType, SymbolInfo, SymbolKind, SymbolTable};
use crate::util::CodePosition;
use crate::SymbolError;
use pretty_assertions::assert_eq;

fn at(line: usize, column: usize) -> CodePosition {
    CodePosition::new(line, column, 0)
}

#[test]
fn redeclaration_in_same_scope_fails() {
    let mut table = SymbolTable::new();
    table
        .declare(SymbolInfo::new("x", SymbolKind::Variable, 0, at(1, 1)))
        .unwrap();
    match table.declare(SymbolInfo::new("x", SymbolKind::Variable, 0, at(2, 1))) {
        Err(SymbolError::Redeclaration { name, scope_id }) => {
            assert_eq!(name, "x");
            assert_eq!(scope_id, 0);
        }
        other => panic!("Expected Redeclaration, got {:?}.", other),
    }
}

#[test]
fn lookup_walks_scope_parents() {
    let mut table = SymbolTable::new();
    table
        .declare(SymbolInfo::new("outer", SymbolKind::Variable, 0, at(1, 1)))
        .unwrap();

    let inner = table.enter_scope(ScopeType::Function, Some("f"), at(2, 1));
    table
        .declare(SymbolInfo::new("inner", SymbolKind::Variable, inner, at(3, 1)))
        .unwrap();

    assert_eq!(table.lookup("inner", inner).unwrap().scope_id, inner);
    assert_eq!(table.lookup("outer", inner).unwrap().scope_id, 0);
    assert!(table.lookup("missing", inner).is_none());

    // The outer scope cannot see inwards.
    assert!(table.lookup("inner", 0).is_none());
}

#[test]
fn shadowing_resolves_to_innermost() {
    let mut table = SymbolTable::new();
    table
        .declare(SymbolInfo::new("x", SymbolKind::Variable, 0, at(1, 1)))
        .unwrap();
    let inner = table.enter_scope(ScopeType::Block, None, at(2, 1));
    table
        .declare(SymbolInfo::new("x", SymbolKind::Variable, inner, at(2, 5)))
        .unwrap();

    assert_eq!(table.lookup("x", inner).unwrap().scope_id, inner);
}

#[test]
fn exit_scope_restores_parent_and_records_end() {
    let mut table = SymbolTable::new();
    let inner = table.enter_scope(ScopeType::Block, None, at(2, 1));
    assert_eq!(table.current_scope_id(), inner);

    let closed = table.exit_scope(at(5, 1)).unwrap();
    assert_eq!(closed.id, inner);
    assert_eq!(closed.end, Some(at(5, 1)));
    assert_eq!(table.current_scope_id(), 0);

    // The global scope is never popped.
    assert!(table.exit_scope(at(6, 1)).is_none());
    assert_eq!(table.current_scope_id(), 0);
}

#[test]
fn references_accumulate_across_scopes() {
    let mut table = SymbolTable::new();
    table
        .declare(SymbolInfo::new("f", SymbolKind::Function, 0, at(1, 1)))
        .unwrap();
    let inner = table.enter_scope(ScopeType::Function, Some("g"), at(2, 1));

    table.add_reference("f", inner, at(3, 2)).unwrap();
    table.add_reference("f", 0, at(4, 2)).unwrap();

    let references = table.references_of("f");
    assert_eq!(references.len(), 2);
    assert!(table.add_reference("missing", inner, at(5, 1)).is_err());
}

#[test]
fn visible_names_follow_the_stack() {
    let mut table = SymbolTable::new();
    table
        .declare(SymbolInfo::new("a", SymbolKind::Variable, 0, at(1, 1)))
        .unwrap();
    let inner = table.enter_scope(ScopeType::Block, None, at(2, 1));
    table
        .declare(SymbolInfo::new("b", SymbolKind::Variable, inner, at(2, 2)))
        .unwrap();

    assert_eq!(table.visible_names(), vec!["a".to_string(), "b".to_string()]);

    table.exit_scope(at(3, 1));
    assert_eq!(table.visible_names(), vec!["a".to_string()]);
}

#[test]
fn clear_resets_to_global_scope() {
    let mut table = SymbolTable::new();
    table.enter_scope(ScopeType::Class, Some("C"), at(1, 1));
    table
        .declare(SymbolInfo::new(
            "m",
            SymbolKind::Function,
            table.current_scope_id(),
            at(2, 1),
        ))
        .unwrap();

    table.clear();
    assert_eq!(table.current_scope_id(), 0);
    assert_eq!(table.stats().declared, 0);
    assert_eq!(table.scope_stack(), &[0]);
}
