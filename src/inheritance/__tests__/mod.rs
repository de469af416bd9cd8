use crate::grammar::Grammar;
use crate::inheritance::InheritanceResolver;
use pretty_assertions::assert_eq;
use std::rc::Rc;

fn grammar(name: &str, bases: &[&str]) -> Rc<Grammar> {
    let mut grammar = Grammar::new(name);
    grammar.set_base_grammars(bases.iter().map(|b| b.to_string()).collect());
    Rc::new(grammar)
}

fn linear_registry() -> InheritanceResolver {
    let mut resolver = InheritanceResolver::new();
    resolver.register(grammar("a", &[]));
    resolver.register(grammar("b", &["a"]));
    resolver.register(grammar("c", &["b"]));
    resolver
}

#[test]
fn chain_is_most_derived_first() {
    let resolver = linear_registry();
    assert_eq!(
        *resolver.inheritance_chain("c"),
        vec!["c".to_string(), "b".to_string(), "a".to_string()]
    );
    assert_eq!(*resolver.inheritance_chain("a"), vec!["a".to_string()]);
}

#[test]
fn chain_contains_each_base_once() {
    // Diamond: d extends b and c, both extend a.
    let mut resolver = InheritanceResolver::new();
    resolver.register(grammar("a", &[]));
    resolver.register(grammar("b", &["a"]));
    resolver.register(grammar("c", &["a"]));
    resolver.register(grammar("d", &["b", "c"]));

    let chain = resolver.inheritance_chain("d");
    assert_eq!(chain.iter().filter(|n| n.as_str() == "a").count(), 1);
    assert_eq!(chain.len(), 4);
    assert_eq!(chain[0], "d");
}

#[test]
fn inherits_from_matches_chain_membership() {
    let resolver = linear_registry();
    for derived in ["a", "b", "c"] {
        for base in ["a", "b", "c"] {
            let chain = resolver.inheritance_chain(derived);
            assert_eq!(
                resolver.inherits_from(derived, base),
                chain.iter().any(|n| n == base),
                "inherits_from({}, {})",
                derived,
                base
            );
        }
    }
    assert!(resolver.inherits_from("c", "a"));
    assert!(!resolver.inherits_from("a", "c"));
}

#[test]
fn dependents_are_transitive() {
    let resolver = linear_registry();
    let dependents = resolver.dependents("a");
    assert!(dependents.contains("b"));
    assert!(dependents.contains("c"));
    assert_eq!(dependents.len(), 2);
    assert!(resolver.dependents("c").is_empty());
}

#[test]
fn common_base_picks_most_derived() {
    let mut resolver = InheritanceResolver::new();
    resolver.register(grammar("a", &[]));
    resolver.register(grammar("b", &["a"]));
    resolver.register(grammar("x", &["b"]));
    resolver.register(grammar("y", &["b"]));

    assert_eq!(resolver.common_base(&["x", "y"]), Some("b".to_string()));
    assert_eq!(resolver.common_base(&["x", "a"]), Some("a".to_string()));
    assert_eq!(resolver.common_base(&[]), None);

    resolver.register(grammar("z", &[]));
    assert_eq!(resolver.common_base(&["x", "z"]), None);
}

#[test]
fn cycles_terminate_lookup_and_are_reported() {
    let mut resolver = InheritanceResolver::new();
    resolver.register(grammar("a", &["c"]));
    resolver.register(grammar("b", &["a"]));
    resolver.register(grammar("c", &["b"]));
    resolver.register(grammar("free", &[]));

    // Lookup terminates instead of erroring.
    let chain = resolver.inheritance_chain("a");
    assert_eq!(chain.len(), 3);

    assert_eq!(
        resolver.validate(),
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    );
}

#[test]
fn acyclic_registry_validates_empty() {
    let resolver = linear_registry();
    assert!(resolver.validate().is_empty());
}

#[test]
fn register_unregister_round_trip() {
    let mut resolver = linear_registry();
    let before = resolver.stats().registered;

    resolver.register(grammar("tmp", &["c"]));
    assert!(resolver.inherits_from("tmp", "a"));
    resolver.unregister("tmp");

    assert_eq!(resolver.stats().registered, before);
    assert!(!resolver.is_registered("tmp"));
    assert!(resolver.dependents("a").iter().all(|n| n != "tmp"));
}

#[test]
fn registration_invalidates_cached_chains() {
    let mut resolver = linear_registry();
    assert_eq!(resolver.inheritance_chain("c").len(), 3);

    // Re-register b without its base; c's chain must shrink.
    resolver.register(grammar("b", &[]));
    assert_eq!(
        *resolver.inheritance_chain("c"),
        vec!["c".to_string(), "b".to_string()]
    );

    // Unregister b entirely; the chain keeps the dangling name only.
    resolver.unregister("b");
    assert_eq!(
        *resolver.inheritance_chain("c"),
        vec!["c".to_string(), "b".to_string()]
    );
}

#[test]
fn chain_cache_hits_are_counted() {
    let resolver = linear_registry();
    resolver.inheritance_chain("c");
    resolver.inheritance_chain("c");
    let stats = resolver.stats();
    assert!(stats.chain_cache_hits >= 1);
    assert!(stats.chains_computed >= 1);
}
