use crate::grammar::{
    Associativity, Grammar, PartKind, PrecedenceRule, Production, ProductionPart, RecoveryStrategy,
    SemanticActionTemplate, TokenSplitter,
};
use crate::GrammarError;
use pretty_assertions::assert_eq;

fn sample_grammar() -> Grammar {
    let mut grammar = Grammar::new("calc");
    let mut prog = Production::new("prog");
    prog.add_part(ProductionPart::terminal("TERM_NUM"));
    prog.add_part(ProductionPart::optional(ProductionPart::non_terminal(
        "expr",
    )));
    grammar.add_production(prog).unwrap();
    grammar
        .add_production(Production::with_parts(
            "expr",
            vec![
                ProductionPart::terminal("TERM_OP"),
                ProductionPart::terminal("TERM_NUM"),
            ],
        ))
        .unwrap();
    grammar.add_start_production("prog").unwrap();
    grammar.add_start_terminal("TERM_NUM");
    grammar
}

#[test]
fn duplicate_production_is_rejected() {
    let mut grammar = sample_grammar();
    match grammar.add_production(Production::new("prog")) {
        Err(GrammarError::DuplicateProduction {
            grammar: g,
            production,
        }) => {
            assert_eq!(g, "calc");
            assert_eq!(production, "prog");
        }
        other => panic!("Expected DuplicateProduction, got {:?}.", other),
    }
}

#[test]
fn start_production_must_exist() {
    let mut grammar = sample_grammar();
    assert!(matches!(
        grammar.add_start_production("missing"),
        Err(GrammarError::UnknownProduction { .. })
    ));
    // Adding a known start twice keeps the list deduplicated.
    grammar.add_start_production("prog").unwrap();
    assert_eq!(grammar.start_productions(), &["prog".to_string()]);
}

#[test]
fn production_lookup_by_name() {
    let grammar = sample_grammar();
    let prog = grammar.get_production("prog").unwrap();
    assert_eq!(prog.name(), "prog");
    assert_eq!(prog.leading_terminal(), Some("TERM_NUM"));
    assert!(grammar.get_production("nope").is_none());
}

#[test]
fn leading_terminal_ignores_wrapped_parts() {
    let production = Production::with_parts(
        "wrapped",
        vec![ProductionPart::optional(ProductionPart::terminal(
            "TERM_A",
        ))],
    );
    assert_eq!(production.leading_terminal(), None);
}

#[test]
fn semantic_action_instantiation() {
    let template = SemanticActionTemplate::new(
        "emit",
        "push(${value}, ${slot})",
        vec!["value", "slot"],
        "str",
    );
    assert_eq!(template.instantiate(&["41", "x"]).unwrap(), "push(41, x)");
    assert!(matches!(
        template.instantiate(&["41"]),
        Err(GrammarError::ActionArity {
            expected: 2,
            received: 1,
            ..
        })
    ));
}

#[test]
fn token_splitter_pattern_compiles() {
    let mut grammar = sample_grammar();
    grammar.set_token_splitter_pattern(r"\w+").unwrap();
    assert!(matches!(
        grammar.token_splitter(),
        TokenSplitter::Regex(_)
    ));
    assert!(matches!(
        grammar.set_token_splitter_pattern("["),
        Err(GrammarError::Pattern { .. })
    ));
}

#[test]
fn load_from_content_round_trip() {
    let text = r#"
        grammar calc;
        extends base, shared;
        terminal TERM_NUM;
        start prog;
        recovery backtrack;
        left 10 + - ;
        right 20 * / ;
        action emit(value) -> str = "push(${value})";
        rule prog -> TERM_NUM expr? ;
        rule expr -> TERM_OP (TERM_NUM ident)* ;
    "#;
    let grammar = Grammar::load_from_content(text, "calc.sg").unwrap();

    assert_eq!(grammar.name(), "calc");
    assert_eq!(
        grammar.base_grammars(),
        &["base".to_string(), "shared".to_string()]
    );
    assert_eq!(grammar.start_productions(), &["prog".to_string()]);
    assert!(grammar.valid_start_terminals().contains("TERM_NUM"));
    assert_eq!(grammar.recovery(), RecoveryStrategy::Backtrack);
    assert_eq!(grammar.precedence_rules().len(), 2);
    assert_eq!(grammar.precedence_rules()[0].level, 10);
    assert_eq!(
        grammar.precedence_rules()[0].associativity,
        Associativity::Left
    );
    assert!(grammar.precedence_rules()[1].covers("*"));

    let action = grammar.get_semantic_action("emit").unwrap();
    assert_eq!(action.instantiate(&["7"]).unwrap(), "push(7)");

    let expr = grammar.get_production("expr").unwrap();
    assert_eq!(expr.parts().len(), 2);
    match &expr.parts()[1].kind {
        PartKind::ZeroOrMore(inner) => match &inner.kind {
            PartKind::Group(parts) => {
                assert_eq!(parts.len(), 2);
                assert_eq!(parts[0].terminal_name(), Some("TERM_NUM"));
                assert!(matches!(&parts[1].kind, PartKind::NonTerminal(name) if name == "ident"));
            }
            other => panic!("Expected group, got {:?}.", other),
        },
        other => panic!("Expected zero-or-more, got {:?}.", other),
    }
}

#[test]
fn load_rejects_malformed_text() {
    assert!(matches!(
        Grammar::load_from_content("", "empty.sg"),
        Err(GrammarError::Load { .. })
    ));
    assert!(matches!(
        Grammar::load_from_content("rule a -> B;", "headless.sg"),
        Err(GrammarError::Load { .. })
    ));
    assert!(matches!(
        Grammar::load_from_content("grammar g; rule a -> ;", "body.sg"),
        Err(GrammarError::Load { .. })
    ));
    assert!(matches!(
        Grammar::load_from_content("grammar g; start missing;", "start.sg"),
        Err(GrammarError::Load { .. })
    ));
}

#[test]
fn build_grammar_lists_rules() {
    let grammar = sample_grammar();
    let text = grammar.build_grammar().unwrap();
    assert!(text.contains("grammar calc;"));
    assert!(text.contains("start prog;"));
    assert!(text.contains("rule prog -> TERM_NUM expr? ;"));
}

#[test]
fn production_part_display_and_print() {
    let production = Production::with_parts(
        "expr",
        vec![
            ProductionPart::terminal("TERM_OP"),
            ProductionPart::zero_or_more(ProductionPart::group(vec![
                ProductionPart::terminal("TERM_NUM"),
                ProductionPart::non_terminal("ident"),
            ])),
        ],
    );
    assert_eq!(format!("{}", production.parts()[1]), "(TERM_NUM ident)*");
    production.print().unwrap();
}

#[test]
fn precedence_rule_display() {
    let rule = PrecedenceRule::new(10, vec!["+", "-"], Associativity::Left)
        .with_description("additive operators");
    assert!(rule.covers("+"));
    assert!(!rule.covers("*"));
    assert_eq!(rule.description, "additive operators");
}
