use crate::engine::{StepParser, StepParserOptions};
use crate::grammar::{Grammar, Production, ProductionPart, RecoveryStrategy};
use crate::{ParserError, PoolError, Token, VecTokenSource};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;

fn single_rule_grammar() -> Grammar {
    let mut grammar = Grammar::new("calc");
    grammar
        .add_production(Production::with_parts(
            "prog",
            vec![ProductionPart::terminal("TERM_A")],
        ))
        .unwrap();
    grammar.add_start_production("prog").unwrap();
    grammar.add_start_terminal("TERM_A");
    grammar
}

fn ambiguous_grammar() -> Grammar {
    let mut grammar = Grammar::new("calc");
    grammar
        .add_production(Production::with_parts(
            "prog",
            vec![ProductionPart::terminal("TERM_A")],
        ))
        .unwrap();
    grammar
        .add_production(Production::with_parts(
            "prog_alt",
            vec![ProductionPart::terminal("TERM_A")],
        ))
        .unwrap();
    grammar.add_start_production("prog").unwrap();
    grammar.add_start_production("prog_alt").unwrap();
    grammar
}

fn active_parser(grammar: Grammar) -> StepParser {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut parser = StepParser::new();
    parser.set_active_grammar(Rc::new(grammar)).unwrap();
    parser
}

#[test]
fn single_token_single_production() {
    let mut parser = active_parser(single_rule_grammar());
    let mut source = VecTokenSource::from_tokens(
        vec![Token::new(0, "TERM_A", "hello", 1, 1)],
        "hello",
    );

    let outcome = parser.parse("calc", &mut source).unwrap();

    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(outcome.matches[0].production_name(), "prog");
    assert_eq!(outcome.matches[0].matched, "hello");
    assert_eq!(outcome.matches[0].start, 0);
    assert_eq!(outcome.matches[0].end, 5);
    assert!(!outcome.cancelled);
    assert_eq!(outcome.paths_explored, 1);
    assert_eq!(parser.pool_stats().in_use, 0);
}

#[test]
fn grammar_name_mismatch_fails() {
    let mut parser = active_parser(single_rule_grammar());
    let mut source = VecTokenSource::from_tokens(vec![], "");

    match parser.parse("other", &mut source) {
        Err(ParserError::GrammarNotActive { requested, active }) => {
            assert_eq!(requested, "other");
            assert_eq!(active, "calc");
        }
        other => panic!("Expected GrammarNotActive, got {:?}.", other),
    }

    let mut parser = StepParser::new();
    assert!(matches!(
        parser.parse("calc", &mut source),
        Err(ParserError::NoActiveGrammar)
    ));
}

#[test]
fn ambiguity_forks_and_ranks() {
    let mut parser = active_parser(ambiguous_grammar());
    let mut source =
        VecTokenSource::from_tokens(vec![Token::new(0, "TERM_A", "x", 1, 1)], "x");

    let outcome = parser.parse("calc", &mut source).unwrap();

    // The consuming path takes the higher ranked production; the fork takes
    // the alternative. Matches concatenate in ascending path id order.
    assert_eq!(outcome.matches.len(), 2);
    assert_eq!(outcome.matches[0].production_name(), "prog");
    assert_eq!(outcome.matches[1].production_name(), "prog_alt");
    assert_eq!(outcome.matches[0].end, 1);
    assert_eq!(outcome.matches[1].end, 1);
    assert_eq!(outcome.paths_explored, 2);
    assert_eq!(parser.pool_stats().in_use, 0);
}

#[test]
fn fork_bound_caps_paths_per_ambiguity() {
    let mut grammar = Grammar::new("calc");
    for name in ["alt_a", "alt_b", "alt_c", "alt_d", "alt_e"] {
        grammar
            .add_production(Production::with_parts(
                name,
                vec![ProductionPart::terminal("TERM_A")],
            ))
            .unwrap();
        grammar.add_start_production(name).unwrap();
    }
    let mut parser = active_parser(grammar);
    let mut source =
        VecTokenSource::from_tokens(vec![Token::new(0, "TERM_A", "x", 1, 1)], "x");

    let outcome = parser.parse("calc", &mut source).unwrap();

    // Five alternatives, but at most 3 paths share one ambiguity step.
    assert_eq!(outcome.paths_explored, 3);
    assert_eq!(outcome.matches.len(), 3);
}

#[test]
fn fork_limit_is_configurable() {
    let mut grammar = Grammar::new("calc");
    for name in ["alt_a", "alt_b", "alt_c", "alt_d", "alt_e"] {
        grammar
            .add_production(Production::with_parts(
                name,
                vec![ProductionPart::terminal("TERM_A")],
            ))
            .unwrap();
        grammar.add_start_production(name).unwrap();
    }
    let mut parser = active_parser(grammar);
    parser.set_fork_limit(5);
    let mut source =
        VecTokenSource::from_tokens(vec![Token::new(0, "TERM_A", "x", 1, 1)], "x");

    let outcome = parser.parse("calc", &mut source).unwrap();
    assert_eq!(outcome.paths_explored, 5);
}

#[test]
fn lexer_path_removal_prunes_paths() {
    let mut parser = active_parser(ambiguous_grammar());
    // Two tokens fork two paths on lexer path 7, then the path is removed
    // and a fresh token bootstraps a new parser path.
    let mut source = VecTokenSource::from_tokens(
        vec![
            Token::new(7, "TERM_A", "x", 1, 1),
            Token::path_removed(7, 1, 2),
            Token::new(7, "TERM_A", "y", 1, 3),
        ],
        "x y",
    );

    let outcome = parser.parse("calc", &mut source).unwrap();

    // Only the post-removal bootstrap survives; its forked sibling does too.
    assert!(outcome
        .matches
        .iter()
        .all(|production_match| production_match.matched == "y"));
    assert_eq!(parser.pool_stats().in_use, 0);
}

#[test]
fn lexer_path_merge_reassigns_paths() {
    let mut grammar = Grammar::new("calc");
    grammar
        .add_production(Production::with_parts(
            "pair",
            vec![
                ProductionPart::terminal("TERM_A"),
                ProductionPart::terminal("TERM_B"),
            ],
        ))
        .unwrap();
    grammar.add_start_production("pair").unwrap();
    let mut parser = active_parser(grammar);

    // Paths on lexer paths 3 and 9; 3 merges into 9, after which a token on
    // 9 continues the merged frontier.
    let mut source = VecTokenSource::from_tokens(
        vec![
            Token::new(9, "TERM_A", "a", 1, 1),
            Token::new(3, "TERM_A", "b", 1, 2),
            Token::path_merge(3, 9, 1, 3),
            Token::new(9, "TERM_B", "c", 1, 4),
        ],
        "abc",
    );

    let outcome = parser.parse("calc", &mut source).unwrap();

    // Both original paths matched `pair`'s head; both now live on 9 and the
    // trailing token reaches them there.
    assert_eq!(outcome.matches.iter().filter(|m| m.matched == "a").count(), 1);
    assert_eq!(outcome.matches.iter().filter(|m| m.matched == "b").count(), 1);
    assert_eq!(parser.pool_stats().in_use, 0);
}

#[test]
fn skip_recovery_advances_without_match() {
    let mut grammar = single_rule_grammar();
    grammar.set_recovery(RecoveryStrategy::Skip);
    let mut parser = active_parser(grammar);

    let mut source = VecTokenSource::from_tokens(
        vec![
            Token::new(0, "TERM_Y", "?", 1, 1),
            Token::new(0, "TERM_A", "ok", 1, 2),
        ],
        "? ok",
    );

    let outcome = parser.parse("calc", &mut source).unwrap();

    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(outcome.matches[0].matched, "ok");
    // The skipped token advanced the position by its length.
    assert_eq!(outcome.matches[0].start, 1);
    assert_eq!(outcome.matches[0].end, 3);
}

#[test]
fn none_recovery_prunes_the_path() {
    let mut grammar = single_rule_grammar();
    grammar.set_recovery(RecoveryStrategy::None);
    let mut parser = active_parser(grammar);

    let mut source = VecTokenSource::from_tokens(
        vec![
            Token::new(0, "TERM_Y", "?", 1, 1),
            Token::new(0, "TERM_A", "ok", 1, 2),
        ],
        "? ok",
    );

    let outcome = parser.parse("calc", &mut source).unwrap();

    // The first token pruned the bootstrap path; the second bootstraps a
    // fresh one which matches.
    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(outcome.matches[0].matched, "ok");
    assert_eq!(parser.pool_stats().in_use, 0);
}

#[test]
fn multi_part_production_records_tail() {
    let mut grammar = Grammar::new("calc");
    grammar
        .add_production(Production::with_parts(
            "pair",
            vec![
                ProductionPart::terminal("TERM_A"),
                ProductionPart::non_terminal("rest"),
            ],
        ))
        .unwrap();
    grammar
        .add_production(Production::with_parts(
            "rest",
            vec![ProductionPart::terminal("TERM_B")],
        ))
        .unwrap();
    grammar.add_start_production("pair").unwrap();
    let mut parser = active_parser(grammar);

    let mut source =
        VecTokenSource::from_tokens(vec![Token::new(0, "TERM_A", "a", 1, 1)], "a");
    parser.parse("calc", &mut source).unwrap();

    // After consuming the head, the tail constrains the valid terminals.
    assert_eq!(
        parser.valid_terminals_for_lexer_path(0),
        vec!["TERM_B".to_string()]
    );
}

#[test]
fn valid_terminals_fall_back_to_start_terminals() {
    let parser = active_parser(single_rule_grammar());
    assert_eq!(
        parser.valid_terminals_for_lexer_path(0),
        vec!["TERM_A".to_string()]
    );
}

#[test]
fn callbacks_fire_with_context() {
    let mut parser = active_parser(single_rule_grammar());
    let seen: Rc<RefCell<Vec<(String, String, String)>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);

    parser.register_callback("prog", move |context| {
        sink.borrow_mut().push((
            context.production.name().to_string(),
            context.token.value.clone(),
            context
                .custom
                .get("request")
                .cloned()
                .unwrap_or_default(),
        ));
    });
    parser.set_callback_context(
        [("request".to_string(), "r-42".to_string())].into_iter().collect(),
    );

    let mut source = VecTokenSource::from_tokens(
        vec![Token::new(0, "TERM_A", "hello", 1, 1)],
        "hello",
    );
    parser.parse("calc", &mut source).unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "prog");
    assert_eq!(seen[0].1, "hello");
    assert_eq!(seen[0].2, "r-42");
}

#[test]
fn panicking_callback_does_not_abort_parse() {
    let mut parser = active_parser(single_rule_grammar());
    parser.register_callback("prog", |_| panic!("callback exploded"));

    let mut source = VecTokenSource::from_tokens(
        vec![Token::new(0, "TERM_A", "hello", 1, 1)],
        "hello",
    );

    let outcome = parser.parse("calc", &mut source).unwrap();
    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(parser.pool_stats().in_use, 0);
}

#[test]
fn legacy_production_hook_fires() {
    let seen: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);

    let mut grammar = Grammar::new("calc");
    let mut prog = Production::with_parts("prog", vec![ProductionPart::terminal("TERM_A")]);
    prog.set_callback(Rc::new(move |production_match| {
        sink.borrow_mut().push(production_match.matched.clone());
    }));
    grammar.add_production(prog).unwrap();
    grammar.add_start_production("prog").unwrap();

    let mut parser = active_parser(grammar);
    let mut source = VecTokenSource::from_tokens(
        vec![Token::new(0, "TERM_A", "hello", 1, 1)],
        "hello",
    );
    parser.parse("calc", &mut source).unwrap();

    assert_eq!(*seen.borrow(), vec!["hello".to_string()]);
}

#[test]
fn cancellation_returns_partial_matches() {
    let mut parser = active_parser(single_rule_grammar());
    let cancel = parser.cancel_token();
    parser.register_callback("prog", move |_| cancel.cancel());

    let mut source = VecTokenSource::from_batches(
        vec![
            vec![Token::new(0, "TERM_A", "one", 1, 1)],
            vec![Token::new(0, "TERM_A", "two", 1, 5)],
        ],
        "one two",
    );

    let outcome = parser.parse("calc", &mut source).unwrap();

    assert!(outcome.cancelled);
    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(outcome.matches[0].matched, "one");
    assert_eq!(parser.pool_stats().in_use, 0);
}

#[test]
fn reactivating_a_grammar_clears_paths() {
    let mut parser = active_parser(single_rule_grammar());
    let mut source = VecTokenSource::from_tokens(
        vec![Token::new(0, "TERM_A", "hello", 1, 1)],
        "hello",
    );
    parser.parse("calc", &mut source).unwrap();

    // Activating the same grammar again is equivalent to the first call.
    let grammar = Rc::clone(parser.active_grammar().unwrap());
    parser.set_active_grammar(grammar).unwrap();
    assert_eq!(parser.live_path_count(), 0);
    assert_eq!(parser.pool_stats().in_use, 0);

    let mut source = VecTokenSource::from_tokens(
        vec![Token::new(0, "TERM_A", "again", 1, 1)],
        "again",
    );
    let outcome = parser.parse("calc", &mut source).unwrap();
    assert_eq!(outcome.matches.len(), 1);
}

#[test]
fn context_states_round_trip() {
    let mut parser = active_parser(single_rule_grammar());
    assert!(!parser.context_state("strict"));
    parser.set_context_state("strict", true);
    assert!(parser.context_state("strict"));
    parser.set_context_state("strict", false);
    assert!(!parser.context_state("strict"));
}

#[test]
fn parse_after_dispose_fails() {
    let mut parser = active_parser(single_rule_grammar());
    parser.dispose();

    let mut source = VecTokenSource::from_tokens(
        vec![Token::new(0, "TERM_A", "hello", 1, 1)],
        "hello",
    );
    assert!(matches!(
        parser.parse("calc", &mut source),
        Err(ParserError::Pool(PoolError::Disposed))
    ));
}

#[test]
fn pool_exhaustion_propagates() {
    let mut parser = StepParser::with_options(StepParserOptions {
        arena_bytes: 64 * 1024,
        pool_initial: 1,
        pool_max: 1,
        fork_limit: 3,
    })
    .unwrap();
    parser.set_active_grammar(Rc::new(ambiguous_grammar())).unwrap();

    // The ambiguity needs a second path but the pool holds one slot.
    let mut source =
        VecTokenSource::from_tokens(vec![Token::new(0, "TERM_A", "x", 1, 1)], "x");
    assert!(matches!(
        parser.parse("calc", &mut source),
        Err(ParserError::Pool(PoolError::Exhausted { .. }))
    ));
    assert_eq!(parser.pool_stats().in_use, 0);
}

#[test]
fn inherited_start_productions_bootstrap_derived_grammar() {
    let mut parser = StepParser::new();

    let mut base = Grammar::new("base");
    base.add_production(Production::with_parts(
        "prog",
        vec![ProductionPart::terminal("TERM_A")],
    ))
    .unwrap();
    base.add_start_production("prog").unwrap();
    parser.register_grammar(Rc::new(base));

    let mut derived = Grammar::new("derived");
    derived.set_base_grammars(vec!["base".to_string()]);
    parser.set_active_grammar(Rc::new(derived)).unwrap();

    let mut source = VecTokenSource::from_tokens(
        vec![Token::new(0, "TERM_A", "hello", 1, 1)],
        "hello",
    );
    let outcome = parser.parse("derived", &mut source).unwrap();

    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(outcome.matches[0].production_name(), "prog");
}
