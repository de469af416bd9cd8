//! Step parsing tool (step_parse) is a library to parse a tokenized source
//! stream step by step against a grammar with inheritance, precedence,
//! associativity, semantic actions and runtime switchable contexts.
//!
//! # Overview
//! Hand written parsers for context heavy languages tend to interleave
//! grammar knowledge, scope tracking and error recovery into one loop that
//! is hard to maintain. This library splits those concerns apart: an
//! external lexer feeds [Token]s in batches, the [StepParser] engine drives
//! one or more speculative [parser paths](path::ParserPath) across the
//! stream, and a [context adapter](context::ContextAdapter) filters and
//! ranks the candidate productions of the active [Grammar](grammar::Grammar)
//! using the scope stack and symbol table built up so far.
//!
//! # Design
//!
//! A grammar is assembled programmatically or loaded from a small textual
//! rule format. Grammars may extend base grammars; rule, precedence and
//! semantic action lookup walks the inheritance chain through the
//! [InheritanceResolver](inheritance::InheritanceResolver) so a derived
//! grammar overrides exactly the rules it redefines. Ambiguous inputs fork
//! the current parser path (bounded per ambiguity step); every surviving
//! path contributes its [ProductionMatch](grammar::ProductionMatch)es to
//! the result. Paths are pool managed inside an arena budget, so heavy
//! speculation does not churn the heap.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use step_parse::grammar::{Grammar, Production, ProductionPart};
//! use step_parse::{StepParser, Token, VecTokenSource};
//!
//! let mut grammar = Grammar::new("calc");
//!
//! let mut prog = Production::new("prog");
//! prog.add_part(ProductionPart::terminal("TERM_NUM"));
//! grammar.add_production(prog).unwrap();
//!
//! let mut expr = Production::new("expr");
//! expr.add_part(ProductionPart::terminal("TERM_OP"));
//! expr.add_part(ProductionPart::terminal("TERM_NUM"));
//! grammar.add_production(expr).unwrap();
//!
//! grammar.add_start_production("prog").unwrap();
//! grammar.add_start_terminal("TERM_NUM");
//!
//! let mut parser = StepParser::new();
//! parser.set_active_grammar(Rc::new(grammar)).unwrap();
//!
//! let mut source = VecTokenSource::from_tokens(
//!     vec![Token::new(0, "TERM_NUM", "42", 1, 1)],
//!     "42",
//! );
//!
//! let outcome = parser.parse("calc", &mut source).unwrap();
//! assert_eq!(outcome.matches.len(), 1);
//! assert_eq!(outcome.matches[0].production_name(), "prog");
//! assert_eq!(outcome.matches[0].matched, "42");
//! assert!(!outcome.cancelled);
//! ```
mod error;
mod lex;
pub mod context;
pub mod engine;
pub mod grammar;
pub mod inheritance;
pub mod managers;
pub mod path;
pub mod pool;
pub mod symbols;
pub mod util;

use crate::grammar::Terminal;

pub use crate::engine::{CancelToken, ParseOutcome, StepParser, StepParserOptions};
pub use crate::error::{GrammarError, ParserError, PoolError, SymbolError};
pub use crate::util::Log;

/// Reserved terminal name: the lexer dropped the speculative lexer path the
/// token arrives on. Every parser path following it is pruned.
pub const LEXERPATH_REMOVED: &str = "LEXERPATH_REMOVED";

/// Reserved terminal name: the lexer merged the token's lexer path into the
/// path named by the token value.
pub const LEXERPATH_MERGE: &str = "LEXERPATH_MERGE";

#[derive(Debug, Clone, PartialEq)]
/// Element of the tokenized stream produced by the external lexer.
pub struct Token {
    pub lexer_path_id: u64,
    pub terminal: Terminal,
    pub value: String,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A single line of the source under parse, exposed by the token source.
pub struct SourceLine {
    pub content: String,
}

/// An interface implemented by token sources feeding the step parser.
///
/// The engine drains the source batch by batch and treats the gap between
/// batches as its only suspension and cancellation point. The reserved
/// terminal names [LEXERPATH_REMOVED] and [LEXERPATH_MERGE] carry lexer
/// path lifecycle commands inside an ordinary token.
pub trait ITokenSource {
    /// The next batch of tokens, or [None] once the input is exhausted.
    fn next_tokens(&mut self) -> Option<Vec<Token>>;

    /// The full source as lines; used to initialize the parse context.
    fn source_lines(&self) -> Vec<SourceLine>;
}

/// A token source over an in-memory token list, yielding configurable
/// batches.
pub struct VecTokenSource {
    batches: std::collections::VecDeque<Vec<Token>>,
    lines: Vec<SourceLine>,
}
