//! A module consist of the step parser engine which orchestrates token
//! intake, multi-path forking and merging, match construction, callback
//! dispatch and error recovery.
//!
//! The engine is a sequential state machine over a token iterator: it
//! drains the source batch by batch, dispatches every token to the live
//! [parser paths](crate::path::ParserPath) of the token's lexer path and
//! applies the resulting step actions. All paths flow through the engine
//! owned object pool; the union of every surviving path's matches is the
//! parse result.
mod callbacks;
mod parser;
mod step;

use crate::context::ContextAdapter;
use crate::grammar::{Grammar, Production, ProductionMatch, ProductionPart};
use crate::inheritance::InheritanceResolver;
use crate::managers::{PrecedenceManager, SemanticActionManager};
use crate::path::ParserPath;
use crate::pool::{Arena, ObjectPool, PoolRef};
use crate::symbols::SymbolTable;
use crate::util::Log;
use once_cell::unsync::OnceCell;
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

#[cfg(test)]
mod __tests__;

pub use callbacks::{CallbackContext, CallbackRegistry, ParseCallback};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Sizing knobs for a [StepParser] instance.
pub struct StepParserOptions {
    /// Byte budget of the engine arena.
    pub arena_bytes: usize,
    /// Parser path slots allocated up front.
    pub pool_initial: usize,
    /// Hard bound on concurrently live parser paths.
    pub pool_max: usize,
    /// Paths allowed to share one ambiguity step: the consuming path plus
    /// its forks.
    pub fork_limit: usize,
}

#[derive(Debug, Clone, Default)]
/// A cooperative cancellation flag shared with a running parse.
///
/// Cancelling takes effect between token batches; the parse returns the
/// partial matches gathered so far with the `cancelled` flag set.
pub struct CancelToken {
    flag: Rc<Cell<bool>>,
}

#[derive(Debug, Clone, PartialEq)]
/// The result summary of a parse run.
pub struct ParseOutcome {
    pub matches: Vec<ProductionMatch>,
    pub cancelled: bool,
    pub paths_explored: u64,
}

// The outcome of matching one token against one parser path. Recovery
// decisions travel as values; only invariant and resource failures are
// errors.
pub(crate) enum StepAction {
    Consume(Rc<Production>),
    ForkThenConsume {
        chosen: Rc<Production>,
        forks: Vec<Rc<Production>>,
    },
    Skip,
    Hold,
    Prune,
}

/// The step-by-step, context aware, multi-path parser engine.
pub struct StepParser {
    arena: Rc<Arena>,
    paths: ObjectPool<ParserPath>,
    live_paths: Vec<PoolRef>,
    active_parts: HashMap<u64, Vec<ProductionPart>>,
    resolver: InheritanceResolver,
    actions: SemanticActionManager,
    precedence: PrecedenceManager,
    symbols: SymbolTable,
    adapter: ContextAdapter,
    callbacks: CallbackRegistry,
    callback_context: HashMap<String, String>,
    active_grammar: Option<Rc<Grammar>>,
    next_path_id: u64,
    paths_explored: u64,
    fork_limit: usize,
    cancel: CancelToken,
    debug: OnceCell<Log<&'static str>>,
}

impl CancelToken {
    pub fn cancel(&self) {
        self.flag.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.get()
    }

    pub(crate) fn reset(&self) {
        self.flag.set(false);
    }
}

impl Default for StepParserOptions {
    fn default() -> Self {
        Self {
            arena_bytes: 256 * 1024,
            pool_initial: 8,
            pool_max: 256,
            fork_limit: 3,
        }
    }
}
