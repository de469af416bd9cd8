//! The speculative parsing frontier.
//!
//! A [ParserPath] is one concurrent hypothesis about how the token stream
//! derives from the grammar: its own position, its remaining candidate
//! productions, the matches it has committed to and a pinned context
//! snapshot. Paths are pool managed; the engine acquires one on demand and
//! releases it on prune, merge or reset. A path never mutates another
//! path's state; forking copies productions and matches by value.
use crate::context::ContextSnapshot;
use crate::grammar::{Production, ProductionMatch};
use crate::pool::IPoolItem;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

#[derive(Default)]
/// A speculative parse frontier with its own position, matches and context.
pub struct ParserPath {
    pub parser_path_id: u64,
    pub lexer_path_id: u64,
    pub position: usize,
    pub active_productions: Vec<Rc<Production>>,
    pub active_matches: Vec<ProductionMatch>,
    pub context_snapshot: Option<ContextSnapshot>,
    pub score: f64,
    pub confidence: f64,
}

impl ParserPath {
    /// Prime a freshly acquired path.
    pub fn seed(&mut self, parser_path_id: u64, lexer_path_id: u64, position: usize) {
        self.parser_path_id = parser_path_id;
        self.lexer_path_id = lexer_path_id;
        self.position = position;
    }

    pub fn add_production(&mut self, production: Rc<Production>) {
        self.active_productions.push(production);
    }

    pub fn add_match(&mut self, production_match: ProductionMatch) {
        self.active_matches.push(production_match);
    }

    /// Drop a candidate production once it has been consumed.
    pub fn remove_production(&mut self, name: &str) {
        if let Some(index) = self
            .active_productions
            .iter()
            .position(|production| production.name() == name)
        {
            self.active_productions.remove(index);
        }
    }
}

impl IPoolItem for ParserPath {
    fn reset(&mut self) {
        self.parser_path_id = 0;
        self.lexer_path_id = 0;
        self.position = 0;
        self.active_productions.clear();
        self.active_matches.clear();
        self.context_snapshot = None;
        self.score = 0.0;
        self.confidence = 1.0;
    }
}

impl Debug for ParserPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserPath")
            .field("id", &self.parser_path_id)
            .field("lexer_path", &self.lexer_path_id)
            .field("position", &self.position)
            .field(
                "active_productions",
                &self
                    .active_productions
                    .iter()
                    .map(|p| p.name())
                    .collect::<Vec<&str>>(),
            )
            .field("matches", &self.active_matches.len())
            .field("score", &self.score)
            .field("confidence", &self.confidence)
            .finish()
    }
}
