//! A module consist of the in-memory grammar model consumed by the step
//! parser engine.
//!
//! A [Grammar] is a named collection of [Production]s together with start
//! symbols, operator [PrecedenceRule]s, [SemanticActionTemplate]s and links
//! to base grammars. Grammars are assembled programmatically or loaded from
//! the simple textual rule format through [Grammar::load_from_content].
//! The model is inert data; inheritance-aware resolution lives in
//! [InheritanceResolver](crate::inheritance::InheritanceResolver) and the
//! scoped managers.
mod grammar;
mod loader;
mod precedence;
mod production;
mod semantic_action;

use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

#[cfg(test)]
mod __tests__;

#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
/// A named token class. Two terminals are the same terminal iff their names
/// are equal.
pub struct Terminal {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
/// A single element on the right hand side of a [Production].
pub struct ProductionPart {
    pub kind: PartKind,
    pub order_important: bool,
}

#[derive(Debug, Clone, PartialEq)]
/// The tagged variants a [ProductionPart] can take.
pub enum PartKind {
    Terminal(String),
    NonTerminal(String),
    Optional(Box<ProductionPart>),
    ZeroOrMore(Box<ProductionPart>),
    OneOrMore(Box<ProductionPart>),
    Group(Vec<ProductionPart>),
}

/// A named rewrite rule with an ordered list of [ProductionPart]s.
pub struct Production {
    name: String,
    parts: Vec<ProductionPart>,
    callback: Option<Rc<dyn Fn(&ProductionMatch)>>,
}

#[derive(Debug, Clone)]
/// A successfully consumed production with its matched text and offsets.
pub struct ProductionMatch {
    pub production: Rc<Production>,
    pub matched: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
/// The textual format a grammar was written in.
pub enum GrammarFormat {
    #[default]
    Cebnf,
    Antlr4,
    Bison,
}

#[derive(Debug, Clone, Default)]
/// Configuration describing how raw token values may be split further
/// before matching.
pub enum TokenSplitter {
    #[default]
    None,
    Regex(Regex),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
/// The way the engine reacts when no production matches a token.
pub enum RecoveryStrategy {
    #[default]
    Skip,
    Insert,
    Backtrack,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Reduction direction for operators on the same precedence level.
pub enum Associativity {
    Left,
    Right,
    None,
}

#[derive(Debug, Clone, PartialEq)]
/// A precedence level shared by a set of operators.
pub struct PrecedenceRule {
    pub level: i32,
    pub operators: BTreeSet<String>,
    pub associativity: Associativity,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
/// Associativity assigned to a single operator within a named scope.
pub struct AssociativityRule {
    pub operator: String,
    pub associativity: Associativity,
    pub level: i32,
    pub scope: String,
}

#[derive(Debug, Clone, PartialEq)]
/// A named code template with `${param}` placeholders, attached to a grammar
/// and dispatched through the semantic action manager.
pub struct SemanticActionTemplate {
    pub name: String,
    pub template: String,
    pub parameters: Vec<String>,
    pub return_type: String,
    pub description: String,
}

/// A named collection of productions, start symbols, precedence rules,
/// semantic action templates and base grammar links.
pub struct Grammar {
    name: String,
    format: GrammarFormat,
    inheritable: bool,
    productions: HashMap<String, Rc<Production>>,
    production_order: Vec<String>,
    start_productions: Vec<String>,
    valid_start_terminals: BTreeSet<String>,
    precedence_rules: Vec<PrecedenceRule>,
    associativity_rules: Vec<AssociativityRule>,
    semantic_actions: HashMap<String, Rc<SemanticActionTemplate>>,
    base_grammars: Vec<String>,
    token_splitter: TokenSplitter,
    recovery: RecoveryStrategy,
    inherited_rules: BTreeSet<String>,
    overridden_rules: BTreeSet<String>,
}
