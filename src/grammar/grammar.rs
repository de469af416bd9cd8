use super::{
    AssociativityRule, Grammar, GrammarFormat, PrecedenceRule, Production, RecoveryStrategy,
    SemanticActionTemplate, TokenSplitter,
};
use crate::GrammarError;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::fmt::{Display, Formatter};
use std::rc::Rc;

impl Grammar {
    /// Create a new empty grammar.
    /// ### Arguments
    /// * `name` - An unique grammar name used for inheritance links.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            format: GrammarFormat::Cebnf,
            inheritable: true,
            productions: HashMap::new(),
            production_order: Vec::new(),
            start_productions: Vec::new(),
            valid_start_terminals: BTreeSet::new(),
            precedence_rules: Vec::new(),
            associativity_rules: Vec::new(),
            semantic_actions: HashMap::new(),
            base_grammars: Vec::new(),
            token_splitter: TokenSplitter::None,
            recovery: RecoveryStrategy::default(),
            inherited_rules: BTreeSet::new(),
            overridden_rules: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> GrammarFormat {
        self.format
    }

    pub fn set_format(&mut self, format: GrammarFormat) {
        self.format = format;
    }

    pub fn is_inheritable(&self) -> bool {
        self.inheritable
    }

    pub fn set_inheritable(&mut self, inheritable: bool) {
        self.inheritable = inheritable;
    }

    /// Add a production to the grammar.
    /// Fails with [GrammarError::DuplicateProduction] when a production with
    /// the same name is already present.
    pub fn add_production(&mut self, production: Production) -> Result<(), GrammarError> {
        if self.productions.contains_key(production.name()) {
            return Err(GrammarError::DuplicateProduction {
                grammar: self.name.clone(),
                production: production.name().to_string(),
            });
        }
        self.production_order.push(production.name().to_string());
        self.productions
            .insert(production.name().to_string(), Rc::new(production));
        Ok(())
    }

    /// Lookup a production by its unique name.
    pub fn get_production(&self, name: &str) -> Option<&Rc<Production>> {
        self.productions.get(name)
    }

    /// Productions in their insertion order.
    pub fn productions(&self) -> impl Iterator<Item = &Rc<Production>> {
        self.production_order
            .iter()
            .filter_map(|name| self.productions.get(name))
    }

    pub fn production_count(&self) -> usize {
        self.productions.len()
    }

    /// Mark an existing production as a start production.
    pub fn add_start_production(&mut self, name: &str) -> Result<(), GrammarError> {
        if !self.productions.contains_key(name) {
            return Err(GrammarError::UnknownProduction {
                grammar: self.name.clone(),
                production: name.to_string(),
            });
        }
        if !self.start_productions.iter().any(|p| p == name) {
            self.start_productions.push(name.to_string());
        }
        Ok(())
    }

    pub fn start_productions(&self) -> &[String] {
        &self.start_productions
    }

    pub fn add_start_terminal(&mut self, terminal: &str) {
        self.valid_start_terminals.insert(terminal.to_string());
    }

    /// Terminal names the grammar may start with. Closure over inheritance
    /// is provided by the inheritance resolver, not embedded here.
    pub fn valid_start_terminals(&self) -> &BTreeSet<String> {
        &self.valid_start_terminals
    }

    pub fn add_precedence_rule(&mut self, rule: PrecedenceRule) {
        self.precedence_rules.push(rule);
    }

    pub fn precedence_rules(&self) -> &[PrecedenceRule] {
        &self.precedence_rules
    }

    pub fn add_associativity_rule(&mut self, rule: AssociativityRule) {
        self.associativity_rules.push(rule);
    }

    pub fn associativity_rules(&self) -> &[AssociativityRule] {
        &self.associativity_rules
    }

    /// Attach a semantic action template. A template registered under an
    /// existing name replaces it and marks the rule overridden.
    pub fn add_semantic_action(&mut self, template: SemanticActionTemplate) {
        if self.semantic_actions.contains_key(&template.name) {
            self.overridden_rules.insert(template.name.clone());
        }
        self.semantic_actions
            .insert(template.name.clone(), Rc::new(template));
    }

    pub fn get_semantic_action(&self, name: &str) -> Option<&Rc<SemanticActionTemplate>> {
        self.semantic_actions.get(name)
    }

    pub fn semantic_actions(&self) -> impl Iterator<Item = &Rc<SemanticActionTemplate>> {
        self.semantic_actions.values()
    }

    /// Set the ordered list of base grammar names. References form a DAG;
    /// cycles are detected by the inheritance resolver.
    pub fn set_base_grammars(&mut self, bases: Vec<String>) {
        self.base_grammars = bases;
    }

    pub fn base_grammars(&self) -> &[String] {
        &self.base_grammars
    }

    pub fn set_token_splitter(&mut self, splitter: TokenSplitter) {
        self.token_splitter = splitter;
    }

    /// Compile and install a regex token splitter.
    pub fn set_token_splitter_pattern(&mut self, pattern: &str) -> Result<(), GrammarError> {
        let regex = Regex::new(pattern).map_err(|err| GrammarError::Pattern {
            pattern: pattern.to_string(),
            message: err.to_string(),
        })?;
        self.token_splitter = TokenSplitter::Regex(regex);
        Ok(())
    }

    pub fn token_splitter(&self) -> &TokenSplitter {
        &self.token_splitter
    }

    pub fn set_recovery(&mut self, recovery: RecoveryStrategy) {
        self.recovery = recovery;
    }

    pub fn recovery(&self) -> RecoveryStrategy {
        self.recovery
    }

    pub fn mark_inherited(&mut self, rule: &str) {
        self.inherited_rules.insert(rule.to_string());
    }

    pub fn inherited_rules(&self) -> &BTreeSet<String> {
        &self.inherited_rules
    }

    pub fn overridden_rules(&self) -> &BTreeSet<String> {
        &self.overridden_rules
    }

    /// Write the grammar rules in the textual rule format.
    pub fn build_grammar(&self) -> Result<String, std::fmt::Error> {
        use std::fmt::Write;
        let mut writer = String::new();
        writeln!(writer, "grammar {};", self.name)?;
        if !self.base_grammars.is_empty() {
            writeln!(writer, "extends {};", self.base_grammars.join(", "))?;
        }
        for start in &self.start_productions {
            writeln!(writer, "start {};", start)?;
        }
        for terminal in &self.valid_start_terminals {
            writeln!(writer, "terminal {};", terminal)?;
        }
        for production in self.productions() {
            write!(writer, "rule {} ->", production.name())?;
            for part in production.parts() {
                write!(writer, " {}", part)?;
            }
            writeln!(writer, " ;")?;
        }
        Ok(writer)
    }
}

impl Display for Grammar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
