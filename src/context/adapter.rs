use super::{
    ContextAdapter, ContextInfo, ContextSnapshot, GrammarState, ParseStateInfo, RecoveryPlan,
    CONFIDENCE_BASE, CONFIDENCE_PATTERN_BONUS, CONFIDENCE_SCOPE_BONUS,
};
use crate::grammar::{Grammar, Production, RecoveryStrategy, Terminal};
use crate::inheritance::InheritanceResolver;
use crate::symbols::{ScopeInfo, ScopeType, SymbolInfo, SymbolKind, SymbolTable};
use crate::util::{CodePosition, SourceText};
use crate::{ITokenSource, Token};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

impl ContextInfo {
    /// The default context installed before any token is seen.
    pub fn initial() -> Self {
        let global = ScopeInfo {
            id: 0,
            name: None,
            scope_type: ScopeType::Global,
            start: CodePosition::origin(),
            end: None,
        };
        Self {
            scope: global.clone(),
            scope_stack: vec![global],
            context_stack: Vec::new(),
            symbols: Vec::new(),
            parse_state: ParseStateInfo::default(),
            active_grammar: None,
            timestamp: unix_millis(),
        }
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl ContextAdapter {
    pub fn new() -> Self {
        Self {
            context: ContextInfo::initial(),
            position: CodePosition::origin(),
            source: None,
            context_states: HashMap::new(),
            recovery: RecoveryStrategy::default(),
            forbidden_terminals: HashMap::new(),
            forbidden_productions: HashMap::new(),
        }
    }

    /// Install the grammar whose rules the context describes.
    pub fn set_grammar(&mut self, grammar: &Grammar, resolver: &InheritanceResolver) {
        self.recovery = grammar.recovery();
        self.context.active_grammar = Some(grammar.name().to_string());
        self.context.parse_state.valid_terminals =
            grammar.valid_start_terminals().iter().cloned().collect();
        self.context.parse_state.grammar_state = GrammarState {
            active_grammar: grammar.name().to_string(),
            format: grammar.format(),
            base_grammars: grammar.base_grammars().to_vec(),
            active_rules: grammar.productions().map(|p| p.name().to_string()).collect(),
            context_modifiers: self.active_modifiers(),
            inheritance_chain: resolver.inheritance_chain(grammar.name()).to_vec(),
        };
    }

    /// Pull the full text from the source lines, reset the cursor to the
    /// document origin and install a default context.
    pub fn initialize_for_parsing(&mut self, source: &dyn ITokenSource) {
        self.source = Some(SourceText::from_lines(&source.source_lines()));
        self.position = CodePosition::origin();

        let grammar_state = self.context.parse_state.grammar_state.clone();
        let active_grammar = self.context.active_grammar.clone();
        self.context = ContextInfo::initial();
        self.context.parse_state.grammar_state = grammar_state;
        self.context.active_grammar = active_grammar;
    }

    pub fn position(&self) -> CodePosition {
        self.position
    }

    pub fn context(&self) -> &ContextInfo {
        &self.context
    }

    pub fn source(&self) -> Option<&SourceText> {
        self.source.as_ref()
    }

    /// Advance the cursor over the token value, character by character.
    /// A supplied snapshot synchronises the cursor first, so a speculative
    /// path resumes from its own pinned position.
    pub fn update_with_token(&mut self, token: &Token, snapshot: Option<&ContextSnapshot>) {
        if let Some(snapshot) = snapshot {
            self.position = snapshot.position;
        }
        self.position.advance_str(&token.value);
        self.context.parse_state.position = self.position;
        self.context.timestamp = unix_millis();
    }

    /// Whether the terminal may appear in the current scope. The default is
    /// permissive; scope specific refusals are installed with
    /// [forbid_terminal_in_scope](Self::forbid_terminal_in_scope).
    pub fn is_terminal_valid_in_context(&self, terminal: &Terminal) -> bool {
        match self.forbidden_terminals.get(&self.context.scope.scope_type) {
            Some(refused) => !refused.contains(&terminal.name),
            None => true,
        }
    }

    /// Whether the production may be applied in the current scope for the
    /// given terminal.
    pub fn is_production_valid_in_context(&self, production: &Production, terminal: &Terminal) -> bool {
        if !self.is_terminal_valid_in_context(terminal) {
            return false;
        }
        match self
            .forbidden_productions
            .get(&self.context.scope.scope_type)
        {
            Some(refused) => !refused.contains(production.name()),
            None => true,
        }
    }

    /// Refuse a terminal inside scopes of the given type.
    pub fn forbid_terminal_in_scope(&mut self, scope_type: ScopeType, terminal: &str) {
        self.forbidden_terminals
            .entry(scope_type)
            .or_default()
            .insert(terminal.to_string());
    }

    /// Refuse a production inside scopes of the given type.
    pub fn forbid_production_in_scope(&mut self, scope_type: ScopeType, production: &str) {
        self.forbidden_productions
            .entry(scope_type)
            .or_default()
            .insert(production.to_string());
    }

    /// Order candidate productions by descending context score; ties break
    /// on the production name so the ranking is total and reproducible.
    pub fn rank_productions_by_context(&self, productions: &[Rc<Production>]) -> Vec<Rc<Production>> {
        let mut ranked: Vec<Rc<Production>> = productions.to_vec();
        ranked.sort_by(|a, b| {
            self.context_score(b)
                .partial_cmp(&self.context_score(a))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name().cmp(b.name()))
        });
        ranked
    }

    pub fn context_score(&self, production: &Production) -> f64 {
        self.production_confidence(production)
    }

    /// Confidence that the production is the right choice here, in [0, 1].
    pub fn production_confidence(&self, production: &Production) -> f64 {
        let mut confidence = CONFIDENCE_BASE;
        if self.expected_in_scope(production) {
            confidence += CONFIDENCE_SCOPE_BONUS;
        }
        if self.follows_expected_pattern(production) {
            confidence += CONFIDENCE_PATTERN_BONUS;
        }
        confidence.min(1.0)
    }

    // A production is expected when its name mentions a construct the
    // current scope stack commonly contains.
    fn expected_in_scope(&self, production: &Production) -> bool {
        self.context.scope_stack.iter().any(|scope| {
            expected_name_parts(scope.scope_type)
                .iter()
                .any(|part| production.name().contains(part))
        })
    }

    // The production follows the running pattern when it shares its leading
    // name segment with the rule consumed last.
    fn follows_expected_pattern(&self, production: &Production) -> bool {
        match &self.context.parse_state.current_rule {
            Some(rule) => leading_segment(rule) == leading_segment(production.name()),
            None => false,
        }
    }

    /// Propose a recovery for a token no production matched.
    pub fn error_recovery_strategy(&self, token: &Token) -> RecoveryPlan {
        let strategy = self.recovery;
        let (can_recover, confidence) = match strategy {
            RecoveryStrategy::Skip => {
                if token.value.trim().is_empty() {
                    (true, 0.9)
                } else {
                    (true, 0.6)
                }
            }
            RecoveryStrategy::Insert => (true, 0.4),
            RecoveryStrategy::Backtrack => (true, 0.5),
            RecoveryStrategy::None => (false, 0.0),
        };
        RecoveryPlan {
            can_recover,
            strategy,
            suggestion: format!(
                "unexpected '{}' ({}) at {}",
                token.value, token.terminal.name, self.position
            ),
            confidence,
        }
    }

    /// Note an applied recovery in the parse state, so downstream consumers
    /// see what was skipped or dropped.
    pub fn record_recovery(&mut self, plan: &RecoveryPlan) {
        if plan.can_recover {
            self.context
                .parse_state
                .suggestions
                .push(plan.suggestion.clone());
        } else {
            self.context.parse_state.errors.push(plan.suggestion.clone());
        }
    }

    /// Fold the production into the rolling context: push or pop scopes for
    /// scope changing productions and declare symbols for symbol defining
    /// ones.
    pub fn update_with_production(
        &mut self,
        production: &Production,
        token: &Token,
        symbols: &mut SymbolTable,
    ) {
        let name = production.name();

        if is_scope_opening(name) {
            let scope_type = scope_type_of(name);
            let id = symbols.enter_scope(scope_type, Some(&token.value), self.position);
            let scope = symbols
                .get_scope(id)
                .cloned()
                .expect("scope registered by enter_scope");
            self.context.scope = scope.clone();
            self.context.scope_stack.push(scope);
            self.context.context_stack.push(name.to_string());
        } else if is_scope_closing(name) {
            symbols.exit_scope(self.position);
            if self.context.scope_stack.len() > 1 {
                self.context.scope_stack.pop();
            }
            self.context.context_stack.pop();
            self.context.scope = self
                .context
                .scope_stack
                .last()
                .cloned()
                .expect("the global scope is never popped");
        }

        if let Some(symbol) = self.extract_symbol_info(production, token, symbols) {
            if symbols.is_declared(&symbol.name, symbol.scope_id) {
                // Speculative re-parses revisit declarations; count them as
                // references instead of failing the path.
                let _ = symbols.add_reference(&symbol.name, symbol.scope_id, self.position);
            } else {
                let _ = symbols.declare(symbol);
            }
        }

        self.context.symbols = symbols.visible_names();
        self.context.parse_state.current_rule = Some(name.to_string());
        self.context.parse_state.position = self.position;
        self.context.parse_state.scope_stack = symbols.scope_stack().to_vec();
        self.context.parse_state.context_stack = self.context.context_stack.clone();
        self.context.timestamp = unix_millis();
    }

    /// Extract the declared symbol for a symbol defining production. The
    /// kind is inferred from the production name.
    pub fn extract_symbol_info(
        &self,
        production: &Production,
        token: &Token,
        symbols: &SymbolTable,
    ) -> Option<SymbolInfo> {
        let name = production.name();
        if !is_symbol_defining(name) {
            return None;
        }
        let kind = if name.contains("function") {
            SymbolKind::Function
        } else if name.contains("class") {
            SymbolKind::Class
        } else {
            SymbolKind::Variable
        };
        Some(
            SymbolInfo::new(
                &token.value,
                kind,
                symbols.current_scope_id(),
                self.position,
            )
            .with_context_label(name),
        )
    }

    /// Toggle a named contextual flag.
    pub fn set_context_state(&mut self, name: &str, value: bool) {
        self.context_states.insert(name.to_string(), value);
        self.context.parse_state.grammar_state.context_modifiers = self.active_modifiers();
    }

    pub fn context_state(&self, name: &str) -> bool {
        self.context_states.get(name).copied().unwrap_or(false)
    }

    fn active_modifiers(&self) -> Vec<String> {
        let mut modifiers: Vec<String> = self
            .context_states
            .iter()
            .filter(|(_, active)| **active)
            .map(|(name, _)| name.clone())
            .collect();
        modifiers.sort();
        modifiers
    }
}

impl Default for ContextAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn leading_segment(name: &str) -> &str {
    name.split('_').next().unwrap_or(name)
}

fn is_scope_opening(name: &str) -> bool {
    name.ends_with("_start") || name.ends_with("_open") || name.ends_with("_begin")
}

fn is_scope_closing(name: &str) -> bool {
    name.ends_with("_end") || name.ends_with("_close")
}

fn is_symbol_defining(name: &str) -> bool {
    name.contains("declaration") || name.contains("definition") || name.contains("_decl")
}

fn scope_type_of(name: &str) -> ScopeType {
    if name.contains("function") {
        ScopeType::Function
    } else if name.contains("class") {
        ScopeType::Class
    } else {
        ScopeType::Block
    }
}

fn expected_name_parts(scope_type: ScopeType) -> &'static [&'static str] {
    match scope_type {
        ScopeType::Global => &["prog", "main", "declaration", "function", "class", "import"],
        ScopeType::Function => &["statement", "expr", "return", "call"],
        ScopeType::Class => &["member", "method", "field"],
        ScopeType::Block => &["statement", "expr"],
    }
}
