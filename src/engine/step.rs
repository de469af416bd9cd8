use super::{CallbackContext, ParseOutcome, StepAction, StepParser};
use crate::grammar::{Grammar, Production, ProductionMatch, RecoveryStrategy};
use crate::pool::PoolRef;
use crate::{
    ITokenSource, ParserError, PoolError, Token, LEXERPATH_MERGE, LEXERPATH_REMOVED,
};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

impl StepParser {
    /// Parse the token source against the active grammar.
    ///
    /// Drains the source batch by batch and returns the concatenation of
    /// every live path's matches, in ascending path id order. The name must
    /// match the active grammar; a mismatch fails with
    /// [ParserError::GrammarNotActive]. Cancellation between batches
    /// returns the partial matches with the `cancelled` flag set.
    pub fn parse(
        &mut self,
        grammar_name: &str,
        source: &mut dyn ITokenSource,
    ) -> Result<ParseOutcome, ParserError> {
        let grammar = match &self.active_grammar {
            Some(grammar) if grammar.name() == grammar_name => Rc::clone(grammar),
            Some(grammar) => {
                return Err(ParserError::GrammarNotActive {
                    requested: grammar_name.to_string(),
                    active: grammar.name().to_string(),
                })
            }
            None => return Err(ParserError::NoActiveGrammar),
        };
        if self.paths.is_disposed() {
            return Err(ParserError::Pool(PoolError::Disposed));
        }

        self.cancel.reset();
        self.symbols.clear();
        self.adapter.initialize_for_parsing(source);
        self.reset_paths()?;
        self.active_parts.clear();
        self.paths_explored = 0;

        self.debug_log()
            .log_event("Parse", &format!("begin '{}'", grammar_name));

        let cancelled = match self.drain_source(&grammar, source) {
            Ok(cancelled) => cancelled,
            Err(err) => {
                // Resource failures abort the run; still hand the paths back.
                let _ = self.reset_paths();
                return Err(err);
            }
        };

        let mut matches = Vec::new();
        for handle in &self.live_paths {
            matches.extend(self.paths.get(*handle)?.active_matches.clone());
        }

        // The recorded production tails survive the run so the valid
        // terminal query keeps answering for the final state.
        self.reset_paths()?;

        self.debug_log().log_success(
            "Parse",
            &format!("{} matches, {} paths explored", matches.len(), self.paths_explored),
        );

        Ok(ParseOutcome {
            matches,
            cancelled,
            paths_explored: self.paths_explored,
        })
    }

    // The straight loop over token batches; the gap between batches is the
    // only cancellation point.
    fn drain_source(
        &mut self,
        grammar: &Rc<Grammar>,
        source: &mut dyn ITokenSource,
    ) -> Result<bool, ParserError> {
        loop {
            if self.cancel.is_cancelled() {
                log::debug!("parse cancelled between token batches");
                return Ok(true);
            }
            let batch = match source.next_tokens() {
                Some(batch) => batch,
                None => return Ok(false),
            };
            for token in &batch {
                self.step_token(grammar, token)?;
            }
        }
    }

    // Dispatch one token to every live path of its lexer path.
    fn step_token(&mut self, grammar: &Rc<Grammar>, token: &Token) -> Result<(), ParserError> {
        self.debug_log().log_step("Token", token);

        if token.terminal.name == LEXERPATH_REMOVED {
            return self.remove_lexer_path(token.lexer_path_id);
        }
        if token.terminal.name == LEXERPATH_MERGE {
            return self.merge_lexer_path(token);
        }

        let mut step_paths: Vec<PoolRef> = Vec::new();
        for handle in &self.live_paths {
            if self.paths.get(*handle)?.lexer_path_id == token.lexer_path_id {
                step_paths.push(*handle);
            }
        }

        if step_paths.is_empty() {
            let handle = self.acquire_path(token.lexer_path_id, 0)?;
            let starts = self.start_productions_rc(grammar);
            let path = self.paths.get_mut(handle)?;
            for production in starts {
                path.add_production(production);
            }
            step_paths.push(handle);
        }

        // Paths process in ascending id order; forks created below join
        // live_paths after every pre-existing path and are not revisited
        // within this step.
        for handle in step_paths {
            self.process_path(grammar, token, handle)?;
        }
        Ok(())
    }

    // Drop every parser path following the removed lexer path and forget
    // its recorded production tail.
    fn remove_lexer_path(&mut self, lexer_path_id: u64) -> Result<(), ParserError> {
        let mut doomed: Vec<PoolRef> = Vec::new();
        for handle in &self.live_paths {
            if self.paths.get(*handle)?.lexer_path_id == lexer_path_id {
                doomed.push(*handle);
            }
        }
        log::debug!(
            "lexer path {} removed; pruning {} parser paths",
            lexer_path_id,
            doomed.len()
        );
        for handle in doomed {
            self.prune_path(handle)?;
        }
        self.active_parts.remove(&lexer_path_id);
        Ok(())
    }

    // Reassign every parser path of the merged lexer path and append its
    // production tail after the target's.
    fn merge_lexer_path(&mut self, token: &Token) -> Result<(), ParserError> {
        let target: u64 = match token.value.trim().parse() {
            Ok(target) => target,
            Err(_) => {
                log::warn!(
                    "malformed lexer path merge value '{}' on path {}",
                    token.value,
                    token.lexer_path_id
                );
                return Ok(());
            }
        };
        let source = token.lexer_path_id;
        if source == target {
            return Ok(());
        }

        let handles: Vec<PoolRef> = self.live_paths.clone();
        for handle in handles {
            let path = self.paths.get_mut(handle)?;
            if path.lexer_path_id == source {
                path.lexer_path_id = target;
            }
        }
        if let Some(parts) = self.active_parts.remove(&source) {
            self.active_parts.entry(target).or_default().extend(parts);
        }
        log::debug!("lexer path {} merged into {}", source, target);
        Ok(())
    }

    // Match one token against one path and apply the outcome.
    fn process_path(
        &mut self,
        grammar: &Rc<Grammar>,
        token: &Token,
        handle: PoolRef,
    ) -> Result<(), ParserError> {
        let snapshot = self.paths.get(handle)?.context_snapshot.clone();
        self.adapter.update_with_token(token, snapshot.as_ref());

        if self.paths.get(handle)?.active_productions.is_empty() {
            let starts = self.start_productions_rc(grammar);
            let path = self.paths.get_mut(handle)?;
            for production in starts {
                path.add_production(production);
            }
        }

        let candidates: Vec<Rc<Production>> = {
            let path = self.paths.get(handle)?;
            path.active_productions
                .iter()
                .filter(|production| {
                    production.leading_terminal() == Some(token.terminal.name.as_str())
                })
                .filter(|production| {
                    self.adapter
                        .is_production_valid_in_context(production, &token.terminal)
                })
                .cloned()
                .collect()
        };

        let action = match candidates.len() {
            0 => {
                let plan = self.adapter.error_recovery_strategy(token);
                self.adapter.record_recovery(&plan);
                self.debug_log().log_event(
                    "Recovery",
                    &format!("{:?} (confidence {:.2})", plan.strategy, plan.confidence),
                );
                match (plan.can_recover, plan.strategy) {
                    (true, RecoveryStrategy::Skip) => StepAction::Skip,
                    // The insert splice is strategy specific; the default
                    // leaves the path untouched.
                    (true, RecoveryStrategy::Insert) => StepAction::Hold,
                    _ => StepAction::Prune,
                }
            }
            1 => StepAction::Consume(candidates[0].clone()),
            _ => {
                let ranked = self.adapter.rank_productions_by_context(&candidates);
                let chosen = ranked[0].clone();
                let forks = ranked[1..]
                    .iter()
                    .take(self.fork_limit.saturating_sub(1))
                    .cloned()
                    .collect();
                StepAction::ForkThenConsume { chosen, forks }
            }
        };

        self.apply_action(grammar, token, handle, action)
    }

    fn apply_action(
        &mut self,
        grammar: &Rc<Grammar>,
        token: &Token,
        handle: PoolRef,
        action: StepAction,
    ) -> Result<(), ParserError> {
        match action {
            StepAction::Hold => Ok(()),
            StepAction::Skip => {
                let snapshot = self.adapter.snapshot(&self.symbols);
                let path = self.paths.get_mut(handle)?;
                path.position += token.value.len();
                path.context_snapshot = Some(snapshot);
                log::debug!(
                    "path {} skipped '{}' under error recovery",
                    path.parser_path_id,
                    token.value
                );
                Ok(())
            }
            StepAction::Prune => {
                log::debug!("path pruned on unmatched '{}'", token.value);
                self.prune_path(handle)
            }
            StepAction::Consume(production) => self.consume(grammar, token, handle, production),
            StepAction::ForkThenConsume { chosen, forks } => {
                // Capture the pre-consume state; forks copy it by value.
                let (lexer_path_id, position, snapshot, productions, matches, score, confidence) = {
                    let path = self.paths.get(handle)?;
                    (
                        path.lexer_path_id,
                        path.position,
                        path.context_snapshot.clone(),
                        path.active_productions.clone(),
                        path.active_matches.clone(),
                        path.score,
                        path.confidence,
                    )
                };

                let mut fork_jobs: Vec<(PoolRef, Rc<Production>)> = Vec::new();
                for alternative in forks {
                    let fork = self.acquire_path(lexer_path_id, position)?;
                    let path = self.paths.get_mut(fork)?;
                    path.context_snapshot = snapshot.clone();
                    path.active_matches = matches.clone();
                    path.active_productions = productions
                        .iter()
                        .filter(|production| production.name() != chosen.name())
                        .cloned()
                        .collect();
                    path.score = score;
                    path.confidence = confidence;
                    log::debug!(
                        "forked path {} for alternative '{}'",
                        path.parser_path_id,
                        alternative.name()
                    );
                    fork_jobs.push((fork, alternative));
                }

                self.consume(grammar, token, handle, chosen)?;
                for (fork, alternative) in fork_jobs {
                    self.consume(grammar, token, fork, alternative)?;
                }
                Ok(())
            }
        }
    }

    // Commit a production match on a path: append the match, advance the
    // position, fold the production into the context, fire callbacks and
    // record the production tail for the lexer path.
    fn consume(
        &mut self,
        grammar: &Rc<Grammar>,
        token: &Token,
        handle: PoolRef,
        production: Rc<Production>,
    ) -> Result<(), ParserError> {
        let start = self.paths.get(handle)?.position;
        let end = start + token.value.len();
        let production_match =
            ProductionMatch::new(Rc::clone(&production), token.value.clone(), start, end);

        if let Some(hook) = production.callback() {
            let hook = Rc::clone(hook);
            let outcome = catch_unwind(AssertUnwindSafe(|| (hook.as_ref())(&production_match)));
            if outcome.is_err() {
                log::error!(
                    "legacy callback for production '{}' panicked; parsing continues",
                    production.name()
                );
            }
        }

        {
            let path = self.paths.get_mut(handle)?;
            path.add_match(production_match);
            path.position = end;
        }

        self.adapter
            .update_with_production(&production, token, &mut self.symbols);

        {
            let context = CallbackContext {
                token,
                position: self.adapter.position(),
                context: self.adapter.context(),
                symbols: &self.symbols,
                custom: &self.callback_context,
                production: &production,
                grammar_name: grammar.name(),
            };
            self.callbacks.invoke(production.name(), &context);
        }

        let confidence = self.adapter.production_confidence(&production);
        let snapshot = self.adapter.snapshot(&self.symbols);
        {
            let path = self.paths.get_mut(handle)?;
            path.remove_production(production.name());
            path.confidence = confidence;
            path.score += confidence;
            path.context_snapshot = Some(snapshot);
        }

        if production.parts().len() > 1 {
            self.active_parts
                .insert(token.lexer_path_id, production.parts()[1..].to_vec());
        } else {
            self.active_parts.remove(&token.lexer_path_id);
        }

        self.debug_log().log_success(
            "Consume",
            &format!("'{}' matched '{}' at {}..{}", production.name(), token.value, start, end),
        );
        Ok(())
    }

    // Seed a fresh path from the pool and queue it after every live path.
    fn acquire_path(&mut self, lexer_path_id: u64, position: usize) -> Result<PoolRef, ParserError> {
        let handle = self.paths.acquire()?;
        let id = self.next_path_id;
        self.next_path_id += 1;
        let path = self.paths.get_mut(handle)?;
        path.seed(id, lexer_path_id, position);
        self.live_paths.push(handle);
        self.paths_explored += 1;
        Ok(handle)
    }

    fn prune_path(&mut self, handle: PoolRef) -> Result<(), ParserError> {
        self.live_paths.retain(|h| *h != handle);
        self.paths.release(handle)?;
        Ok(())
    }

    fn start_productions_rc(&self, grammar: &Rc<Grammar>) -> Vec<Rc<Production>> {
        self.start_productions_for(grammar)
            .iter()
            .filter_map(|name| self.lookup_production(grammar, name))
            .collect()
    }
}
