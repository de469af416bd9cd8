use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// An error returned from [Arena](crate::pool::Arena) and
/// [ObjectPool](crate::pool::ObjectPool) operations.
pub enum PoolError {
    #[error("PoolExhausted: pool reached its maximum capacity of {capacity} slots.")]
    Exhausted { capacity: usize },
    #[error("PoolDisposed: the pool has been disposed and can no longer be used.")]
    Disposed,
    #[error("InvalidHandle: slot {0} is unknown or has already been released.")]
    InvalidHandle(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// An error returned due to failed validation of the grammar model.
pub enum GrammarError {
    #[error("DuplicateProduction: production '{production}' is already defined in grammar '{grammar}'.")]
    DuplicateProduction { grammar: String, production: String },
    #[error("UnknownProduction: production '{production}' is not defined in grammar '{grammar}'.")]
    UnknownProduction { grammar: String, production: String },
    #[error("GrammarLoadError: {message} ({filename}:{line})")]
    Load {
        filename: String,
        line: usize,
        message: String,
    },
    #[error("InvalidPattern: failed to compile token splitter pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },
    #[error("ActionArity: semantic action '{action}' expects {expected} arguments, received {received}.")]
    ActionArity {
        action: String,
        expected: usize,
        received: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// An error returned due to an invariant violation in the symbol table.
pub enum SymbolError {
    #[error("SymbolRedeclaration: symbol '{name}' is already declared in scope {scope_id}.")]
    Redeclaration { name: String, scope_id: u32 },
    #[error("UnknownScope: scope {0} is not registered.")]
    UnknownScope(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// An error returned from [StepParser](crate::StepParser) operations.
pub enum ParserError {
    #[error("GrammarNotActive: requested grammar '{requested}' but the active grammar is '{active}'.")]
    GrammarNotActive { requested: String, active: String },
    #[error("NoActiveGrammar: a grammar must be activated before parsing.")]
    NoActiveGrammar,
    #[error(transparent)]
    Pool(#[from] PoolError),
}
