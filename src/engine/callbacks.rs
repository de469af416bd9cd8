use crate::context::ContextInfo;
use crate::grammar::Production;
use crate::symbols::SymbolTable;
use crate::util::CodePosition;
use crate::Token;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

/// A user callback fired synchronously on every match of its production.
pub type ParseCallback = Box<dyn Fn(&CallbackContext)>;

/// The per-invocation context handed to a production callback.
pub struct CallbackContext<'a> {
    pub token: &'a Token,
    pub position: CodePosition,
    pub context: &'a ContextInfo,
    pub symbols: &'a SymbolTable,
    pub custom: &'a HashMap<String, String>,
    pub production: &'a Rc<Production>,
    pub grammar_name: &'a str,
}

/// Per-production user callbacks keyed by production name.
pub struct CallbackRegistry {
    callbacks: HashMap<String, ParseCallback>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self {
            callbacks: HashMap::new(),
        }
    }

    /// Bind a callback to a production name, replacing any prior binding.
    pub fn register(&mut self, production: &str, callback: ParseCallback) {
        self.callbacks.insert(production.to_string(), callback);
    }

    pub fn unregister(&mut self, production: &str) -> bool {
        self.callbacks.remove(production).is_some()
    }

    pub fn clear(&mut self) {
        self.callbacks.clear();
    }

    pub fn is_registered(&self, production: &str) -> bool {
        self.callbacks.contains_key(production)
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Invoke the callback bound to the production, if any. A panicking
    /// callback is caught and logged; it never aborts parsing or prunes the
    /// invoking path.
    pub fn invoke(&self, production: &str, context: &CallbackContext) {
        if let Some(callback) = self.callbacks.get(production) {
            let outcome = catch_unwind(AssertUnwindSafe(|| callback(context)));
            if outcome.is_err() {
                log::error!(
                    "callback for production '{}' panicked; parsing continues",
                    production
                );
            }
        }
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}
