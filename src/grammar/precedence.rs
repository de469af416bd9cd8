use super::{Associativity, AssociativityRule, PrecedenceRule};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

impl PrecedenceRule {
    /// Create a precedence level for a set of operators.
    pub fn new(level: i32, operators: Vec<&str>, associativity: Associativity) -> Self {
        Self {
            level,
            operators: operators.into_iter().map(|o| o.to_string()).collect(),
            associativity,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn covers(&self, operator: &str) -> bool {
        self.operators.contains(operator)
    }
}

impl Display for PrecedenceRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let ops: Vec<&str> = self.operators.iter().map(|o| o.as_str()).collect();
        write!(
            f,
            "{:?} {} {}",
            self.associativity,
            self.level,
            ops.join(" ")
        )
    }
}

impl AssociativityRule {
    pub fn new(operator: &str, associativity: Associativity, level: i32, scope: &str) -> Self {
        Self {
            operator: operator.to_string(),
            associativity,
            level,
            scope: scope.to_string(),
        }
    }
}

/// Collect the operators of a sequence of tokens into the rule set form.
pub(crate) fn operator_set(tokens: &[&str]) -> BTreeSet<String> {
    tokens.iter().map(|t| t.to_string()).collect()
}
