use super::SemanticActionTemplate;
use crate::GrammarError;
use std::fmt::{Display, Formatter};

impl SemanticActionTemplate {
    /// Create a new semantic action template.
    /// ### Arguments
    /// * `name` - The action name used for inheritance-aware lookup.
    /// * `template` - The template body with `${param}` placeholders.
    /// * `parameters` - Placeholder names substituted by [instantiate](Self::instantiate).
    pub fn new(name: &str, template: &str, parameters: Vec<&str>, return_type: &str) -> Self {
        Self {
            name: name.to_string(),
            template: template.to_string(),
            parameters: parameters.into_iter().map(|p| p.to_string()).collect(),
            return_type: return_type.to_string(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Substitute `${param}` placeholders with the given arguments.
    /// The argument count must match the declared parameter list.
    pub fn instantiate(&self, args: &[&str]) -> Result<String, GrammarError> {
        if args.len() != self.parameters.len() {
            return Err(GrammarError::ActionArity {
                action: self.name.clone(),
                expected: self.parameters.len(),
                received: args.len(),
            });
        }
        let mut body = self.template.clone();
        for (parameter, arg) in self.parameters.iter().zip(args) {
            body = body.replace(&format!("${{{}}}", parameter), arg);
        }
        Ok(body)
    }
}

impl Display for SemanticActionTemplate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}({}) -> {}",
            self.name,
            self.parameters.join(", "),
            self.return_type
        )
    }
}
