use crate::grammar::Terminal;
use crate::{ITokenSource, SourceLine, Token, VecTokenSource, LEXERPATH_MERGE, LEXERPATH_REMOVED};
use std::collections::VecDeque;
use std::fmt::{Display, Formatter};

impl Terminal {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl Display for Terminal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl Token {
    /// Create a new token.
    /// ### Arguments
    /// * `lexer_path_id` - The speculative lexer path the token belongs to.
    /// * `terminal` - The terminal name of the token class.
    /// * `value` - The matched text.
    pub fn new(lexer_path_id: u64, terminal: &str, value: &str, line: usize, column: usize) -> Self {
        Self {
            lexer_path_id,
            terminal: Terminal::new(terminal),
            value: value.to_string(),
            line,
            column,
        }
    }

    /// A lifecycle token announcing the removal of a lexer path.
    pub fn path_removed(lexer_path_id: u64, line: usize, column: usize) -> Self {
        Token::new(lexer_path_id, LEXERPATH_REMOVED, "", line, column)
    }

    /// A lifecycle token merging `lexer_path_id` into `target`.
    pub fn path_merge(lexer_path_id: u64, target: u64, line: usize, column: usize) -> Self {
        Token::new(
            lexer_path_id,
            LEXERPATH_MERGE,
            &target.to_string(),
            line,
            column,
        )
    }

    pub fn is_lifecycle(&self) -> bool {
        self.terminal.name == LEXERPATH_REMOVED || self.terminal.name == LEXERPATH_MERGE
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}('{}') @ {}:{}",
            self.terminal.name, self.value, self.line, self.column
        )
    }
}

impl SourceLine {
    pub fn new(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }
}

impl VecTokenSource {
    /// Create a source yielding all tokens in one batch.
    pub fn from_tokens(tokens: Vec<Token>, text: &str) -> Self {
        Self::from_batches(vec![tokens], text)
    }

    /// Create a source yielding the given batches in order.
    pub fn from_batches(batches: Vec<Vec<Token>>, text: &str) -> Self {
        Self {
            batches: VecDeque::from(batches),
            lines: text.lines().map(SourceLine::new).collect(),
        }
    }
}

impl ITokenSource for VecTokenSource {
    fn next_tokens(&mut self) -> Option<Vec<Token>> {
        self.batches.pop_front()
    }

    fn source_lines(&self) -> Vec<SourceLine> {
        self.lines.clone()
    }
}
