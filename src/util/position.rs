use std::fmt::{Display, Formatter};

use super::CodePosition;

impl CodePosition {
    /// Create a new CodePosition based on the line, column and byte offset.
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        debug_assert!(line >= 1 && column >= 1);
        Self {
            line,
            column,
            offset,
        }
    }

    /// The starting position of a document.
    pub fn origin() -> Self {
        Self {
            line: 1,
            column: 1,
            offset: 0,
        }
    }

    /// Advance the position over a single character.
    /// A line break moves the cursor to the start of the next line.
    pub fn advance(&mut self, c: char) {
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.offset += c.len_utf8();
    }

    /// Advance the position over every character of the text.
    pub fn advance_str(&mut self, text: &str) {
        for c in text.chars() {
            self.advance(c);
        }
    }
}

impl Default for CodePosition {
    fn default() -> Self {
        Self::origin()
    }
}

impl Display for CodePosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("line", &self.line)
            .field("column", &self.column)
            .finish()
    }
}
