use super::{CodePosition, SourceText};
use crate::SourceLine;
use once_cell::unsync::OnceCell;

impl From<&str> for SourceText {
    fn from(value: &str) -> Self {
        SourceText::new(value.to_string())
    }
}

impl SourceText {
    pub fn new(value: String) -> Self {
        Self {
            value,
            line_breaks: OnceCell::new(),
        }
    }

    /// Concatenate the line contents received from a token source.
    pub fn from_lines(lines: &[SourceLine]) -> Self {
        let mut value = String::new();
        for (index, line) in lines.iter().enumerate() {
            if index != 0 {
                value.push('\n');
            }
            value.push_str(&line.content);
        }
        SourceText::new(value)
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn obtain_line_breaks(&self) -> &Vec<usize> {
        self.line_breaks.get_or_init(|| {
            self.value
                .bytes()
                .enumerate()
                .filter_map(|(index, b)| if b == b'\n' { Some(index) } else { None })
                .collect()
        })
    }

    /// Compute the line and column information for a byte offset.
    pub fn obtain_position(&self, pointer: usize) -> CodePosition {
        let line_breaks = self.obtain_line_breaks();
        let index = match line_breaks.binary_search(&pointer) {
            Ok(index) | Err(index) => index,
        };

        if index == 0 {
            let s = &self.value[..pointer.min(self.value.len())];
            CodePosition::new(1, s.chars().count() + 1, pointer)
        } else {
            let break_point = line_breaks[index - 1] + 1;
            let s = &self.value[break_point..pointer.min(self.value.len())];
            CodePosition::new(index + 1, s.chars().count() + 1, pointer)
        }
    }
}
