mod logger;
mod position;
mod source;
use once_cell::unsync::OnceCell;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
/// The line, column and byte offset information at a code point.
pub struct CodePosition {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

/// A wrapper for the parsed source text with lines information.
pub struct SourceText {
    pub value: String,
    line_breaks: OnceCell<Vec<usize>>,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
/// A enum structure to assign multiple level debugging to the parser engine.
pub enum Log<T> {
    None,
    Default(T),
    Success(T),
    Result(T),
    Verbose(T),
}
