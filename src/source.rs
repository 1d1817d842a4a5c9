//! Source text held as a line vector, for error display by (row, col).

use std::fmt;

/// A zero-indexed (row, col) position in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Position { row, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row + 1, self.col + 1)
    }
}

/// The whole input file, read once and split into lines so error messages
/// can show a source line and a column caret without re-reading the file.
pub struct SourceFile {
    pub path: String,
    pub lines: Vec<String>,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, text: &str) -> Self {
        SourceFile {
            path: path.into(),
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    pub fn line(&self, row: usize) -> &str {
        self.lines.get(row).map(String::as_str).unwrap_or("")
    }
}
