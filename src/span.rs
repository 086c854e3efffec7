use std::sync::Arc;

/// A region of the original source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub source: Arc<str>,
    pub offset: usize,
    pub length: usize,
}

impl Span {
    pub fn new(source: Arc<str>, offset: usize, length: usize) -> Self {
        Self {
            source,
            offset,
            length,
        }
    }

    /// The exact text this span covers.
    pub fn excerpt(&self) -> &str {
        &self.source[self.offset..self.offset + self.length]
    }

    /// One-based line and column of the first character.
    pub fn position(&self) -> (usize, usize) {
        let before = &self.source[..self.offset];
        let line = before.matches('\n').count() + 1;
        let column = match before.rfind('\n') {
            Some(newline) => before[newline + 1..].chars().count() + 1,
            None => before.chars().count() + 1,
        };
        (line, column)
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (line, column) = self.position();
        write!(f, "{line},{column}")
    }
}
