//! Source locations.
//!
//! Spans are byte offsets into an immutable source buffer plus the
//! line the span starts on. They never own text; the buffer they point
//! into must outlive every token and node carrying them.

use std::fmt;

/// Index of a source file inside a [`crate::source::SourceMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FileId(pub u32);

impl FileId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub file: FileId,
    pub start: u32,
    pub end: u32,
    pub line: u32,
}

impl Span {
    pub fn new(file: FileId, start: u32, end: u32, line: u32) -> Self {
        Span {
            file,
            start,
            end,
            line,
        }
    }

    /// Smallest span covering both `self` and `other`.
    ///
    /// The line is taken from whichever span starts first.
    pub fn to(self, other: Span) -> Span {
        let (first, _) = if self.start <= other.start {
            (self, other)
        } else {
            (other, self)
        };
        Span {
            file: self.file,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line: first.line,
        }
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn text<'src>(&self, source: &'src str) -> &'src str {
        &source[self.start as usize..self.end as usize]
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{} (line {})", self.start, self.end, self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_spans_keeping_first_line() {
        let a = Span::new(FileId(0), 4, 8, 2);
        let b = Span::new(FileId(0), 10, 12, 3);
        let joined = b.to(a);
        assert_eq!(joined.start, 4);
        assert_eq!(joined.end, 12);
        assert_eq!(joined.line, 2);
    }

    #[test]
    fn slices_source_text() {
        let span = Span::new(FileId(0), 5, 9, 1);
        assert_eq!(span.text("void main()"), "main");
    }
}
