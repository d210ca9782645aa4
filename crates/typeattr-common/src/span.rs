//! Span representation for source code locations.
//!
//! A `Span` identifies a contiguous region of source code by byte offsets.
//! Trees built without source text (see the syntax builder) use synthetic,
//! strictly increasing offsets so that spans still order declarations.

use std::fmt;

/// A half-open byte range `[start, end)` in a source file.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "span start must not exceed end");
        Span { start, end }
    }

    /// A zero-length span at `pos`.
    pub fn point(pos: u32) -> Self {
        Span { start: pos, end: pos }
    }

    /// Placeholder span for synthesized nodes.
    pub fn dummy() -> Self {
        Span::default()
    }

    pub fn is_dummy(&self) -> bool {
        self.start == 0 && self.end == 0
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The smallest span covering both `self` and `other`.
    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn contains(&self, offset: u32) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn contains_span(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Range form expected by `codespan-reporting` labels.
    pub fn to_range(&self) -> std::ops::Range<usize> {
        self.start as usize..self.end as usize
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl From<std::ops::Range<u32>> for Span {
    fn from(range: std::ops::Range<u32>) -> Self {
        Span::new(range.start, range.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_merge() {
        let a = Span::new(10, 20);
        let b = Span::new(15, 30);
        assert_eq!(a.merge(&b), Span::new(10, 30));
        assert_eq!(b.merge(&a), Span::new(10, 30));
    }

    #[test]
    fn test_span_contains() {
        let span = Span::new(10, 20);
        assert!(span.contains(10));
        assert!(!span.contains(20));
        assert!(span.contains_span(&Span::new(12, 20)));
        assert!(!span.contains_span(&Span::new(5, 12)));
    }

    #[test]
    fn test_span_ordering_follows_start() {
        let mut spans = vec![Span::new(8, 9), Span::point(3), Span::new(3, 7)];
        spans.sort();
        assert_eq!(spans, vec![Span::point(3), Span::new(3, 7), Span::new(8, 9)]);
        assert_eq!(Span::from(4..6).to_range(), 4..6);
    }
}
