//! Structured diagnostics.
//!
//! Checkers produce diagnostics with a builder-style API: a severity, a
//! message, an optional numeric code, labels pointing into source, and notes.
//! Rendering is left to the driver; [`Diagnostic::into_codespan`] converts to
//! a `codespan-reporting` diagnostic for terminal output.

use std::fmt;

use codespan_reporting::diagnostic::{Diagnostic as CsDiagnostic, Label, LabelStyle};

use crate::span::Span;

/// Identifies a source file in the driver's file database.
pub type FileId = usize;

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl Severity {
    fn to_codespan(self) -> codespan_reporting::diagnostic::Severity {
        match self {
            Severity::Error => codespan_reporting::diagnostic::Severity::Error,
            Severity::Warning => codespan_reporting::diagnostic::Severity::Warning,
            Severity::Note => codespan_reporting::diagnostic::Severity::Note,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        })
    }
}

#[derive(Debug, Clone)]
struct DiagnosticLabel {
    primary: bool,
    file_id: FileId,
    span: Span,
    message: String,
}

/// A diagnostic with optional code, labels and notes.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    severity: Severity,
    message: String,
    code: Option<u16>,
    labels: Vec<DiagnosticLabel>,
    notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            code: None,
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    /// Adds the primary label pointing at the main location.
    pub fn with_label(mut self, file_id: FileId, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(DiagnosticLabel {
            primary: true,
            file_id,
            span,
            message: message.into(),
        });
        self
    }

    /// Adds a secondary label for related context.
    pub fn with_secondary_label(
        mut self,
        file_id: FileId,
        span: Span,
        message: impl Into<String>,
    ) -> Self {
        self.labels.push(DiagnosticLabel {
            primary: false,
            file_id,
            span,
            message: message.into(),
        });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> Option<u16> {
        self.code
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// Spans of all labels, primary first.
    pub fn spans(&self) -> impl Iterator<Item = Span> + '_ {
        let primary = self.labels.iter().filter(|l| l.primary);
        let secondary = self.labels.iter().filter(|l| !l.primary);
        primary.chain(secondary).map(|l| l.span)
    }

    /// Converts to a `codespan-reporting` diagnostic for rendering.
    pub fn into_codespan(self) -> CsDiagnostic<FileId> {
        let mut diag = CsDiagnostic::new(self.severity.to_codespan()).with_message(self.message);
        if let Some(code) = self.code {
            diag = diag.with_code(format!("E{:04}", code));
        }
        let labels: Vec<Label<FileId>> = self
            .labels
            .into_iter()
            .map(|l| {
                let style = if l.primary {
                    LabelStyle::Primary
                } else {
                    LabelStyle::Secondary
                };
                Label::new(style, l.file_id, l.span.to_range()).with_message(l.message)
            })
            .collect();
        if !labels.is_empty() {
            diag = diag.with_labels(labels);
        }
        if !self.notes.is_empty() {
            diag = diag.with_notes(self.notes);
        }
        diag
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{}[E{:04}]: {}", self.severity, code, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// An ordered collection of diagnostics.
#[derive(Debug, Default)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.is_error())
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }
}

impl IntoIterator for DiagnosticBag {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}

impl Extend<Diagnostic> for DiagnosticBag {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        self.diagnostics.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_display() {
        let diag = Diagnostic::error("constant 300 overflows int8")
            .with_code(2011)
            .with_label(0, Span::new(4, 7), "here")
            .with_note("int8 holds -128..127");
        assert!(diag.is_error());
        assert_eq!(diag.code(), Some(2011));
        assert_eq!(diag.to_string(), "error[E2011]: constant 300 overflows int8");
        assert_eq!(diag.spans().collect::<Vec<_>>(), vec![Span::new(4, 7)]);
    }

    #[test]
    fn test_into_codespan_keeps_labels() {
        let diag = Diagnostic::warning("unused")
            .with_secondary_label(1, Span::new(0, 2), "declared here")
            .with_label(1, Span::new(5, 6), "");
        let cs = diag.into_codespan();
        assert_eq!(cs.labels.len(), 2);
        assert_eq!(cs.labels[1].range, 5..6);
        assert_eq!(cs.code, None);
    }

    #[test]
    fn test_bag_counts() {
        let mut bag = DiagnosticBag::new();
        bag.add(Diagnostic::warning("w"));
        assert!(!bag.has_errors());
        bag.extend(vec![Diagnostic::error("a"), Diagnostic::error("b")]);
        assert_eq!(bag.len(), 3);
        assert_eq!(bag.error_count(), 2);
    }
}
