//! Source-located diagnostics and their human rendering.

use std::fmt;

use crate::corpus::SymbolLookup;
use crate::error::WiringError;
use crate::typeref::Span;

/// Lines of context shown around the offending line
const CONTEXT_LINES: u32 = 2;

/// A place in the corpus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub file: String,
    pub span: Span,
}

impl Site {
    pub fn new(file: impl Into<String>, span: Span) -> Self {
        Self {
            file: file.into(),
            span,
        }
    }
}

/// A wiring error with its location and optional notes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub error: WiringError,
    pub site: Option<Site>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(error: WiringError, site: Option<Site>) -> Self {
        Self {
            error,
            site,
            notes: Vec::new(),
        }
    }

    pub fn at(error: WiringError, file: &str, span: Span) -> Self {
        Self::new(error, Some(Site::new(file, span)))
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Render the message with the surrounding source lines, the span underlined.
    pub fn render(&self, lookup: &dyn SymbolLookup) -> String {
        let mut out = format!("error: {}", self.error);
        if let Some(site) = &self.site {
            out.push_str(&format!(
                "\n  --> {}:{}:{}",
                site.file, site.span.line, site.span.column
            ));
            let text = lookup
                .source_file(&site.file)
                .and_then(|f| f.text.as_deref());
            if let Some(text) = text {
                out.push_str(&render_snippet(text, site.span));
            }
        }
        for note in &self.notes {
            out.push_str(&format!("\n  = note: {note}"));
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.site {
            Some(site) => write!(
                f,
                "{}:{}:{}: {}",
                site.file, site.span.line, site.span.column, self.error
            ),
            None => write!(f, "{}", self.error),
        }
    }
}

fn render_snippet(text: &str, span: Span) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if span.line == 0 || span.line as usize > lines.len() {
        return String::new();
    }
    let first = span.line.saturating_sub(CONTEXT_LINES).max(1);
    let last = (span.line + CONTEXT_LINES).min(lines.len() as u32);
    let width = last.to_string().len();

    let mut out = format!("\n{:width$} |", "");
    for number in first..=last {
        let line = lines[number as usize - 1];
        let row = format!("{number:>width$} | {line}");
        out.push('\n');
        out.push_str(row.trim_end());
        if number == span.line {
            let pad = span.column.saturating_sub(1) as usize;
            let marks = span.length.max(1) as usize;
            out.push_str(&format!(
                "\n{:width$} | {}{}",
                "",
                " ".repeat(pad),
                "^".repeat(marks)
            ));
        }
    }
    out
}
