/// Compiler diagnostics.
///
/// Every problem found in a declaration is recorded as a [`Diagnostic`]
/// scoped to the element that caused it. Diagnostics are plain data: the
/// round collects them, the CLI renders them. Nothing here writes to the
/// tracing subscriber.
mod logger;
pub mod messages;
mod warning;

use std::fmt;

use serde::Serialize;

pub use logger::Logger;
pub use warning::Warning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// The declaration this diagnostic is about, e.g. `UserDao::load_all`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    /// Public key of the warning kind, when this is a warning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<&'static str>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            anchor: None,
            key: None,
        }
    }

    pub fn warning(kind: Warning, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            anchor: None,
            key: Some(kind.key()),
        }
    }

    pub fn note(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Note,
            message: message.into(),
            anchor: None,
            key: None,
        }
    }

    pub fn with_anchor(mut self, anchor: Option<String>) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.severity)?;
        if let Some(anchor) = &self.anchor {
            write!(f, "[{anchor}] ")?;
        }
        write!(f, "{}", self.message)?;
        if let Some(key) = self.key {
            write!(f, " ({key})")?;
        }
        Ok(())
    }
}

/// An ordered, append-only list of diagnostics.
///
/// Used both as the round's final report and as the buffer that holds the
/// output of a speculative resolution pass until it is either replayed or
/// discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DiagnosticLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.entries.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.is_error())
    }

    /// Replays every buffered entry into `logger`, in order.
    pub fn write_to(self, logger: &mut Logger) {
        for diagnostic in self.entries {
            logger.replay(diagnostic);
        }
    }

    pub fn extend(&mut self, other: DiagnosticLog) {
        self.entries.extend(other.entries);
    }
}

impl IntoIterator for DiagnosticLog {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Substitutes `{}` placeholders in `template` with `args`, in order.
///
/// If the number of placeholders does not match the number of arguments the
/// raw template is returned unchanged, so a bad message never hides the
/// diagnostic it belongs to.
pub fn safe_format(template: &str, args: &[&str]) -> String {
    let pieces: Vec<&str> = template.split("{}").collect();
    if pieces.len() != args.len() + 1 {
        return template.to_string();
    }
    let mut out = String::with_capacity(template.len());
    for (i, piece) in pieces.iter().enumerate() {
        out.push_str(piece);
        if let Some(arg) = args.get(i) {
            out.push_str(arg);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_format_substitutes_in_order() {
        assert_eq!(safe_format("{} and {}", &["a", "b"]), "a and b");
    }

    #[test]
    fn test_safe_format_falls_back_to_template() {
        assert_eq!(safe_format("only {}", &["a", "b"]), "only {}");
        assert_eq!(safe_format("{} {}", &["a"]), "{} {}");
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::error("boom").with_anchor(Some("UserDao::load".into()));
        assert_eq!(d.to_string(), "error: [UserDao::load] boom");

        let w = Diagnostic::warning(Warning::CursorMismatch, "extra columns");
        assert_eq!(w.to_string(), "warning: extra columns (DAOC_CURSOR_MISMATCH)");
    }

    #[test]
    fn test_log_counts() {
        let mut log = DiagnosticLog::new();
        log.push(Diagnostic::error("a"));
        log.push(Diagnostic::warning(Warning::CursorMismatch, "b"));
        log.push(Diagnostic::note("c"));
        assert!(log.has_errors());
        assert_eq!(log.error_count(), 1);
        assert_eq!(log.warning_count(), 1);
        assert_eq!(log.len(), 3);
    }
}
