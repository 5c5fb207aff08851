use std::collections::BTreeSet;

use super::{Diagnostic, DiagnosticLog, Warning};

/// Records diagnostics for the element currently being processed.
///
/// A logger carries the anchor (the declaration being processed) and the set
/// of suppressed warnings in effect for it. Suppressed warnings are dropped
/// on entry, so a buffered log that is later replayed never contains them.
#[derive(Debug, Clone, Default)]
pub struct Logger {
    log: DiagnosticLog,
    anchor: Option<String>,
    suppressed: BTreeSet<Warning>,
}

impl Logger {
    pub fn new(suppressed: impl IntoIterator<Item = Warning>) -> Self {
        Self {
            log: DiagnosticLog::new(),
            anchor: None,
            suppressed: suppressed.into_iter().collect(),
        }
    }

    /// An empty logger that shares this logger's anchor and suppressions.
    pub fn fork(&self) -> Self {
        Self {
            log: DiagnosticLog::new(),
            anchor: self.anchor.clone(),
            suppressed: self.suppressed.clone(),
        }
    }

    pub fn anchor(&self) -> Option<&str> {
        self.anchor.as_deref()
    }

    /// Sets the anchor, returning the previous one so callers can restore it.
    pub fn set_anchor(&mut self, anchor: Option<String>) -> Option<String> {
        std::mem::replace(&mut self.anchor, anchor)
    }

    /// Adds suppressions, returning the previous set so callers can restore it.
    pub fn suppress(&mut self, extra: impl IntoIterator<Item = Warning>) -> BTreeSet<Warning> {
        let previous = self.suppressed.clone();
        self.suppressed.extend(extra);
        previous
    }

    pub fn restore_suppressed(&mut self, previous: BTreeSet<Warning>) {
        self.suppressed = previous;
    }

    pub fn is_suppressed(&self, kind: Warning) -> bool {
        self.suppressed.contains(&Warning::All) || self.suppressed.contains(&kind)
    }

    pub fn e(&mut self, message: impl Into<String>) {
        let d = Diagnostic::error(message).with_anchor(self.anchor.clone());
        self.log.push(d);
    }

    pub fn w(&mut self, kind: Warning, message: impl Into<String>) {
        if self.is_suppressed(kind) {
            return;
        }
        let d = Diagnostic::warning(kind, message).with_anchor(self.anchor.clone());
        self.log.push(d);
    }

    pub fn note(&mut self, message: impl Into<String>) {
        let d = Diagnostic::note(message).with_anchor(self.anchor.clone());
        self.log.push(d);
    }

    /// Re-records a diagnostic produced under another logger.
    pub(crate) fn replay(&mut self, diagnostic: Diagnostic) {
        self.log.push(diagnostic);
    }

    pub fn log(&self) -> &DiagnosticLog {
        &self.log
    }

    pub fn error_count(&self) -> usize {
        self.log.error_count()
    }

    pub fn into_log(self) -> DiagnosticLog {
        self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_applies_to_entries() {
        let mut logger = Logger::default();
        logger.set_anchor(Some("UserDao::load".into()));
        logger.e("bad");
        let log = logger.into_log();
        assert_eq!(log.iter().next().unwrap().anchor.as_deref(), Some("UserDao::load"));
    }

    #[test]
    fn test_suppressed_warning_dropped() {
        let mut logger = Logger::new([Warning::CursorMismatch]);
        logger.w(Warning::CursorMismatch, "dropped");
        logger.w(Warning::RelationQueryWithoutTransaction, "kept");
        assert_eq!(logger.log().len(), 1);
    }

    #[test]
    fn test_suppress_all() {
        let mut logger = Logger::default();
        let previous = logger.suppress([Warning::All]);
        logger.w(Warning::CursorMismatch, "dropped");
        logger.restore_suppressed(previous);
        logger.w(Warning::CursorMismatch, "kept");
        assert_eq!(logger.log().len(), 1);
    }

    #[test]
    fn test_fork_buffers_then_replays() {
        let mut root = Logger::default();
        root.set_anchor(Some("Dao::m".into()));
        let mut child = root.fork();
        child.e("speculative");
        assert!(root.log().is_empty());
        child.into_log().write_to(&mut root);
        assert_eq!(root.error_count(), 1);
    }
}
