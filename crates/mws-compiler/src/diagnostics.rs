use std::fmt;

use mws_core::SourceLocation;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningsMode {
    /// Warnings are dropped.
    Ignore,
    #[default]
    Normal,
    /// Warnings are recorded as errors.
    Strict,
}

impl WarningsMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "ignore" | "0" => Some(Self::Ignore),
            "normal" | "1" => Some(Self::Normal),
            "strict" | "2" => Some(Self::Strict),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: SourceLocation,
    pub context: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        match &self.context {
            Some(context) => write!(f, "{} {} ({}): {}", context, severity, self.location, self.message),
            None => write!(f, "{} ({}): {}", severity, self.location, self.message),
        }
    }
}

/// Collects compiler messages. The sink decides whether a warning is kept,
/// dropped or promoted to an error.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    mode: WarningsMode,
    context: Option<String>,
    entries: Vec<Diagnostic>,
    errors: usize,
    warnings: usize,
}

impl Diagnostics {
    pub fn new(mode: WarningsMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> WarningsMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: WarningsMode) {
        self.mode = mode;
    }

    /// Label attached to every following message, e.g. `foo[local variables]`.
    pub fn set_context(&mut self, context: Option<String>) {
        self.context = context;
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn warning(&mut self, message: impl Into<String>, location: SourceLocation) {
        match self.mode {
            WarningsMode::Ignore => {}
            WarningsMode::Normal => self.record(Severity::Warning, message.into(), location),
            WarningsMode::Strict => self.record(Severity::Error, message.into(), location),
        }
    }

    pub fn error(&mut self, message: impl Into<String>, location: SourceLocation) {
        self.record(Severity::Error, message.into(), location);
    }

    fn record(&mut self, severity: Severity, message: String, location: SourceLocation) {
        let context = self.context.as_deref().unwrap_or("<script>");
        match severity {
            Severity::Warning => {
                self.warnings += 1;
                warn!(script = %context, %location, "{}", message);
            }
            Severity::Error => {
                self.errors += 1;
                error!(script = %context, %location, "{}", message);
            }
        }
        self.entries.push(Diagnostic {
            severity,
            message,
            location,
            context: self.context.clone(),
        });
    }

    /// True when no error was recorded since the last reset.
    pub fn is_good(&self) -> bool {
        self.errors == 0
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|entry| entry.severity == Severity::Error)
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.errors = 0;
        self.warnings = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(line: usize) -> SourceLocation {
        SourceLocation { line, column: 1 }
    }

    #[test]
    fn normal_mode_keeps_warnings_separate() {
        let mut diagnostics = Diagnostics::new(WarningsMode::Normal);
        diagnostics.warning("stray endif", at(3));
        assert!(diagnostics.is_good());
        assert_eq!(diagnostics.warning_count(), 1);
        diagnostics.error("unknown identifier", at(4));
        assert!(!diagnostics.is_good());
        assert_eq!(diagnostics.errors().count(), 1);
    }

    #[test]
    fn strict_mode_promotes_and_ignore_mode_drops() {
        let mut strict = Diagnostics::new(WarningsMode::Strict);
        strict.warning("stray endif", at(1));
        assert!(!strict.is_good());

        let mut ignore = Diagnostics::new(WarningsMode::Ignore);
        ignore.warning("stray endif", at(1));
        assert!(ignore.is_good());
        assert!(ignore.entries().is_empty());
    }

    #[test]
    fn context_label_is_attached_and_reset_clears() {
        let mut diagnostics = Diagnostics::default();
        diagnostics.set_context(Some("foo[local variables]".to_string()));
        diagnostics.error("bad", at(2));
        assert_eq!(
            diagnostics.entries()[0].to_string(),
            "foo[local variables] error (line 2, column 1): bad"
        );
        diagnostics.reset();
        assert!(diagnostics.is_good());
        assert!(diagnostics.entries().is_empty());
    }

    #[test]
    fn warnings_mode_parses_names_and_levels() {
        assert_eq!(WarningsMode::parse("STRICT"), Some(WarningsMode::Strict));
        assert_eq!(WarningsMode::parse("0"), Some(WarningsMode::Ignore));
        assert_eq!(WarningsMode::parse("loud"), None);
    }
}
