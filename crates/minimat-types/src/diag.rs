use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single static diagnostic: the 1-based source line and the message,
/// surfaced verbatim to the driver.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("line {line}: {message}")]
pub struct Diagnostic {
    pub line: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Ordered collection of diagnostics accumulated over one checking pass.
///
/// Checking never aborts early — every reachable node is visited and every
/// diagnostic is kept. The external driver gates evaluation on this list
/// being empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub diagnostics: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a diagnostic, preserving report order.
    pub fn push(&mut self, line: u32, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::new(line, message));
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::new(12, "undeclared variable 'x'");
        assert_eq!(format!("{d}"), "line 12: undeclared variable 'x'");
    }

    #[test]
    fn test_diagnostics_preserve_order() {
        let mut diags = Diagnostics::new();
        diags.push(3, "first");
        diags.push(1, "second");
        diags.push(7, "third");
        let lines: Vec<u32> = diags.iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![3, 1, 7]);
    }

    #[test]
    fn test_diagnostics_empty() {
        let diags = Diagnostics::new();
        assert!(diags.is_empty());
        assert_eq!(diags.len(), 0);
    }

    #[test]
    fn test_diagnostic_json_round_trip() {
        let d = Diagnostic::new(5, "type error in range: float to int");
        let json = serde_json::to_string(&d).unwrap();
        assert!(json.contains("\"line\":5"));
        assert!(json.contains("\"message\""));

        let back: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }
}
