//! Static-validation findings.

use std::fmt;

use serde::Serialize;

/// Categories of static violation the validator can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Call to a denylisted method name, or a misused module import.
    DangerousMethod,
    /// Member call on a denylisted system-capability namespace.
    DangerousConstant,
    /// Bare reference to a denylisted constant.
    DangerousConstantAccess,
    /// Reference to an interpreter-introspection global.
    DangerousGlobal,
    /// Inline shell-execution literal.
    BacktickExecution,
    /// The source could not be parsed at all; treated as unsafe.
    SyntaxError,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::DangerousMethod => "dangerous_method",
            ViolationKind::DangerousConstant => "dangerous_constant",
            ViolationKind::DangerousConstantAccess => "dangerous_constant_access",
            ViolationKind::DangerousGlobal => "dangerous_global",
            ViolationKind::BacktickExecution => "backtick_execution",
            ViolationKind::SyntaxError => "syntax_error",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finding produced by the static validator. Never deduplicated: each
/// independent occurrence in the source yields its own violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub kind: ViolationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub message: String,
}

impl Violation {
    pub fn new(kind: ViolationKind, line: Option<u32>, message: impl Into<String>) -> Self {
        Self {
            kind,
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "[{}] line {}: {}", self.kind, line, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

/// One bullet line per violation, for aggregated error messages.
pub fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("  - {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_line_when_known() {
        let v = Violation::new(ViolationKind::DangerousGlobal, Some(7), "reference to `$LOAD_PATH`");
        assert_eq!(v.to_string(), "[dangerous_global] line 7: reference to `$LOAD_PATH`");
    }

    #[test]
    fn display_omits_missing_line() {
        let v = Violation::new(ViolationKind::SyntaxError, None, "unparseable script");
        assert_eq!(v.to_string(), "[syntax_error] unparseable script");
    }
}
