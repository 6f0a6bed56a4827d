//! The capability boundary: an explicit allowed-operation registry.
//!
//! There is no ambient authority inside the sandbox. A script can only reach
//! what its context names in [`CapabilityContext::operations`]; the default
//! answer is deny.

use serde::Serialize;

use scriptwarden_core::{SafetyError, Value};

/// The object whose public operations define everything a sandboxed script
/// is allowed to do.
///
/// The sandbox borrows the context for the duration of one execution and
/// forwards a call only when its exact name appears in `operations()`.
pub trait CapabilityContext {
    /// Exact names of the operations this context exposes. This set *is*
    /// the effective permission set.
    fn operations(&self) -> Vec<String>;

    /// Invoke a permitted operation with its arguments, unchanged.
    /// Called only with names returned by `operations()`.
    fn invoke(&self, operation: &str, args: &[Value]) -> Result<Value, SafetyError>;

    fn exposes(&self, operation: &str) -> bool {
        self.operations().iter().any(|op| op == operation)
    }
}

/// One intercepted call, recorded before any authorization decision, so
/// denied attempts are always present in the trail.
///
/// Only argument *type* shapes are kept; raw values never reach the trail,
/// so secrets cannot leak through it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallRecord {
    /// `"sandbox"` for unqualified calls, otherwise the namespace constant.
    pub receiver: String,
    pub method: String,
    pub arg_types: Vec<String>,
}

impl CallRecord {
    pub fn new(receiver: &str, method: &str, args: &[Value]) -> Self {
        Self {
            receiver: receiver.to_string(),
            method: method.to_string(),
            arg_types: args.iter().map(|a| a.type_name().to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_captures_shapes_not_values() {
        let record = CallRecord::new(
            "sandbox",
            "fetch",
            &[Value::Str("https://secret.example".into()), Value::Number(3.0)],
        );
        assert_eq!(record.arg_types, vec!["String", "Number"]);
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("secret"));
    }
}
