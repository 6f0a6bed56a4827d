/// An immutable script body plus a diagnostic label.
///
/// The label is a file-path-like identifier used only in error messages; it
/// is never dereferenced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSource {
    source: String,
    label: String,
}

impl ScriptSource {
    pub fn new(source: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            label: label.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}
