//! Fixed denylist and allowlist vocabularies for the agent-script surface.
//!
//! Matching is exact-identifier: the target names are fixed tokens of the
//! DSL, never case-folded.

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Call names that must never appear in agent scripts.
pub static DANGEROUS_CALLS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // process spawning
        "spawn",
        "fork",
        "exec",
        // shell execution
        "system",
        "popen",
        // dynamic evaluation
        "eval",
        "load",
        "compile",
        // reflection-based method/constant access
        "send",
        "invoke",
        "reflect",
        "const_get",
        // object / GC introspection
        "object_space",
        "gc",
        // process-lifecycle control
        "exit",
        "abort",
        "at_exit",
        "trap",
    ]
    .into_iter()
    .collect()
});

/// The module-import call family. Permitted only with a literal trusted
/// module name; anything else is rejected.
pub const IMPORT_CALLS: &[&str] = &["use", "import"];

/// Module identifiers the static validator accepts as import arguments.
pub const TRUSTED_IMPORTS: &[&str] = &["warden", "warden/assert"];

/// The single module the runtime sandbox will actually load. Narrower than
/// [`TRUSTED_IMPORTS`]: a statically accepted import can still be denied at
/// run time.
pub const RUNTIME_IMPORT: &str = "warden";

/// System-capability namespaces scripts may never touch, in receiver
/// position or as bare references.
pub static DANGEROUS_CONSTANTS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "File", "Dir", "Io", "Process", "Thread", "Socket", "Net", "Stdin", "Stdout", "Stderr",
        "Sys", "Gc", "Kernel",
    ]
    .into_iter()
    .collect()
});

/// Interpreter-introspection globals.
pub const DANGEROUS_GLOBALS: &[&str] = &["$PROGRAM_NAME", "$LOAD_PATH", "$LOADED_MODULES"];

/// Side-effect-free value-type constants the sandbox resolves to inert type
/// tags.
pub const TYPE_CONSTANTS: &[&str] = &["String", "Number", "Boolean", "List", "Map", "Null"];

/// Capability namespace whose member calls forward to context operations
/// named `http.<member>`.
pub const HTTP_NAMESPACE: &str = "Http";

/// Subprocess-free shell-word helper namespace, implemented in-process.
pub const SHELLWORDS_NAMESPACE: &str = "Shellwords";

/// Unqualified calls the sandbox exposes unconditionally: inert,
/// side-effect-free primitives.
pub const ALWAYS_SAFE_CALLS: &[&str] = &["type_of", "to_string", "to_number", "len", "eq"];

pub fn is_dangerous_call(name: &str) -> bool {
    DANGEROUS_CALLS.contains(name)
}

pub fn is_import_call(name: &str) -> bool {
    IMPORT_CALLS.contains(&name)
}

pub fn is_trusted_import(module: &str) -> bool {
    TRUSTED_IMPORTS.contains(&module)
}

pub fn is_dangerous_constant(name: &str) -> bool {
    DANGEROUS_CONSTANTS.contains(name)
}

pub fn is_dangerous_global(name: &str) -> bool {
    DANGEROUS_GLOBALS.contains(&name)
}

pub fn is_always_safe_call(name: &str) -> bool {
    ALWAYS_SAFE_CALLS.contains(&name)
}

pub fn is_type_constant(name: &str) -> bool {
    TYPE_CONSTANTS.contains(&name)
}
