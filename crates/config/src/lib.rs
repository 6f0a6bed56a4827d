//! Safety configuration: schema, defaults, validation, and file I/O.

pub mod defaults;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::{apply_defaults, default_audit_sink, DEFAULT_AGENT_NAME};
pub use io::load_config;
pub use schema::SafetyConfig;
pub use validation::{validate, ValidationReport};
