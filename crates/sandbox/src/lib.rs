//! Static validation and runtime capability sandboxing for agent scripts.
//!
//! Two layers, both fail closed:
//!
//! - [`StaticValidator`] walks the syntax tree against a fixed denylist and
//!   collects every violation without executing anything.
//! - [`ExecutionSandbox`] re-validates, then interprets the script behind a
//!   capability-dispatch gate: the only operations reachable from inside a
//!   script are a handful of inert builtins and whatever the caller's
//!   [`CapabilityContext`] explicitly exposes.

pub mod capability;
pub mod denylist;
pub mod sandbox;
pub mod shellwords;
pub mod validator;

pub use capability::{CallRecord, CapabilityContext};
pub use sandbox::ExecutionSandbox;
pub use validator::StaticValidator;
