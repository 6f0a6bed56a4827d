pub mod error;
pub mod script;
pub mod value;
pub mod violation;

pub use error::{BudgetDimension, Direction, RateWindowKind, SafetyError};
pub use script::ScriptSource;
pub use value::Value;
pub use violation::{Violation, ViolationKind};
