//! Effect parameters
//!
//! Follows a data/dispatch split:
//! - `types` - keys, values and function descriptors (pure data)
//! - `store` - the current value of every adjusted parameter
//! - `applier` - translation into engine calls

pub mod applier;
pub mod store;
pub mod types;

pub use applier::ParameterApplier;
pub use store::ParameterStore;
pub use types::{FunctionDescriptor, FunctionKind, ParameterKey, ParameterValue};
