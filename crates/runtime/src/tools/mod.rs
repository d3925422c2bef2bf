//! Tool contract: parameter declarations, descriptors, validation and dispatch.

mod descriptor;
pub mod errors;
mod registry;
mod spec;
mod tool;
mod types;
mod validate;

pub use descriptor::{DescriptorBuilder, ToolDescriptor};
pub use errors::{SchemaError, ToolError, ValidationError};
pub use registry::ToolRegistry;
pub use spec::{NumericRange, ParamKind, ParamValue, ParameterSpec};
pub use tool::{FnTool, Tool};
pub use types::{FailureKind, InvocationRequest, InvocationResult};
pub use validate::{Arguments, validate};
