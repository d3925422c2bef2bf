//! The tool trait.

use async_trait::async_trait;

use super::{Arguments, ToolDescriptor, ToolError};

/// A named, schema-described callable exposed to the remote agent.
///
/// Implementations may read external state but never touch the registry
/// that holds them. The arguments handed to [`invoke`](Tool::invoke) have
/// already been validated against [`descriptor`](Tool::descriptor).
#[async_trait]
pub trait Tool: Send + Sync {
    fn descriptor(&self) -> &ToolDescriptor;

    async fn invoke(&self, arguments: Arguments) -> Result<String, ToolError>;
}

/// A tool backed by a synchronous function.
pub struct FnTool<F> {
    descriptor: ToolDescriptor,
    func: F,
}

impl<F> FnTool<F>
where
    F: Fn(&Arguments) -> Result<String, ToolError> + Send + Sync,
{
    pub fn new(descriptor: ToolDescriptor, func: F) -> Self {
        Self { descriptor, func }
    }
}

#[async_trait]
impl<F> Tool for FnTool<F>
where
    F: Fn(&Arguments) -> Result<String, ToolError> + Send + Sync,
{
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, arguments: Arguments) -> Result<String, ToolError> {
        (self.func)(&arguments)
    }
}

impl<F> std::fmt::Debug for FnTool<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.descriptor.name())
            .finish_non_exhaustive()
    }
}
