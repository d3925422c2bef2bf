//! Tool registry and dispatch.

use futures_util::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{FailureKind, InvocationRequest, InvocationResult, Tool, ToolDescriptor, validate};
use crate::model::ToolSpec;

/// Name-keyed table of tools.
///
/// Built once at startup, then shared read-only (behind an `Arc`) by any
/// number of sessions. Iteration follows registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool already registered under its name.
    ///
    /// Returns the replaced tool, if any.
    pub fn register(&mut self, tool: impl Tool + 'static) -> Option<Arc<dyn Tool>> {
        self.register_arc(Arc::new(tool))
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Option<Arc<dyn Tool>> {
        let name = tool.descriptor().name().to_string();
        match self.index.get(&name) {
            Some(&slot) => {
                info!(tool = %name, "replacing registered tool");
                Some(std::mem::replace(&mut self.tools[slot], tool))
            }
            None => {
                debug!(tool = %name, "registering tool");
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
                None
            }
        }
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&slot| &self.tools[slot])
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter().map(|tool| tool.descriptor())
    }

    /// Model-facing specifications of every registered tool.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.descriptors().map(ToolDescriptor::spec).collect()
    }

    /// Validate and execute one invocation.
    ///
    /// Never fails and never panics past this boundary: unknown tools,
    /// rejected arguments, tool errors and tool panics all come back as
    /// [`InvocationResult::Failure`].
    pub async fn dispatch(&self, request: &InvocationRequest) -> InvocationResult {
        let name = &request.tool_name;
        let Some(tool) = self.get(name) else {
            warn!(tool = %name, "dispatch to unknown tool");
            return InvocationResult::failure(FailureKind::ToolNotFound, name.clone());
        };

        let arguments = match validate(tool.descriptor(), &request.arguments) {
            Ok(arguments) => arguments,
            Err(e) => {
                warn!(tool = %name, error = %e, "rejected tool arguments");
                return InvocationResult::failure(FailureKind::InvalidArguments, e.to_string());
            }
        };

        debug!(tool = %name, "invoking tool");
        match AssertUnwindSafe(tool.invoke(arguments)).catch_unwind().await {
            Ok(Ok(payload)) => InvocationResult::success(payload),
            Ok(Err(e)) => {
                warn!(tool = %name, error = %e, "tool failed");
                InvocationResult::failure(FailureKind::ExecutionError, e.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(tool = %name, panic = %message, "tool panicked");
                InvocationResult::failure(FailureKind::ExecutionError, message)
            }
        }
    }

    /// Dispatch `requests` one after another, returning results in request order.
    pub async fn dispatch_all(&self, requests: &[InvocationRequest]) -> Vec<InvocationResult> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.dispatch(request).await);
        }
        results
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.descriptors().map(ToolDescriptor::name))
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("tool panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("tool panicked: {s}")
    } else {
        "tool panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{Arguments, FnTool, ParameterSpec, ToolError};
    use serde_json::{Value, json};
    use std::sync::Mutex;

    fn echo(name: &str, prefix: &'static str) -> FnTool<impl Fn(&Arguments) -> Result<String, ToolError>> {
        let descriptor = ToolDescriptor::builder(name, "Echo text")
            .param(ParameterSpec::text("text"))
            .build()
            .unwrap();
        FnTool::new(descriptor, move |args: &Arguments| {
            Ok(format!("{prefix}{}", args.text("text")?))
        })
    }

    fn failing() -> FnTool<impl Fn(&Arguments) -> Result<String, ToolError>> {
        let descriptor = ToolDescriptor::builder("fail", "Always fails").build().unwrap();
        FnTool::new(descriptor, |_: &Arguments| Err(ToolError::execution("disk on fire")))
    }

    fn panicking() -> FnTool<impl Fn(&Arguments) -> Result<String, ToolError>> {
        let descriptor = ToolDescriptor::builder("panic", "Always panics").build().unwrap();
        FnTool::new(descriptor, |_: &Arguments| -> Result<String, ToolError> {
            panic!("boom")
        })
    }

    #[test]
    fn reregistration_replaces() {
        let mut registry = ToolRegistry::new();
        assert!(registry.register(echo("echo", "a:")).is_none());
        assert!(registry.register(echo("other", "")).is_none());
        assert!(registry.register(echo("echo", "b:")).is_some());
        assert_eq!(registry.len(), 2);

        let names: Vec<_> = registry.descriptors().map(ToolDescriptor::name).collect();
        assert_eq!(names, ["echo", "other"]);
    }

    #[tokio::test]
    async fn replaced_tool_is_the_one_dispatched() {
        let registry = ToolRegistry::new()
            .with(echo("echo", "a:"))
            .with(echo("echo", "b:"));
        let result = registry
            .dispatch(&InvocationRequest::new("echo", json!({"text": "hi"})))
            .await;
        assert_eq!(result, InvocationResult::success("b:hi"));
    }

    #[tokio::test]
    async fn unknown_tool_leaves_registry_usable() {
        let registry = ToolRegistry::new().with(echo("echo", ""));
        let missing = registry
            .dispatch(&InvocationRequest::new("nope", json!({})))
            .await;
        assert_eq!(
            missing,
            InvocationResult::failure(FailureKind::ToolNotFound, "nope")
        );

        let ok = registry
            .dispatch(&InvocationRequest::new("echo", json!({"text": "still here"})))
            .await;
        assert_eq!(ok, InvocationResult::success("still here"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn invalid_arguments_are_reported() {
        let registry = ToolRegistry::new().with(echo("echo", ""));
        let result = registry
            .dispatch(&InvocationRequest::new("echo", json!({})))
            .await;
        assert_eq!(result.failure_kind(), Some(FailureKind::InvalidArguments));
        assert!(result.to_string().contains("'text'"));
    }

    #[tokio::test]
    async fn tool_errors_and_panics_become_failures() {
        let registry = ToolRegistry::new().with(failing()).with(panicking());

        let failed = registry
            .dispatch(&InvocationRequest::new("fail", Value::Null))
            .await;
        assert_eq!(
            failed,
            InvocationResult::failure(FailureKind::ExecutionError, "disk on fire")
        );

        let panicked = registry
            .dispatch(&InvocationRequest::new("panic", Value::Null))
            .await;
        assert_eq!(panicked.failure_kind(), Some(FailureKind::ExecutionError));
        assert!(panicked.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn dispatch_all_preserves_request_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&log);
        let descriptor = ToolDescriptor::builder("record", "Record a value")
            .param(ParameterSpec::integer("n"))
            .build()
            .unwrap();
        let registry = ToolRegistry::new().with(FnTool::new(descriptor, move |args: &Arguments| {
            let n = args.integer("n")?;
            seen.lock().unwrap().push(n);
            Ok(n.to_string())
        }));

        let requests: Vec<_> = (0..5)
            .map(|n| InvocationRequest::new("record", json!({ "n": n })))
            .collect();
        let results = registry.dispatch_all(&requests).await;

        let payloads: Vec<_> = results.iter().map(ToString::to_string).collect();
        assert_eq!(payloads, ["0", "1", "2", "3", "4"]);
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }
}
