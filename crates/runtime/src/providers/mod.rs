//! Backend adapters.
//!
//! Each adapter implements the [`Backend`](crate::model::Backend) trait for
//! one way of reaching the hosted agent runtime.

mod http;
mod scripted;
mod sse;

pub use http::{Auth, HttpBackend, HttpBackendBuilder};
pub use scripted::{Reply, ScriptedBackend};
