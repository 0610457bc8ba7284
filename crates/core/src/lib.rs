//! # Thoughtline Core
//!
//! Domain types, collaborator traits, and error definitions for the
//! Thoughtline reasoning executor. This crate has **no runtime logic** of
//! its own: it defines the model that the agent, tools, and providers
//! crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here:
//! - [`ModelClient`] — the generative model call (prompt in, text out)
//! - [`ToolHandler`] — the handler behind a registered tool
//! - [`PermissionGate`] — the capability check guarding permissioned tools
//!
//! The reasoning engine receives all of them at construction time, so tests
//! swap in scripted doubles and several engines can coexist without shared
//! global state.

pub mod agent;
pub mod error;
pub mod model;
pub mod permission;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentConfig, AgentStatus, ExecutionResult, StatusDelta, UnstructuredPolicy};
pub use error::{AgentError, ModelError, ToolError};
pub use model::{CompletionRequest, FragmentReceiver, ModelClient};
pub use permission::{AllowAll, Permission, PermissionGate, PermissionStatus, StaticPermissions};
pub use tool::{
    FnHandler, ParamSpec, ParamType, RegisteredTool, ToolArgs, ToolHandler, ToolRegistry, ToolSpec,
    handler_fn,
};
