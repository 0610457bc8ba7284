//! Tool dispatcher — turns a parsed action into Observation text.
//!
//! Dispatch never fails from the engine's point of view: lookup misses,
//! permission denials, bad arguments and handler errors are all rendered as
//! `Error: ...` text so the model can see what went wrong and adjust.

use std::sync::Arc;
use thoughtline_core::error::ToolError;
use thoughtline_core::permission::{Permission, PermissionGate, PermissionStatus};
use thoughtline_core::tool::{ToolArgs, ToolRegistry, ToolSpec};
use tracing::{debug, warn};

use crate::parser::ParsedAction;

pub struct ToolDispatcher {
    tools: Arc<ToolRegistry>,
    permissions: Arc<dyn PermissionGate>,
    request_on_denied: bool,
}

impl ToolDispatcher {
    pub fn new(tools: Arc<ToolRegistry>, permissions: Arc<dyn PermissionGate>) -> Self {
        Self {
            tools,
            permissions,
            request_on_denied: false,
        }
    }

    /// Ask the gate once for a `Denied` permission before giving up.
    pub fn with_request_on_denied(mut self, enabled: bool) -> Self {
        self.request_on_denied = enabled;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// Run an action and return the Observation text.
    pub async fn dispatch(&self, action: &ParsedAction) -> String {
        match self.try_dispatch(&action.tool, &action.args).await {
            Ok(output) => {
                debug!(tool = %action.tool, output_len = output.len(), "Tool succeeded");
                output
            }
            Err(e) => {
                warn!(tool = %action.tool, error = %e, "Tool dispatch failed");
                format!("Error: {e}")
            }
        }
    }

    /// Look up, gate, validate, then invoke.
    pub async fn try_dispatch(&self, name: &str, args: &ToolArgs) -> Result<String, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        let spec = tool.spec();

        if let Some(permission) = &spec.permission {
            self.authorize(&spec.name, permission).await?;
        }

        validate_args(spec, args)?;

        debug!(tool = %name, "Invoking tool");
        tool.handler().call(args).await
    }

    async fn authorize(&self, tool_name: &str, permission: &Permission) -> Result<(), ToolError> {
        let mut status = self.permissions.check(permission).await;
        if status == PermissionStatus::Denied && self.request_on_denied {
            debug!(tool = %tool_name, %permission, "Requesting denied permission");
            status = self.permissions.request(permission).await;
        }

        if status.is_granted() {
            Ok(())
        } else {
            Err(ToolError::PermissionDenied {
                tool_name: tool_name.to_string(),
                permission: permission.to_string(),
            })
        }
    }
}

/// Required parameters must be present; any present, non-null parameter
/// must have its declared type. Undeclared arguments pass through.
fn validate_args(spec: &ToolSpec, args: &ToolArgs) -> Result<(), ToolError> {
    for param in &spec.parameters {
        match args.get(&param.name) {
            None | Some(serde_json::Value::Null) if param.required => {
                return Err(ToolError::failed(
                    &spec.name,
                    format!("missing required parameter '{}'", param.name),
                ));
            }
            Some(value) if !value.is_null() && !param.param_type.matches(value) => {
                return Err(ToolError::failed(
                    &spec.name,
                    format!(
                        "parameter '{}' must be of type {}",
                        param.name, param.param_type
                    ),
                ));
            }
            _ => {}
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────
