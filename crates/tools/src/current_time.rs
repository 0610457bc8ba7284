//! `getCurrentTime` — reports the current date and time.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use std::sync::Arc;
use thoughtline_core::error::ToolError;
use thoughtline_core::tool::{ParamSpec, ParamType, ToolArgs, ToolHandler, ToolSpec};

pub const NAME: &str = "getCurrentTime";

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct CurrentTimeTool {
    clock: Clock,
}

impl CurrentTimeTool {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(Utc::now),
        }
    }

    /// Use a fixed clock (tests, replays).
    pub fn with_clock(clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        Self {
            clock: Arc::new(clock),
        }
    }

    pub fn spec() -> ToolSpec {
        ToolSpec::new(
            NAME,
            "Get the current date and time, optionally shifted to a UTC offset.",
        )
        .category("time")
        .param(ParamSpec::optional(
            "utc_offset_minutes",
            ParamType::Integer,
            "Offset from UTC in minutes, e.g. 120 for UTC+2 (default: 0)",
        ))
    }
}

impl Default for CurrentTimeTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for CurrentTimeTool {
    async fn call(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let offset_minutes = args
            .get("utc_offset_minutes")
            .and_then(|v| v.as_i64())
            .unwrap_or(0);

        let offset = i32::try_from(offset_minutes)
            .ok()
            .and_then(|m| m.checked_mul(60))
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                ToolError::failed(
                    NAME,
                    format!("utc offset {offset_minutes} minutes is out of range"),
                )
            })?;

        let now = (self.clock)().with_timezone(&offset);
        Ok(format!("{} ({})", now.to_rfc3339(), now.format("%A")))
    }
}
