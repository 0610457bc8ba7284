//! Built-in tool implementations for Thoughtline.
//!
//! Each tool exposes a `spec()` describing it to the model and implements
//! [`ToolHandler`](thoughtline_core::ToolHandler) for the work itself.

pub mod calculator;
pub mod current_time;
pub mod weather_lookup;

use std::sync::Arc;
use thoughtline_core::error::AgentError;
use thoughtline_core::tool::ToolRegistry;

pub use calculator::CalculatorTool;
pub use current_time::CurrentTimeTool;
pub use weather_lookup::WeatherLookupTool;

/// Create a registry holding every built-in tool.
///
/// Registration order (and therefore prompt order): `getCurrentTime`,
/// `calculate`, `getWeather`.
pub fn default_registry() -> Result<ToolRegistry, AgentError> {
    let mut registry = ToolRegistry::new();
    registry.register(CurrentTimeTool::spec(), Arc::new(CurrentTimeTool::new()))?;
    registry.register(CalculatorTool::spec(), Arc::new(CalculatorTool))?;
    registry.register(WeatherLookupTool::spec(), Arc::new(WeatherLookupTool))?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_order() {
        let registry = default_registry().unwrap();
        assert_eq!(
            registry.names(),
            vec!["getCurrentTime", "calculate", "getWeather"]
        );
    }
}
