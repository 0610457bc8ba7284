//! `getWeather` — stub that returns mock weather data.
//!
//! Requires the `location` permission, so it doubles as the reference
//! permissioned tool. The stub is deterministic per location name so the
//! reasoning loop can be exercised end-to-end without network access.

use async_trait::async_trait;
use serde::Serialize;
use thoughtline_core::error::ToolError;
use thoughtline_core::permission::Permission;
use thoughtline_core::tool::{ParamSpec, ParamType, ToolArgs, ToolHandler, ToolSpec};

pub const NAME: &str = "getWeather";

pub struct WeatherLookupTool;

impl WeatherLookupTool {
    pub fn spec() -> ToolSpec {
        ToolSpec::new(
            NAME,
            "Look up current weather for a location. Returns temperature, conditions and humidity.",
        )
        .category("weather")
        .param(ParamSpec::required(
            "location",
            ParamType::String,
            "City name or location",
        ))
        .param(ParamSpec::optional(
            "units",
            ParamType::String,
            "'metric' or 'imperial' (default: metric)",
        ))
        .requires(Permission::Location)
    }
}

#[async_trait]
impl ToolHandler for WeatherLookupTool {
    async fn call(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let location = args
            .get("location")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ToolError::failed(NAME, "missing 'location' argument"))?;

        let units = match args.get("units").and_then(|v| v.as_str()) {
            None | Some("metric") => Units::Metric,
            Some("imperial") => Units::Imperial,
            Some(other) => {
                return Err(ToolError::failed(NAME, format!("unknown units '{other}'")));
            }
        };

        let report = mock_weather(location.trim(), units);
        serde_json::to_string(&report).map_err(|e| ToolError::failed(NAME, e.to_string()))
    }
}

#[derive(Clone, Copy)]
enum Units {
    Metric,
    Imperial,
}

#[derive(Serialize)]
struct WeatherReport {
    location: String,
    temperature: f64,
    units: &'static str,
    conditions: &'static str,
    humidity: u32,
}

const CONDITIONS: [&str; 6] = [
    "Clear skies",
    "Partly cloudy",
    "Overcast",
    "Light rain",
    "Thunderstorms",
    "Foggy",
];

/// Deterministic weather derived from a hash of the location name.
fn mock_weather(location: &str, units: Units) -> WeatherReport {
    let hash = location
        .to_lowercase()
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));

    let celsius = f64::from(hash % 40) - 5.0;
    let (temperature, label) = match units {
        Units::Metric => (celsius, "°C"),
        Units::Imperial => (celsius * 9.0 / 5.0 + 32.0, "°F"),
    };

    WeatherReport {
        location: location.to_string(),
        temperature: (temperature * 10.0).round() / 10.0,
        units: label,
        conditions: CONDITIONS[(hash as usize / 7) % CONDITIONS.len()],
        humidity: 30 + hash % 60,
    }
}
