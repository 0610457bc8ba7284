//! Model client implementations for Thoughtline.
//!
//! All clients implement the `thoughtline_core::ModelClient` trait.
//! [`build_from_config`] picks one based on configuration.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatModel;

use std::sync::Arc;
use std::time::Duration;
use thoughtline_config::AppConfig;
use thoughtline_core::error::ModelError;
use thoughtline_core::model::ModelClient;

/// Build the configured model client.
///
/// Fails with [`ModelError::NotConfigured`] when no API key is available
/// for a non-local endpoint.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn ModelClient>, ModelError> {
    let is_local = config.base_url.contains("localhost") || config.base_url.contains("127.0.0.1");

    let api_key = match (&config.api_key, is_local) {
        (Some(key), _) => key.clone(),
        (None, true) => "local".to_string(),
        (None, false) => {
            return Err(ModelError::NotConfigured(
                "no API key; set THOUGHTLINE_API_KEY or api_key in config.toml".into(),
            ));
        }
    };

    let name = if is_local { "local" } else { "openai_compat" };
    let client = OpenAiCompatModel::new(
        name,
        &config.base_url,
        api_key,
        &config.model,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    Ok(Arc::new(client))
}
