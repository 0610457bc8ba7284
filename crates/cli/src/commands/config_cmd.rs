//! `thoughtline config` — Show the effective configuration.

use thoughtline_config::AppConfig;

pub fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    println!("{}", config.to_redacted_toml());
    if !config.has_api_key() {
        eprintln!("  note: no API key set (THOUGHTLINE_API_KEY or OPENAI_API_KEY)");
    }
    Ok(())
}

pub fn path() {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
}
