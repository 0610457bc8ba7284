//! `thoughtline tools` — List the built-in tools.

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let registry = thoughtline_tools::default_registry()?;

    println!();
    println!("  {} tools available:", registry.len());
    println!();
    for spec in registry.specs() {
        let permission = spec
            .permission
            .as_ref()
            .map(|p| format!("  (requires {p})"))
            .unwrap_or_default();
        println!("  {:<16} [{}]{permission}", spec.name, spec.category);
        println!("      {}", spec.description);
        for param in &spec.parameters {
            let presence = if param.required { "required" } else { "optional" };
            println!(
                "      - {}: {} ({presence})",
                param.name, param.param_type
            );
        }
        println!();
    }
    Ok(())
}
