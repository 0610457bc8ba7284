//! `thoughtline prompt` — Print the rendered system prompt.

use thoughtline_agent::PromptBuilder;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let registry = thoughtline_tools::default_registry()?;
    println!("{}", PromptBuilder::new().build(&registry));
    Ok(())
}
