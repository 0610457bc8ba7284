//! Prompt builder — renders the tool catalogue and response-format rules.
//!
//! The system prompt is built once per run and reused for every iteration;
//! each turn appends the query and the transcript so far.

use std::fmt::Write;
use thoughtline_core::tool::{ToolRegistry, ToolSpec};

const DEFAULT_PREAMBLE: &str = "You are a careful assistant that solves tasks step by step. \
You may call tools to gather information before answering.";

const FORMAT_RULES: &str = "\
Respond in exactly one of these formats.

To use a tool:
Thought: <your reasoning>
Action: {\"tool\": \"<tool name>\", \"args\": {<arguments>}}

When you know the answer:
Final Answer: <the answer>

Use at most one Action per response. After each Action you will receive an \
Observation with the tool's result. Never write the Observation yourself.";

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    preamble: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            preamble: DEFAULT_PREAMBLE.to_string(),
        }
    }
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the opening paragraph.
    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = preamble.into();
        self
    }

    /// Render the system prompt: preamble, tools in registration order,
    /// then the format rules.
    pub fn build(&self, tools: &ToolRegistry) -> String {
        let mut out = String::new();
        let preamble = self.preamble.trim();
        if !preamble.is_empty() {
            out.push_str(preamble);
            out.push_str("\n\n");
        }

        if tools.is_empty() {
            out.push_str("No tools are available.\n\n");
        } else {
            out.push_str("Available tools:\n");
            for spec in tools.specs() {
                render_tool(&mut out, spec);
            }
            out.push('\n');
        }

        out.push_str(FORMAT_RULES);
        out
    }
}

fn render_tool(out: &mut String, spec: &ToolSpec) {
    // Writing to a String cannot fail.
    let _ = write!(out, "- {} [{}]: {}", spec.name, spec.category, spec.description);
    if let Some(permission) = &spec.permission {
        let _ = write!(out, " (requires {permission} permission)");
    }
    out.push('\n');

    if spec.parameters.is_empty() {
        out.push_str("    (no parameters)\n");
    }
    for param in &spec.parameters {
        let presence = if param.required { "required" } else { "optional" };
        let _ = writeln!(
            out,
            "    - {} ({}, {}): {}",
            param.name, param.param_type, presence, param.description
        );
    }
}

/// One turn's prompt: system prompt, the original query, and the transcript.
pub fn render_turn(system_prompt: &str, query: &str, transcript: &str) -> String {
    let mut out = format!("{system_prompt}\n\nQuestion: {query}\n");
    if !transcript.is_empty() {
        out.push_str(transcript);
        out.push('\n');
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────
