//! Response parser — classifies raw model output.
//!
//! Every response lands in exactly one of four buckets:
//!
//! - **FinalAnswer**: a `Final Answer:` marker anywhere (case-insensitive).
//!   The marker wins over any action-like content.
//! - **Action**: `Action:` followed by an object, either strict JSON
//!   (`{"tool": "x", "args": {...}}`) or the relaxed form models tend to
//!   produce (`{tool: getCurrentTime}`), or `Action: <name>` with an
//!   optional `Action Input: {...}` line.
//! - **ThoughtOnly**: a `Thought:` label and nothing actionable.
//! - **Invalid**: empty output, or an action that cannot be parsed.
//!
//! Unlabelled prose falls under [`UnstructuredPolicy`].
//!
//! Classification is pure and total: no input panics, no input errors.

use serde_json::{Map, Value};
use std::iter::Peekable;
use std::str::Chars;
use thoughtline_core::agent::UnstructuredPolicy;
use thoughtline_core::tool::ToolArgs;

const FINAL_ANSWER: &str = "final answer:";
const ACTION: &str = "action:";
const ACTION_INPUT: &str = "action input:";
const THOUGHT: &str = "thought:";

/// Keys accepted for the tool name inside an action object.
const TOOL_KEYS: [&str; 2] = ["tool", "name"];
/// Keys accepted for the argument object inside an action object.
const ARG_KEYS: [&str; 4] = ["args", "arguments", "input", "parameters"];

/// Deepest object/array nesting the relaxed reader accepts.
const MAX_NESTING: usize = 64;

/// A classified model response.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    FinalAnswer(String),
    Action(ParsedAction),
    ThoughtOnly(String),
    Invalid { reason: String },
}

impl Parsed {
    fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAction {
    /// Reasoning text that preceded the action, if any.
    pub thought: Option<String>,
    pub tool: String,
    pub args: ToolArgs,
}

impl ParsedAction {
    pub fn new(tool: impl Into<String>, args: ToolArgs) -> Self {
        Self {
            thought: None,
            tool: tool.into(),
            args,
        }
    }

    /// Canonical JSON rendering, as recorded in the transcript.
    pub fn to_action_text(&self) -> String {
        format!(
            "{{\"tool\": {}, \"args\": {}}}",
            Value::String(self.tool.clone()),
            Value::Object(self.args.clone())
        )
    }
}

/// Stateless classifier for model output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseParser {
    policy: UnstructuredPolicy,
}

impl ResponseParser {
    pub fn new(policy: UnstructuredPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> UnstructuredPolicy {
        self.policy
    }

    /// Classify one raw model response.
    pub fn classify(&self, text: &str) -> Parsed {
        let text = text.trim();
        if text.is_empty() {
            return Parsed::invalid("the response was empty");
        }

        if let Some(at) = find_label(text, FINAL_ANSWER) {
            return Parsed::FinalAnswer(text[at + FINAL_ANSWER.len()..].trim().to_string());
        }

        if let Some(at) = find_label(text, ACTION) {
            return match parse_action(&text[at + ACTION.len()..]) {
                Ok((tool, args)) => Parsed::Action(ParsedAction {
                    thought: leading_thought(&text[..at]),
                    tool,
                    args,
                }),
                Err(reason) => Parsed::Invalid { reason },
            };
        }

        if let Some(at) = find_label(text, THOUGHT) {
            let thought = text[at + THOUGHT.len()..].trim();
            if thought.is_empty() {
                return Parsed::invalid("the Thought was empty");
            }
            return Parsed::ThoughtOnly(thought.to_string());
        }

        match self.policy {
            UnstructuredPolicy::Strict => {
                Parsed::invalid("no Final Answer, Action or Thought label was found")
            }
            UnstructuredPolicy::Permissive => Parsed::FinalAnswer(text.to_string()),
        }
    }
}

// ── Labels ────────────────────────────────────────────────────────────────

/// Byte offset of the first case-insensitive `label` that starts a word.
///
/// `label` must be lowercase ASCII.
fn find_label(text: &str, label: &str) -> Option<usize> {
    // ASCII lowercasing keeps byte offsets valid for `text`.
    let lower = text.to_ascii_lowercase();
    let mut from = 0;
    while let Some(pos) = lower[from..].find(label) {
        let at = from + pos;
        let at_word_start = lower[..at]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        if at_word_start {
            return Some(at);
        }
        from = at + label.len();
    }
    None
}

/// The text before `Action:`, minus a leading `Thought:` label.
fn leading_thought(prefix: &str) -> Option<String> {
    let prefix = prefix.trim();
    let body = match find_label(prefix, THOUGHT) {
        Some(0) => &prefix[THOUGHT.len()..],
        _ => prefix,
    };
    let body = body.trim();
    (!body.is_empty()).then(|| body.to_string())
}

// ── Actions ───────────────────────────────────────────────────────────────

fn parse_action(rest: &str) -> Result<(String, ToolArgs), String> {
    let rest = rest.trim_start();
    if rest.starts_with('{') {
        return action_from_object(parse_object(rest)?);
    }

    let name = rest.lines().next().unwrap_or_default().trim();
    if name.is_empty() {
        return Err("Action: was not followed by a tool".into());
    }
    if !is_tool_name(name) {
        return Err(format!("'{name}' is not a valid tool name"));
    }

    let args = match find_label(rest, ACTION_INPUT) {
        Some(at) => {
            let input = rest[at + ACTION_INPUT.len()..].trim();
            if input.is_empty() {
                ToolArgs::new()
            } else {
                parse_object(input)?
            }
        }
        None => ToolArgs::new(),
    };
    Ok((name.to_string(), args))
}

fn action_from_object(mut object: Map<String, Value>) -> Result<(String, ToolArgs), String> {
    let tool = match TOOL_KEYS.iter().find_map(|key| object.remove(*key)) {
        Some(Value::String(name)) if is_tool_name(name.trim()) => name.trim().to_string(),
        Some(other) => return Err(format!("{other} is not a valid tool name")),
        None => return Err("the action object has no \"tool\" field".into()),
    };

    let args = match ARG_KEYS.iter().find_map(|key| object.remove(*key)) {
        Some(Value::Object(args)) => args,
        Some(Value::Null) => ToolArgs::new(),
        // Some models send arguments as a JSON-encoded string.
        Some(Value::String(encoded)) if encoded.trim().is_empty() => ToolArgs::new(),
        Some(Value::String(encoded)) => parse_object(encoded.trim())?,
        Some(_) => return Err("action arguments must be an object".into()),
        // No argument key: the remaining fields are the arguments.
        None => object,
    };
    Ok((tool, args))
}

fn is_tool_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Parse the object at the start of `text`, strict JSON first, relaxed second.
fn parse_object(text: &str) -> Result<Map<String, Value>, String> {
    if !text.starts_with('{') {
        return Err("expected an object starting with '{'".into());
    }
    let slice = balanced_object(text).ok_or("the action object is never closed")?;
    if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(slice) {
        return Ok(object);
    }
    parse_relaxed(slice).map_err(|e| format!("could not parse the action object: {e}"))
}

/// The prefix of `text` up to the brace closing the first `{`.
fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut prev = ' ';

    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' => quote = Some(c),
            // Apostrophes inside bare words are text, not quotes.
            '\'' if matches!(prev, ':' | ',' | '[' | '{') => quote = Some(c),
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
        if !c.is_whitespace() {
            prev = c;
        }
    }
    None
}

// ── Relaxed object syntax ─────────────────────────────────────────────────

fn parse_relaxed(text: &str) -> Result<Map<String, Value>, String> {
    let mut parser = Relaxed {
        chars: text.chars().peekable(),
        depth: 0,
    };
    let value = parser.value()?;
    parser.skip_ws();
    if parser.chars.peek().is_some() {
        return Err("trailing characters after the object".into());
    }
    match value {
        Value::Object(object) => Ok(object),
        _ => Err("expected an object".into()),
    }
}

/// JSON-ish reader: bare keys, bare-word values, single quotes, trailing commas.
struct Relaxed<'a> {
    chars: Peekable<Chars<'a>>,
    depth: usize,
}

impl Relaxed<'_> {
    fn skip_ws(&mut self) {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}
    }

    fn value(&mut self) -> Result<Value, String> {
        self.skip_ws();
        match self.chars.peek().copied() {
            Some(open @ ('{' | '[')) => {
                if self.depth >= MAX_NESTING {
                    return Err("nesting too deep".into());
                }
                self.depth += 1;
                let nested = if open == '{' {
                    self.object()
                } else {
                    self.array()
                };
                self.depth -= 1;
                nested
            }
            Some(q @ ('"' | '\'')) => self.quoted(q).map(Value::String),
            Some(_) => {
                let word = self.bare_word();
                if word.is_empty() {
                    return Err("missing value".into());
                }
                Ok(bare_value(&word))
            }
            None => Err("unexpected end of input".into()),
        }
    }

    fn object(&mut self) -> Result<Value, String> {
        self.chars.next();
        let mut object = Map::new();
        loop {
            self.skip_ws();
            match self.chars.peek() {
                Some('}') => {
                    self.chars.next();
                    return Ok(Value::Object(object));
                }
                None => return Err("unterminated object".into()),
                _ => {}
            }

            let key = self.key()?;
            self.skip_ws();
            if self.chars.next_if_eq(&':').is_none() {
                return Err(format!("expected ':' after '{key}'"));
            }
            let value = self.value()?;
            object.insert(key, value);

            self.skip_ws();
            match self.chars.next() {
                Some(',') => {}
                Some('}') => return Ok(Value::Object(object)),
                Some(c) => return Err(format!("unexpected '{c}' in object")),
                None => return Err("unterminated object".into()),
            }
        }
    }

    fn array(&mut self) -> Result<Value, String> {
        self.chars.next();
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.chars.peek() {
                Some(']') => {
                    self.chars.next();
                    return Ok(Value::Array(items));
                }
                None => return Err("unterminated array".into()),
                _ => {}
            }

            items.push(self.value()?);

            self.skip_ws();
            match self.chars.next() {
                Some(',') => {}
                Some(']') => return Ok(Value::Array(items)),
                Some(c) => return Err(format!("unexpected '{c}' in array")),
                None => return Err("unterminated array".into()),
            }
        }
    }

    fn key(&mut self) -> Result<String, String> {
        match self.chars.peek().copied() {
            Some(q @ ('"' | '\'')) => self.quoted(q),
            Some(c) if c.is_alphanumeric() || c == '_' => {
                let mut key = String::new();
                while let Some(c) = self
                    .chars
                    .next_if(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
                {
                    key.push(c);
                }
                Ok(key)
            }
            Some(c) => Err(format!("unexpected '{c}' where a key was expected")),
            None => Err("unterminated object".into()),
        }
    }

    fn quoted(&mut self, quote: char) -> Result<String, String> {
        self.chars.next();
        let mut out = String::new();
        loop {
            match self.chars.next() {
                Some('\\') => match self.chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(c) => out.push(c),
                    None => return Err("unterminated string".into()),
                },
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
                None => return Err("unterminated string".into()),
            }
        }
    }

    /// Everything up to the next delimiter, trimmed.
    fn bare_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self
            .chars
            .next_if(|c| !matches!(c, ',' | '}' | ']' | '\n'))
        {
            word.push(c);
        }
        word.trim().to_string()
    }
}

/// Interpret a bare word: literals and numbers keep their type, the rest is text.
fn bare_value(word: &str) -> Value {
    match word {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }
    if let Ok(n) = word.parse::<i64>() {
        return Value::from(n);
    }
    word.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(word.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strict() -> ResponseParser {
        ResponseParser::new(UnstructuredPolicy::Strict)
    }

    fn expect_action(parsed: Parsed) -> ParsedAction {
        match parsed {
            Parsed::Action(action) => action,
            other => panic!("expected an action, got {other:?}"),
        }
    }

    #[test]
    fn final_answer_anywhere_case_insensitive() {
        assert_eq!(
            strict().classify("Thought: done.\nfinal ANSWER:   It is noon  "),
            Parsed::FinalAnswer("It is noon".into())
        );
    }

    #[test]
    fn final_answer_wins_over_action() {
        let parsed = strict().classify("Action: {tool: calculate}\nFinal Answer: 4");
        assert_eq!(parsed, Parsed::FinalAnswer("4".into()));
    }

    #[test]
    fn strict_json_action_with_thought() {
        let parsed = strict().classify(
            "Thought: I should add.\nAction: {\"tool\": \"calculate\", \"args\": {\"expression\": \"2+2\"}}",
        );
        let action = expect_action(parsed);
        assert_eq!(action.thought.as_deref(), Some("I should add."));
        assert_eq!(action.tool, "calculate");
        assert_eq!(action.args["expression"], "2+2");
    }

    #[test]
    fn relaxed_object_with_bare_words() {
        let action = expect_action(strict().classify("Action: {tool: getCurrentTime}"));
        assert_eq!(action.tool, "getCurrentTime");
        assert!(action.args.is_empty());
        assert!(action.thought.is_none());

        let action = action_of(
            "Action: {name: getWeather, input: {location: New York, units: 'imperial'},}",
        );
        assert_eq!(action.tool, "getWeather");
        assert_eq!(action.args["location"], "New York");
        assert_eq!(action.args["units"], "imperial");
    }

    fn action_of(text: &str) -> ParsedAction {
        expect_action(strict().classify(text))
    }

    #[test]
    fn argument_key_aliases() {
        for key in ARG_KEYS {
            let text = format!(
                "Action: {{\"tool\": \"calculate\", \"{key}\": {{\"expression\": \"1\"}}}}"
            );
            assert_eq!(action_of(&text).args["expression"], "1", "alias {key}");
        }
    }

    #[test]
    fn flat_object_uses_remaining_fields_as_args() {
        let action = action_of("Action: {tool: calculate, expression: 2 * 21}");
        assert_eq!(action.args["expression"], "2 * 21");
    }

    #[test]
    fn bare_values_keep_their_type() {
        let action = action_of(
            "Action: {tool: getCurrentTime, args: {utc_offset_minutes: -60, dst: true}}",
        );
        assert_eq!(action.args["utc_offset_minutes"], json!(-60));
        assert_eq!(action.args["dst"], json!(true));
    }

    #[test]
    fn arguments_as_encoded_string() {
        let action = action_of(
            r#"Action: {"tool": "calculate", "arguments": "{\"expression\": \"3*3\"}"}"#,
        );
        assert_eq!(action.args["expression"], "3*3");
    }

    #[test]
    fn name_then_action_input() {
        let action = action_of(
            "Thought: weather time\nAction: getWeather\nAction Input: {\"location\": \"Paris\"}",
        );
        assert_eq!(action.tool, "getWeather");
        assert_eq!(action.args["location"], "Paris");
        assert_eq!(action.thought.as_deref(), Some("weather time"));

        let action = action_of("Action: getCurrentTime");
        assert!(action.args.is_empty());
    }

    #[test]
    fn apostrophes_in_bare_words() {
        let action = action_of("Action: {tool: getWeather, location: Martha's Vineyard}");
        assert_eq!(action.args["location"], "Martha's Vineyard");
    }

    #[test]
    fn thought_only() {
        assert_eq!(
            strict().classify("Thought: I need to think more."),
            Parsed::ThoughtOnly("I need to think more.".into())
        );
    }

    #[test]
    fn invalid_inputs() {
        for text in [
            "",
            "   \n ",
            "Action:",
            "Action: {tool: calculate",
            "Action: {args: {}}",
            "Action: do the thing!",
            "Action: {\"tool\": 42}",
            "Action: {tool: calculate, args: [1, 2]}",
            "Action: calculate\nAction Input: \"2+2\"",
            "Thought:",
        ] {
            assert!(
                matches!(strict().classify(text), Parsed::Invalid { .. }),
                "expected invalid for {text:?}"
            );
        }
    }

    #[test]
    fn label_requires_word_start() {
        // "transaction:" must not read as "action:".
        let parsed = strict().classify("Transaction: {tool: calculate}");
        assert!(matches!(parsed, Parsed::Invalid { .. }));
    }

    #[test]
    fn unstructured_policy() {
        let text = "The answer is probably 42.";
        assert!(matches!(strict().classify(text), Parsed::Invalid { .. }));
        assert_eq!(
            ResponseParser::new(UnstructuredPolicy::Permissive).classify(text),
            Parsed::FinalAnswer(text.into())
        );
    }

    #[test]
    fn classification_is_total_on_odd_input() {
        for text in ["{{{{", "Action: {'", "Final Answer:", "ÄÖÜ action: ü", "Action: {a: [}"] {
            let _ = strict().classify(text);
        }
        assert_eq!(strict().classify("Final Answer:"), Parsed::FinalAnswer(String::new()));
    }

    #[test]
    fn deeply_nested_arguments_are_invalid() {
        let nested = format!("{}{}", "[".repeat(10_000), "]".repeat(10_000));
        for text in [
            format!("Action: {{tool: calculate, args: {{a: {nested}}}}}"),
            format!("Action: calculate\nAction Input: {{a: {nested}}}"),
        ] {
            match strict().classify(&text) {
                Parsed::Invalid { reason } => {
                    assert!(reason.contains("nesting too deep"), "{reason}")
                }
                other => panic!("expected invalid, got {other:?}"),
            }
        }

        let shallow = format!(
            "Action: {{tool: calculate, args: {{a: {}{}}}}}",
            "[".repeat(8),
            "]".repeat(8)
        );
        assert_eq!(action_of(&shallow).tool, "calculate");
    }

    #[test]
    fn action_text_is_canonical_json() {
        let mut args = ToolArgs::new();
        args.insert("expression".into(), json!("1+1"));
        let text = ParsedAction::new("calculate", args).to_action_text();
        assert_eq!(text, r#"{"tool": "calculate", "args": {"expression":"1+1"}}"#);
    }
}
