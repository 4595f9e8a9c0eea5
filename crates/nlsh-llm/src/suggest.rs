//! Prompt construction and response parsing for command suggestions.

use serde::Deserialize;

use crate::provider::Message;

const SYSTEM_PROMPT: &str = "\
You translate a user's task into exactly one POSIX shell command.\n\
Respond with a JSON object and nothing else:\n\
{\"command\": \"<the command>\", \"explanation\": \"<one sentence on what it does>\"}\n\
Prefer simple, widely available tools. Never invent flags. If the task is\n\
not something a shell command can do, use an empty string for \"command\"\n\
and explain why in \"explanation\".";

/// A parsed model suggestion. `command` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub command: String,
    pub explanation: String,
}

#[derive(Deserialize)]
struct SuggestionJson {
    command: String,
    #[serde(default)]
    explanation: String,
}

/// Build the chat messages for one task.
#[must_use]
pub fn build_messages(task: &str) -> Vec<Message> {
    vec![Message::system(SYSTEM_PROMPT), Message::user(task)]
}

/// Extract a suggestion from a model response.
///
/// Models do not always follow the JSON instruction, so three shapes are
/// accepted, in order: a bare JSON object (possibly wrapped in a fenced
/// block), a fenced code block holding the raw command with surrounding
/// prose as explanation, or a single back-ticked command. Returns `None`
/// when no non-empty command can be found.
#[must_use]
pub fn parse_suggestion(response: &str) -> Option<Suggestion> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(s) = parse_json(trimmed) {
        return finish(s.command, s.explanation);
    }

    if let Some((body, rest)) = extract_fenced_block(trimmed) {
        if let Some(s) = parse_json(&body) {
            return finish(s.command, s.explanation);
        }
        // first line only: multi-line blocks tend to be scripts, which the
        // single-command contract does not cover
        let command = body.lines().next().unwrap_or_default().trim().to_owned();
        return finish(command, rest);
    }

    if let Some(command) = extract_inline_backticks(trimmed) {
        let explanation = trimmed.replace(&format!("`{command}`"), "");
        return finish(command, explanation.trim().to_owned());
    }

    None
}

fn parse_json(text: &str) -> Option<SuggestionJson> {
    serde_json::from_str(text).ok()
}

fn finish(command: String, explanation: String) -> Option<Suggestion> {
    let command = command.trim().to_owned();
    if command.is_empty() {
        return None;
    }
    Some(Suggestion {
        command,
        explanation: explanation.trim().to_owned(),
    })
}

/// Split out the first fenced code block, returning (block body, prose
/// outside the block).
fn extract_fenced_block(text: &str) -> Option<(String, String)> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    let newline = after_fence.find('\n')?;
    let body_start = &after_fence[newline + 1..];
    let end = body_start.find("```")?;

    let body = body_start[..end].trim().to_owned();
    let mut prose = String::new();
    prose.push_str(text[..start].trim());
    let after = body_start[end + 3..].trim();
    if !after.is_empty() {
        if !prose.is_empty() {
            prose.push(' ');
        }
        prose.push_str(after);
    }
    Some((body, prose))
}

fn extract_inline_backticks(text: &str) -> Option<String> {
    let start = text.find('`')?;
    let rest = &text[start + 1..];
    let end = rest.find('`')?;
    let command = rest[..end].trim();
    if command.is_empty() {
        None
    } else {
        Some(command.to_owned())
    }
}
