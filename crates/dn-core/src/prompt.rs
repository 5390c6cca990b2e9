//! Prompt construction and provider output parsing

use crate::heuristic::truncate_chars;
use dn_artifact::MachineRepresentation;
use serde_json::Value;

/// Summary prompt: title, truncated core text and heading outline, asking
/// for `{summary, tags}` JSON
#[must_use]
pub fn summary(mr: &MachineRepresentation, snippet_chars: usize) -> String {
    let snippet = truncate_chars(&mr.core_content_text, snippet_chars);
    let headings: Vec<&str> = mr.headings().collect();
    let outline = if headings.is_empty() {
        String::new()
    } else {
        format!("\nHeadings:\n- {}", headings.join("\n- "))
    };
    format!(
        "Title: {title}\n\nContent (truncated):\n{snippet}{outline}\n\n\
         Task: Return compact JSON with keys: summary (<= 120 words), \
         tags (array up to 5 lowercase tags). Output only JSON.",
        title = mr.title,
    )
}

/// Title prompt over a truncated content snippet
#[must_use]
pub fn title(mr: &MachineRepresentation, snippet_chars: usize) -> String {
    let snippet = truncate_chars(mr.core_content_text.trim(), snippet_chars);
    format!(
        "Generate a short, catchy, human-friendly post title (<= 70 chars) for the following content.\n\
         Respond with plain text only (no quotes).\n\nContent:\n{snippet}"
    )
}

/// Parse `{summary, tags}` out of provider output
///
/// Returns `None` unless the output is a JSON object with a non-empty string
/// `summary`. Non-string tags are dropped.
#[must_use]
pub fn parse_summary(output: &str) -> Option<(String, Vec<String>)> {
    let parsed: Value = serde_json::from_str(crate::provider::strip_code_fence(output)).ok()?;
    let summary = parsed.get("summary")?.as_str()?.trim();
    if summary.is_empty() {
        return None;
    }
    let tags = parsed
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();
    Some((summary.to_string(), tags))
}

/// Characters trimmed from both ends of a generated title
const TITLE_TRIM: &[char] = &[
    '\n', '\r', '\t', ' ', '"', '\'', '«', '»', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}',
];

/// Strip quotes and whitespace from a generated title and cap its length
#[must_use]
pub fn clean_title(raw: &str, max_len: usize) -> String {
    truncate_chars(raw.trim_matches(TITLE_TRIM), max_len).to_string()
}
