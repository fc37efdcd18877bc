use std::sync::LazyLock;

use regex::Regex;

static JSON_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```json\s*(.*?)```").unwrap());
static ANY_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)```").unwrap());

/// Body of the first fenced code block, preferring a ```json block. Falls back
/// to the whole text when there is no complete fence.
pub fn strip_fence(text: &str) -> &str {
    let caps = JSON_FENCE_RE
        .captures(text)
        .or_else(|| ANY_FENCE_RE.captures(text));
    match caps.and_then(|c| c.get(1)) {
        Some(body) => body.as_str(),
        None => text,
    }
}

/// Slice from the first `open` to the last `close`, both inclusive.
fn span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Locate the JSON array in a model reply that may carry fences or prose.
pub fn json_array(text: &str) -> Option<&str> {
    span(strip_fence(text), '[', ']')
}

/// Locate the JSON object in a model reply that may carry fences or prose.
pub fn json_object(text: &str) -> Option<&str> {
    span(strip_fence(text), '{', '}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_array() {
        assert_eq!(json_array(r#"["milk", "bread"]"#), Some(r#"["milk", "bread"]"#));
    }

    #[test]
    fn json_fence() {
        let reply = "```json\n[\"milk\", \"bread\"]\n```";
        assert_eq!(json_array(reply), Some(r#"["milk", "bread"]"#));
    }

    #[test]
    fn plain_fence() {
        let reply = "Sure:\n```\n[\"eggs\"]\n```\nEnjoy!";
        assert_eq!(json_array(reply), Some(r#"["eggs"]"#));
    }

    #[test]
    fn prose_around_array() {
        let reply = "Here is your list: [\"apples\", \"2x milk\"] Let me know if you need more.";
        assert_eq!(json_array(reply), Some(r#"["apples", "2x milk"]"#));
    }

    #[test]
    fn unclosed_fence_uses_raw_text() {
        let reply = "```json\n[\"tea\"]";
        assert_eq!(strip_fence(reply), reply);
        assert_eq!(json_array(reply), Some(r#"["tea"]"#));
    }

    #[test]
    fn no_brackets() {
        assert_eq!(json_array("I could not find any items."), None);
        assert_eq!(json_array("] backwards ["), None);
    }

    #[test]
    fn object_in_fence() {
        let reply = "```json\n{\"itemsFound\": [], \"suggestions\": [\"milk\"]}\n```";
        assert_eq!(
            json_object(reply),
            Some(r#"{"itemsFound": [], "suggestions": ["milk"]}"#)
        );
    }
}
