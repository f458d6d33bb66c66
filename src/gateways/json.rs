//! Pulling JSON out of language model answers
//!
//! Models wrap JSON in code fences or surround it with prose despite being
//! told not to.

/// Strip a surrounding code fence, if any
fn strip_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(open) = text.find("```") else {
        return text;
    };

    // skip the fence line itself, e.g. ```json
    let after_open = &text[open + 3..];
    let body_start = after_open.find('\n').map_or(after_open.len(), |i| i + 1);
    let body = &after_open[body_start..];

    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

fn outermost_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Outermost `{...}` span of `text`
///
/// The fenced body is tried first; when it holds no object (e.g. a fence
/// opened and closed on one line) the whole answer is scanned instead.
pub fn extract_object(text: &str) -> Option<&str> {
    outermost_braces(strip_fences(text)).or_else(|| outermost_braces(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_object() {
        assert_eq!(extract_object(r#"{"a":1}"#), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_fenced_object() {
        let text = "```json\n{\"keywords\": \"phone\"}\n```";
        assert_eq!(extract_object(text), Some("{\"keywords\": \"phone\"}"));
    }

    #[test]
    fn test_single_line_fence() {
        let text = "```json {\"keywords\":\"phone\",\"max_sale_price\":100} ```";
        assert_eq!(
            extract_object(text),
            Some("{\"keywords\":\"phone\",\"max_sale_price\":100}")
        );
    }

    #[test]
    fn test_prose_before_fence() {
        let text = "Here you go:\n```json\n{\"a\": 1}\n```\nAnything else?";
        assert_eq!(extract_object(text), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_object_surrounded_by_prose() {
        let text = "Sure! Here is the JSON: {\"a\": {\"b\": 2}} Hope it helps.";
        assert_eq!(extract_object(text), Some("{\"a\": {\"b\": 2}}"));
    }

    #[test]
    fn test_no_object() {
        assert_eq!(extract_object("no json here"), None);
        assert_eq!(extract_object("} backwards {"), None);
    }
}
