//! Pulling the useful part out of a model reply.
//!
//! Replies wrap their payload in Markdown fences more often than not. The
//! lookup order is a fence with the wanted label, then the first fence of
//! any kind, then the whole reply.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FencedBlock<'a> {
    /// Info string after the opening fence, empty when absent.
    pub label: &'a str,
    pub body: &'a str,
}

/// All fenced blocks in `text`, in order. An unclosed final fence runs to the
/// end of the text.
pub fn fenced_blocks(text: &str) -> Vec<FencedBlock<'_>> {
    const FENCE: &str = "```";

    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(FENCE) {
        let after = &rest[start + FENCE.len()..];

        let label_len = after
            .find(|c: char| c.is_whitespace())
            .unwrap_or(after.len());
        let candidate = &after[..label_len];
        let has_label = !candidate.is_empty()
            && candidate
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "+-_#.".contains(c))
            && after[label_len..]
                .trim_start_matches([' ', '\t'])
                .starts_with(['\n', '\r']);

        let (label, body_start) = if has_label {
            (candidate, label_len)
        } else {
            ("", 0)
        };

        let body_region = &after[body_start..];
        match body_region.find(FENCE) {
            Some(end) => {
                blocks.push(FencedBlock {
                    label,
                    body: body_region[..end].trim(),
                });
                rest = &body_region[end + FENCE.len()..];
            }
            None => {
                blocks.push(FencedBlock {
                    label,
                    body: body_region.trim(),
                });
                break;
            }
        }
    }

    blocks
}

/// The payload of `reply`, preferring a fence labelled `label`.
pub fn extract_payload<'a>(reply: &'a str, label: &str) -> &'a str {
    let blocks = fenced_blocks(reply);

    blocks
        .iter()
        .find(|block| block.label.eq_ignore_ascii_case(label))
        .or_else(|| blocks.first())
        .map(|block| block.body)
        .unwrap_or_else(|| reply.trim())
}

/// Parse the JSON payload of `reply`. When the payload has prose around it,
/// falls back to the outermost `{...}` or `[...]` span, whichever opens
/// first.
pub fn parse_json_payload(reply: &str) -> Option<Value> {
    let payload = extract_payload(reply, "json");
    if let Ok(value) = serde_json::from_str(payload) {
        return Some(value);
    }

    let object_first = match (payload.find('{'), payload.find('[')) {
        (Some(brace), Some(bracket)) => brace < bracket,
        (_, None) => true,
        (None, Some(_)) => false,
    };

    if object_first {
        outermost_span(payload, '{', '}').or_else(|| outermost_span(payload, '[', ']'))
    } else {
        outermost_span(payload, '[', ']').or_else(|| outermost_span(payload, '{', '}'))
    }
}

fn outermost_span(text: &str, open: char, close: char) -> Option<Value> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_labelled_fence_wins() {
        let reply = "Here:\n```text\nnot this\n```\n```python\nprint('hi')\n```\n";
        assert_eq!(extract_payload(reply, "python"), "print('hi')");
    }

    #[test]
    fn test_label_match_ignores_case() {
        let reply = "```JSON\n{\"a\": 1}\n```";
        assert_eq!(extract_payload(reply, "json"), "{\"a\": 1}");
    }

    #[test]
    fn test_unlabelled_fence_is_second_choice() {
        let reply = "Sure.\n```\nimport os\n```\nDone.";
        assert_eq!(extract_payload(reply, "python"), "import os");
    }

    #[test]
    fn test_first_fence_used_when_no_label_matches() {
        let reply = "```py\nfirst\n```\n```sh\nsecond\n```";
        assert_eq!(extract_payload(reply, "python"), "first");
    }

    #[test]
    fn test_raw_reply_when_no_fence() {
        assert_eq!(extract_payload("  plain text \n", "json"), "plain text");
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        let reply = "```python\nfrom selenium import webdriver\n";
        assert_eq!(
            extract_payload(reply, "python"),
            "from selenium import webdriver"
        );
    }

    #[test]
    fn test_inline_fence_has_no_label() {
        let blocks = fenced_blocks("```json {\"a\": 1}```");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].label, "");
    }

    #[test]
    fn test_json_payload_in_fence() {
        let reply = "Analysis:\n```json\n{\"auth_requirements\": {\"auth_required\": true}}\n```";
        assert_eq!(
            parse_json_payload(reply),
            Some(json!({"auth_requirements": {"auth_required": true}}))
        );
    }

    #[test]
    fn test_json_payload_surrounded_by_prose() {
        let reply = "The result is {\"key_actions\": [\"login\"]} as requested.";
        assert_eq!(
            parse_json_payload(reply),
            Some(json!({"key_actions": ["login"]}))
        );
    }

    #[test]
    fn test_json_array_payload() {
        let reply = "Cases: [{\"name\": \"a\"}]";
        assert_eq!(parse_json_payload(reply), Some(json!([{"name": "a"}])));
    }

    #[test]
    fn test_non_json_reply_is_none() {
        assert_eq!(parse_json_payload("I cannot help with that."), None);
        assert_eq!(parse_json_payload("{ broken"), None);
    }
}
