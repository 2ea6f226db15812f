//! Lenient JSON extraction from LLM output.
//!
//! Models in JSON mode still wrap objects in markdown fences or add a line of
//! prose around them. The classifier parses whatever this returns, so a reply
//! without any object comes back trimmed and fails there.

/// Borrow the JSON object out of a model reply.
///
/// A fenced block (` ```json ` or bare ` ``` `) is unwrapped first. The
/// result is then narrowed to the outermost `{ ... }` span, so prose before
/// or after the object is dropped.
pub fn extract_json_object(text: &str) -> &str {
    let body = fenced_body(text).unwrap_or(text).trim();
    match (body.find('{'), body.rfind('}')) {
        (Some(open), Some(close)) if close > open => &body[open..=close],
        _ => body,
    }
}

/// Contents of the first markdown code fence, without its language tag.
fn fenced_body(text: &str) -> Option<&str> {
    let (_, rest) = text.split_once("```")?;
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let (inner, _) = rest.split_once("```")?;
    Some(inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_object_is_returned_as_is() {
        let input = r#"{"intent": "feedback"}"#;
        assert_eq!(extract_json_object(input), input);
    }

    #[test]
    fn markdown_fence_is_stripped() {
        let input = "```json\n{\"intent\": \"close_chat\"}\n```";
        assert_eq!(extract_json_object(input), r#"{"intent": "close_chat"}"#);

        let bare = "Here you go:\n```\n{\"intent\": \"feedback\"}\n```\nanything else?";
        assert_eq!(extract_json_object(bare), r#"{"intent": "feedback"}"#);
    }

    #[test]
    fn object_embedded_in_prose_is_found() {
        let input = "Sure! {\"intent\": \"unclear\", \"confidence\": 0.2} hope that helps";
        assert_eq!(
            extract_json_object(input),
            r#"{"intent": "unclear", "confidence": 0.2}"#
        );
    }

    #[test]
    fn trailing_prose_after_an_object_is_dropped() {
        let input = "{\"intent\": \"close_chat\"}\n\nLet me know if you need more.";
        assert_eq!(extract_json_object(input), r#"{"intent": "close_chat"}"#);
    }

    #[test]
    fn reply_without_an_object_comes_back_trimmed() {
        assert_eq!(extract_json_object("  no idea  "), "no idea");
        assert_eq!(extract_json_object("} backwards {"), "} backwards {");
    }
}
