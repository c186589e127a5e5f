//! Display cleanup for model-generated text.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static RE_ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("valid regex")
});
static RE_BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid regex"));
static RE_ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.*?)\*").expect("valid regex"));
static RE_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s+").expect("valid regex"));
static RE_BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*[-*+]\s+").expect("valid regex"));
static RE_NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\d+\.\s+").expect("valid regex"));
static RE_BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n").expect("valid regex"));

/// Make model output readable as plain text.
///
/// Decodes HTML entities, drops bold/italic markers and heading hashes,
/// rewrites list markers as `• `, and caps blank-line runs at one.
pub fn clean_response(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let cleaned = decode_entities(text);
    let cleaned = RE_BOLD.replace_all(&cleaned, "$1");
    // List markers first: a leading `* ` is a bullet, not an italic opener.
    let cleaned = RE_BULLET.replace_all(&cleaned, "• ");
    let cleaned = RE_NUMBERED.replace_all(&cleaned, "• ");
    let cleaned = RE_ITALIC.replace_all(&cleaned, "$1");
    let cleaned = RE_HEADING.replace_all(&cleaned, "");
    let cleaned = RE_BLANK_RUN.replace_all(&cleaned, "\n\n");
    cleaned.trim().to_string()
}

fn decode_entities(text: &str) -> String {
    RE_ENTITY
        .replace_all(text, |caps: &Captures| {
            let body = &caps[1];
            let decoded = match body {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ if body.starts_with("#x") || body.starts_with("#X") => {
                    u32::from_str_radix(&body[2..], 16).ok().and_then(char::from_u32)
                }
                _ if body.starts_with('#') => body[1..].parse().ok().and_then(char::from_u32),
                _ => None,
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert_eq!(clean_response(""), "");
        assert_eq!(clean_response("   \n "), "");
    }

    #[test]
    fn test_strips_markdown_and_lists() {
        let raw = "## Top priorities\n\n**Reply** to *Dana*\n- prepare slides\n2. book room";
        assert_eq!(
            clean_response(raw),
            "Top priorities\n\nReply to Dana\n• prepare slides\n• book room"
        );
    }

    #[test]
    fn test_star_bullet_with_italic_word() {
        assert_eq!(clean_response("* Review *draft* today"), "• Review draft today");
        assert_eq!(
            clean_response("Plan:\n* call *Sam*\n* file report"),
            "Plan:\n• call Sam\n• file report"
        );
    }

    #[test]
    fn test_decodes_entities() {
        assert_eq!(clean_response("Q&amp;A &lt;today&gt; &#39;ok&#x27;"), "Q&A <today> 'ok'");
        assert_eq!(clean_response("&bogus; stays"), "&bogus; stays");
    }

    #[test]
    fn test_collapses_blank_runs() {
        assert_eq!(clean_response("a\n\n\n\nb"), "a\n\nb");
        assert_eq!(clean_response("a\n \n\t\nb"), "a\n\nb");
    }
}
