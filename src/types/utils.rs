//! Shared text helpers used across the pipeline.
//!
//! ## JSON Extraction
//!
//! - `extract_json_object` - Pull the outermost `{...}` out of a model reply

// =============================================================================
// JSON Extraction
// =============================================================================

/// Slice from the first `{` to the last `}`, if both exist in that order.
///
/// Model replies often wrap JSON in prose or markdown fences.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

// =============================================================================
// String Utilities
// =============================================================================

/// Capitalize the first character of a string.
#[inline]
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

/// Collapse all runs of whitespace (including newlines) into single spaces.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Rough token estimate for providers that do not report usage.
///
/// ASCII at ~4 chars per token, everything else at ~1.5.
pub fn estimate_tokens(content: &str) -> u64 {
    if content.is_empty() {
        return 0;
    }
    let (ascii, other) = content
        .chars()
        .fold((0usize, 0usize), |(a, o), c| {
            if c.is_ascii() { (a + 1, o) } else { (a, o + 1) }
        });
    ((ascii as f32 / 4.0) + (other as f32 / 1.5)).ceil() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_object_fenced() {
        let reply = "Here you go:\n```json\n{\"liver\": \"NP\"}\n```";
        assert_eq!(extract_json_object(reply), Some("{\"liver\": \"NP\"}"));
    }

    #[test]
    fn test_extract_json_object_missing() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn test_capitalize_first() {
        assert_eq!(capitalize_first("adrenal"), "Adrenal");
        assert_eq!(capitalize_first("urinary bladder"), "Urinary bladder");
        assert_eq!(capitalize_first(""), "");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(
            collapse_whitespace("  Right kidney 11cm.\n\nLeft   kidney 12cm. "),
            "Right kidney 11cm. Left kidney 12cm."
        );
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        let n = estimate_tokens("The liver is normal.");
        assert!(n > 0 && n < 10);
    }
}
