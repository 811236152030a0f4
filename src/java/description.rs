//! Flattening of the chat component sent as a server's description.

use serde_json::Value;

/// Flatten a description into display text.
///
/// A plain string is returned as is. A component with a non-empty `text` uses
/// that text, otherwise the `text` of each `extra` component is joined with a
/// single space. Anything else becomes an empty string.
pub fn normalize_description(description: &Value) -> String {
    if let Value::String(text) = description {
        return text.clone();
    }

    match description.get("text") {
        Some(Value::String(text)) if !text.is_empty() => return text.clone(),
        _ => {}
    }

    let Some(Value::Array(extra)) = description.get("extra") else {
        return String::new();
    };

    extra
        .iter()
        .map(|component| component.get("text").and_then(Value::as_str).unwrap_or(""))
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::normalize_description;
    use serde_json::json;

    #[test]
    fn test_plain_string() {
        assert_eq!(normalize_description(&json!("Hello")), "Hello");
        assert_eq!(normalize_description(&json!("")), "");
    }

    #[test]
    fn test_text_component() {
        assert_eq!(normalize_description(&json!({ "text": "A" })), "A");
        assert_eq!(
            normalize_description(&json!({ "text": "A", "extra": [{ "text": "B" }] })),
            "A"
        );
    }

    #[test]
    fn test_extra_components() {
        assert_eq!(
            normalize_description(&json!({ "extra": [{ "text": "A" }, { "text": "B" }] })),
            "A B"
        );
        assert_eq!(normalize_description(&json!({ "extra": [] })), "");
        assert_eq!(
            normalize_description(&json!({ "text": "", "extra": [{ "text": "§aHi" }, { "color": "red" }] })),
            "§aHi"
        );
        assert_eq!(
            normalize_description(&json!({ "extra": [{ "text": 5 }, "loose", { "text": "C" }] })),
            "C"
        );
    }

    #[test]
    fn test_unrecognized_shapes() {
        assert_eq!(normalize_description(&json!(null)), "");
        assert_eq!(normalize_description(&json!(42)), "");
        assert_eq!(normalize_description(&json!({})), "");
        assert_eq!(normalize_description(&json!({ "extra": "nope" })), "");
        assert_eq!(normalize_description(&json!([{ "text": "A" }])), "");
    }
}
