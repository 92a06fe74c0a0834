//! Line tokens and value literals shared by the ASCL reader and writer

use crate::level::AttributeValue;
use serde_json::Value;

/// Directive keywords. Anything else in a layer section is a grid row.
pub(super) const KEYWORDS: [&str; 7] = ["name", "size", "palette", "property", "layer", "objects", "object"];

/// Split a line into whitespace-separated tokens.
///
/// Double-quoted strings (with JSON escapes) are kept intact, quotes
/// included, and may start mid-token as in `label="two words"`. A `#` outside
/// a string ends the line.
pub(super) fn tokenize(line: &str) -> Result<Vec<String>, &'static str> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '#' => break,
            '"' => {
                current.push('"');
                loop {
                    match chars.next() {
                        None => return Err("unterminated string"),
                        Some('"') => {
                            current.push('"');
                            break;
                        }
                        Some('\\') => {
                            current.push('\\');
                            if let Some(escaped) = chars.next() {
                                current.push(escaped);
                            }
                        }
                        Some(other) => current.push(other),
                    }
                }
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

/// JSON-quote a string.
pub(super) fn quote(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// Parse a JSON-quoted string token.
pub(super) fn unquote(token: &str) -> Option<String> {
    if !token.starts_with('"') {
        return None;
    }
    serde_json::from_str(token).ok()
}

/// Attribute keys must survive tokenizing unchanged.
pub(super) fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !key
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '=' | '"' | '#'))
}

/// Render a value literal.
///
/// Floats use `{:?}`, which always includes a decimal point or an exponent,
/// so they never read back as integers.
pub(super) fn format_value(value: &AttributeValue) -> String {
    match value {
        AttributeValue::Int(i) => i.to_string(),
        AttributeValue::Float(f) => format!("{f:?}"),
        AttributeValue::String(s) => quote(s),
        AttributeValue::Bool(b) => b.to_string(),
    }
}

/// Parse a value literal: bool, then quoted string, then integer, then float.
pub(super) fn parse_value(raw: &str) -> Option<AttributeValue> {
    match raw {
        "true" => return Some(AttributeValue::Bool(true)),
        "false" => return Some(AttributeValue::Bool(false)),
        _ => {}
    }
    if raw.starts_with('"') {
        return unquote(raw).map(AttributeValue::String);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Some(AttributeValue::Int(i));
    }
    raw.parse::<f64>().ok().map(AttributeValue::Float)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_keeps_quoted_strings() {
        let tokens = tokenize(r#"object "big enemy" 3.5 2 label="a \"b\" # c"  # trailing"#).unwrap();
        assert_eq!(
            tokens,
            vec![
                "object",
                "\"big enemy\"",
                "3.5",
                "2",
                r#"label="a \"b\" # c""#
            ]
        );
        assert_eq!(tokenize("   # only a comment").unwrap(), Vec::<String>::new());
        assert!(tokenize("name \"open").is_err());
    }

    #[test]
    fn test_value_literals() {
        assert_eq!(parse_value("true"), Some(AttributeValue::Bool(true)));
        assert_eq!(parse_value("-12"), Some(AttributeValue::Int(-12)));
        assert_eq!(parse_value("2.0"), Some(AttributeValue::Float(2.0)));
        assert_eq!(parse_value("1e300"), Some(AttributeValue::Float(1e300)));
        assert_eq!(parse_value("\"x y\""), Some(AttributeValue::from("x y")));
        assert_eq!(parse_value("bare"), None);
        assert_eq!(parse_value("\"open"), None);
    }

    #[test]
    fn test_floats_never_look_like_ints() {
        for f in [0.0, 1.0, -3.0, 1e16, 1e-7, 123_456.5] {
            let text = format_value(&AttributeValue::Float(f));
            assert_eq!(parse_value(&text), Some(AttributeValue::Float(f)), "{text}");
        }
        assert_eq!(format_value(&AttributeValue::Float(f64::INFINITY)), "inf");
    }

    #[test]
    fn test_key_rules() {
        assert!(is_valid_key("hp"));
        assert!(is_valid_key("spawn.x"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("two words"));
        assert!(!is_valid_key("a=b"));
        assert!(!is_valid_key("say\"hi"));
        assert!(!is_valid_key("#tag"));
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("a \"b\"\n"), r#""a \"b\"\n""#);
        assert_eq!(unquote(&quote("tab\there")).as_deref(), Some("tab\there"));
    }
}
