//! Depth-aware splitting and option value parsing.
//!
//! Descriptors nest freely: `Pipe(Center,Normalize):L2[algorithm=a+b(c,d)]`.
//! Every separator in this crate only counts at nesting depth zero, where
//! depth is tracked over `()`, `[]` and `{}`.

use serde_json::{Number, Value};

/// Splits `s` on `sep` wherever the separator is not nested inside
/// brackets. Pieces are trimmed. An empty input yields one empty piece,
/// matching [`str::split`].
pub fn split_top_level(s: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ if c == sep && depth == 0 => {
                parts.push(s[start..i].trim().to_string());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(s[start..].trim().to_string());
    parts
}

/// Returns the byte index of the `[` that opens a trailing option block,
/// i.e. a top-level bracket pair that closes on the last character.
pub(crate) fn options_start(s: &str) -> Option<usize> {
    if !s.ends_with(']') {
        return None;
    }

    let mut depth: i32 = 0;
    let mut candidate = None;
    for (i, c) in s.char_indices() {
        match c {
            '[' if depth == 0 => {
                candidate = Some(i);
                depth += 1;
            }
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth -= 1;
                if depth == 0 && c == ']' && i + 1 != s.len() {
                    candidate = None;
                }
            }
            _ => {}
        }
    }
    if depth == 0 { candidate } else { None }
}

/// Parses a raw option value. Bracketed lists become arrays, `true`/`false`
/// become booleans, numerals become numbers, everything else stays a string.
pub fn parse_value(raw: &str) -> Value {
    let raw = raw.trim();
    let bracketed = (raw.starts_with('[') && raw.ends_with(']'))
        || (raw.starts_with('(') && raw.ends_with(')'));
    if bracketed && raw.len() >= 2 {
        let inner = &raw[1..raw.len() - 1];
        if inner.trim().is_empty() {
            return Value::Array(Vec::new());
        }
        return Value::Array(
            split_top_level(inner, ',')
                .iter()
                .map(|v| parse_value(v))
                .collect(),
        );
    }

    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(raw.to_string())
}

/// Renders a value back into descriptor syntax.
pub fn format_value(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", inner.join(","))
        }
        Value::Object(_) => v.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_ignores_nested_separators() {
        let parts = split_top_level("Pipe(a:b):L2", ':');
        assert_eq!(parts, vec!["Pipe(a:b)", "L2"]);

        let parts = split_top_level("a, b[c,d] ,e(f,g)", ',');
        assert_eq!(parts, vec!["a", "b[c,d]", "e(f,g)"]);
    }

    #[test]
    fn split_empty_yields_one_piece() {
        assert_eq!(split_top_level("", ':'), vec![""]);
        assert_eq!(split_top_level("a::b", ':'), vec!["a", "", "b"]);
    }

    #[test]
    fn options_start_finds_trailing_block() {
        assert_eq!(options_start("a.gal[cache]"), Some(5));
        assert_eq!(options_start("Foo(x=[1,2])"), None);
        assert_eq!(options_start("Foo(x=[1,2])[k=v]"), Some(12));
        assert_eq!(options_start("[a]b[c]"), Some(4));
        assert_eq!(options_start("a[b"), None);
    }

    #[test]
    fn parse_value_types() {
        assert_eq!(parse_value("true"), Value::Bool(true));
        assert_eq!(parse_value("42"), Value::from(42));
        assert_eq!(parse_value("0.5"), Value::from(0.5));
        assert_eq!(parse_value("Center:L2"), Value::from("Center:L2"));
        assert_eq!(
            parse_value("[4, 6]"),
            Value::Array(vec![Value::from(4), Value::from(6)])
        );
        assert_eq!(parse_value("[]"), Value::Array(Vec::new()));
    }

    #[test]
    fn format_value_round_trips_lists() {
        let v = parse_value("[1,[2,3],x]");
        assert_eq!(format_value(&v), "[1,[2,3],x]");
    }
}
