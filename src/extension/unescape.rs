//! Removal of backslash escaping applied by RPC transports.

use serde_json::Value;

/// Un-quote a backslash-escaped string.
///
/// A backslash escapes the character after it (`\\` becomes `\`, `\'`
/// becomes `'`), `\0` becomes NUL and a trailing lone backslash is dropped.
pub fn strip_slashes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('\0'),
            Some(next) => out.push(next),
            None => {}
        }
    }
    out
}

/// [`strip_slashes`] applied to every string inside `value`, including
/// array elements and object values. Object keys and non-string scalars are
/// left untouched.
pub fn strip_slashes_deep(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(strip_slashes(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_slashes_deep).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, strip_slashes_deep(v)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_escapes() {
        assert_eq!(strip_slashes(r"O\'Reilly"), "O'Reilly");
        assert_eq!(strip_slashes(r#"say \"hi\""#), r#"say "hi""#);
        assert_eq!(strip_slashes(r"C:\\temp"), r"C:\temp");
        assert_eq!(strip_slashes(r"nul\0byte"), "nul\0byte");
        assert_eq!(strip_slashes(r"trailing\"), "trailing");
        assert_eq!(strip_slashes("plain"), "plain");
    }

    #[test]
    fn deep_strip_recurses_into_containers() {
        let value = json!({
            "name": r"it\'s",
            "list": [r"a\\b", 3, null, {"inner": r#"\"q\""#}],
            "flag": true
        });
        assert_eq!(
            strip_slashes_deep(value),
            json!({
                "name": "it's",
                "list": [r"a\b", 3, null, {"inner": "\"q\""}],
                "flag": true
            })
        );
    }
}
