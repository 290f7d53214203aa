//! Wire shapes of the `custom_fields` list exchanged with RPC callers.

use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;
use tracing::debug;

use super::metadata::CommentMeta;

/// One caller-supplied change to a comment's metadata.
///
/// The shape selects the action:
/// - `{key, value}` creates a new entry
/// - `{id, key, value}` updates entry `id` if its stored key equals `key`
/// - `{id}` deletes entry `id`
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CustomFieldDescriptor {
    #[serde(default, deserialize_with = "deserialize_loose_id")]
    pub id: Option<i64>,

    #[serde(default, deserialize_with = "deserialize_loose_key")]
    pub key: Option<String>,

    #[serde(default)]
    pub value: Option<Value>,
}

impl CustomFieldDescriptor {
    pub fn create(key: impl Into<String>, value: Value) -> Self {
        Self {
            id: None,
            key: Some(key.into()),
            value: Some(value),
        }
    }

    pub fn update(id: i64, key: impl Into<String>, value: Value) -> Self {
        Self {
            id: Some(id),
            key: Some(key.into()),
            value: Some(value),
        }
    }

    pub fn delete(id: i64) -> Self {
        Self {
            id: Some(id),
            key: None,
            value: None,
        }
    }
}

/// A metadata entry as attached to a prepared comment.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CustomField {
    pub meta_key: String,
    pub meta_value: Value,
    pub meta_id: i64,
    pub comment_id: i64,
}

impl From<CommentMeta> for CustomField {
    fn from(meta: CommentMeta) -> Self {
        Self {
            meta_key: meta.meta_key,
            meta_value: meta.meta_value,
            meta_id: meta.meta_id,
            comment_id: meta.comment_id,
        }
    }
}

/// `{id, key, value}` view returned by the standalone custom-field reader.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CustomFieldTriple {
    pub id: i64,
    pub key: String,
    pub value: Value,
}

impl From<CommentMeta> for CustomFieldTriple {
    fn from(meta: CommentMeta) -> Self {
        Self {
            id: meta.meta_id,
            key: meta.meta_key,
            value: meta.meta_value,
        }
    }
}

/// What happened to a single descriptor.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FieldOutcome {
    Created { meta_id: i64 },
    Updated { meta_id: i64 },
    Deleted { meta_id: i64 },
    Skipped { reason: SkipReason },
}

impl FieldOutcome {
    pub fn skipped(reason: SkipReason) -> Self {
        Self::Skipped { reason }
    }

    pub fn is_applied(&self) -> bool {
        !matches!(self, Self::Skipped { .. })
    }
}

/// Why a descriptor was left alone. None of these are reported to the
/// RPC caller.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The acting principal may not edit the target comment.
    Unauthorized,
    /// The supplied key differs from the stored key of entry `id`.
    KeyMismatch,
    /// No entry exists with the supplied id.
    NotFound,
    /// Entry `id` belongs to a different comment.
    ForeignRecord,
    /// A create request without a usable key.
    MissingKey,
}

/// Lenient reading of a `custom_fields` payload. A value that is not a list
/// carries no changes, and list elements that cannot be read as a descriptor
/// are dropped. Neither fails the surrounding request.
pub fn deserialize_loose_fields<'de, D>(
    deserializer: D,
) -> Result<Option<Vec<CustomFieldDescriptor>>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Null => return Ok(None),
        Value::Array(items) => items,
        other => {
            debug!("ignoring custom_fields that is not a list: {}", other);
            return Ok(None);
        }
    };

    let fields: Vec<CustomFieldDescriptor> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(field) => Some(field),
            Err(err) => {
                debug!("ignoring custom field #{}: {}", index, err);
                None
            }
        })
        .collect();
    Ok(Some(fields))
}

/// Accept ids as JSON integers, floats (truncated) or numeric strings.
fn deserialize_loose_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))),
        Value::String(s) => Ok(Some(parse_leading_int(&s))),
        other => Err(de::Error::custom(format!("unusable id {}", other))),
    }
}

/// Accept keys as strings, numbers or booleans, rendered as text.
fn deserialize_loose_key<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(if b { "1" } else { "" }.to_string())),
        other => Err(de::Error::custom(format!("unusable key {}", other))),
    }
}

/// Integer value of the leading `[+-]?[0-9]+` of `text`, or 0 when there is
/// none. Saturates instead of overflowing.
pub fn parse_leading_int(text: &str) -> i64 {
    let trimmed = text.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        let digit = i64::from(b - b'0');
        value = if negative {
            value.saturating_mul(10).saturating_sub(digit)
        } else {
            value.saturating_mul(10).saturating_add(digit)
        };
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn descriptor_shapes_deserialize() {
        let fields: Vec<CustomFieldDescriptor> = serde_json::from_value(json!([
            {"key": "k1", "value": "v1"},
            {"id": 5, "key": "mismatched"},
            {"id": 7}
        ]))
        .unwrap();

        assert_eq!(fields[0], CustomFieldDescriptor::create("k1", json!("v1")));
        assert_eq!(fields[1].id, Some(5));
        assert_eq!(fields[1].key.as_deref(), Some("mismatched"));
        assert_eq!(fields[1].value, None);
        assert_eq!(fields[2], CustomFieldDescriptor::delete(7));
    }

    #[test]
    fn ids_are_coerced_from_strings_and_floats() {
        let fields: Vec<CustomFieldDescriptor> = serde_json::from_value(json!([
            {"id": "42"},
            {"id": " 12abc"},
            {"id": "abc"},
            {"id": 9.8},
            {"id": null}
        ]))
        .unwrap();

        let ids: Vec<Option<i64>> = fields.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![Some(42), Some(12), Some(0), Some(9), None]);
    }

    #[test]
    fn scalar_keys_are_rendered_as_text() {
        let fields: Vec<CustomFieldDescriptor> = serde_json::from_value(json!([
            {"key": 5, "value": "v"},
            {"key": true},
            {"key": false},
            {"key": null}
        ]))
        .unwrap();

        let keys: Vec<Option<&str>> = fields.iter().map(|f| f.key.as_deref()).collect();
        assert_eq!(keys, vec![Some("5"), Some("1"), Some(""), None]);
    }

    #[derive(Deserialize)]
    struct Payload {
        #[serde(default, deserialize_with = "deserialize_loose_fields")]
        custom_fields: Option<Vec<CustomFieldDescriptor>>,
    }

    fn loose(payload: Value) -> Option<Vec<CustomFieldDescriptor>> {
        serde_json::from_value::<Payload>(payload).unwrap().custom_fields
    }

    #[test]
    fn unusable_payloads_carry_no_changes() {
        assert_eq!(loose(json!({})), None);
        assert_eq!(loose(json!({"custom_fields": null})), None);
        assert_eq!(loose(json!({"custom_fields": "k=v"})), None);
        assert_eq!(loose(json!({"custom_fields": {"key": "k"}})), None);

        let kept = loose(json!({"custom_fields": [
            {"id": true},
            "junk",
            {"key": ["nested"], "value": 1},
            {"key": 7, "value": "v"},
            {"id": "3"}
        ]}))
        .unwrap();
        assert_eq!(
            kept,
            vec![
                CustomFieldDescriptor::create("7", json!("v")),
                CustomFieldDescriptor::delete(3),
            ]
        );
    }

    #[test]
    fn leading_int_handles_signs_and_overflow() {
        assert_eq!(parse_leading_int("-17px"), -17);
        assert_eq!(parse_leading_int("+3"), 3);
        assert_eq!(parse_leading_int(""), 0);
        assert_eq!(parse_leading_int("99999999999999999999999"), i64::MAX);
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let skipped = FieldOutcome::skipped(SkipReason::KeyMismatch);
        assert_eq!(
            serde_json::to_value(skipped).unwrap(),
            json!({"outcome": "skipped", "reason": "key_mismatch"})
        );
        assert!(!skipped.is_applied());
        assert!(FieldOutcome::Deleted { meta_id: 7 }.is_applied());
    }
}
