use serde_json::{Map, Value};

use crate::error::SchemaError;

/// One parsed entity: string keys to scalars, lists or nested mappings, in insertion order.
pub type Record = Map<String, Value>;

/// Insert `value` under `key` only when it is present. Missing optional data is an absent key,
/// never a null placeholder.
pub fn insert_opt<V: Into<Value>>(record: &mut Record, key: &str, value: Option<V>) {
    if let Some(value) = value {
        record.insert(key.to_string(), value.into());
    }
}

/// Split a multi-valued string on any of `delimiters`, trimming each piece and keeping only the
/// first occurrence of each value. "Pathogenic/Likely pathogenic, risk factor" with `['/', ',']`
/// gives `["Pathogenic", "Likely pathogenic", "risk factor"]`.
pub fn split_unique(value: &str, delimiters: &[char]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for piece in value.split(|c| delimiters.contains(&c)) {
        let piece = piece.trim();
        if piece.is_empty() || seen.iter().any(|s| s == piece) {
            continue;
        }
        seen.push(piece.to_string());
    }
    seen
}

/// Pull a flat record out of a nested one. Keys containing `sep` are followed into nested
/// mappings, so `"Article.Title"` reads `record["Article"]["Title"]` and is stored under the
/// compound key `"Article.Title"`.
///
/// With `ignore_missing`, absent keys come back as `null` instead of failing. A path that walks
/// into something that is not a mapping is always an error.
pub fn access_deep_keys(
    keys: &[&str],
    record: &Record,
    sep: char,
    ignore_missing: bool,
) -> Result<Record, SchemaError> {
    let mut flat = Record::new();
    for &queried in keys {
        let value = deep_get(queried, record, sep, ignore_missing)?;
        flat.insert(queried.to_string(), value);
    }
    Ok(flat)
}

fn deep_get(
    queried: &str,
    record: &Record,
    sep: char,
    ignore_missing: bool,
) -> Result<Value, SchemaError> {
    let Some((key, rest)) = queried.split_once(sep) else {
        return match record.get(queried) {
            Some(value) => Ok(value.clone()),
            None if ignore_missing => Ok(Value::Null),
            None => Err(SchemaError::missing(queried)),
        };
    };

    if rest.is_empty() {
        return Err(SchemaError::InvalidValue {
            field: queried.to_string(),
            value: format!("no key left after splitting on {sep:?}"),
        });
    }

    match record.get(key) {
        Some(Value::Object(inner)) => deep_get(rest, inner, sep, ignore_missing),
        Some(other) => Err(SchemaError::InvalidValue {
            field: key.to_string(),
            value: format!("expected a mapping, got {other}"),
        }),
        None if ignore_missing => Ok(Value::Null),
        None => Err(SchemaError::missing(key)),
    }
}
