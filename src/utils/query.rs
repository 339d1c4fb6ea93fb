//! Query string helpers.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde_json::{Map as JsonMap, Value as JsonValue};

/// Options for [`obj_to_query`]
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    pub encode_key: bool,
    pub encode_value: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            encode_key: true,
            encode_value: true,
        }
    }
}

/// Options for [`query_to_obj`]
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    pub decode_key: bool,
    pub decode_value: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            decode_key: true,
            decode_value: true,
        }
    }
}

/// Builds a `?k=v&k2=v2` query string from the string and number entries of `obj`.
///
/// Other value types are skipped. Returns an empty string when nothing is left.
pub fn obj_to_query(obj: &JsonMap<String, JsonValue>, opt: QueryOptions) -> String {
    let args: Vec<String> = obj
        .iter()
        .filter_map(|(key, val)| {
            let val = match val {
                JsonValue::String(s) => Cow::Borrowed(s.as_str()),
                JsonValue::Number(n) => Cow::Owned(n.to_string()),
                _ => return None,
            };
            let key = if opt.encode_key {
                urlencoding::encode(key)
            } else {
                Cow::Borrowed(key.as_str())
            };
            let val = if opt.encode_value {
                Cow::Owned(urlencoding::encode(&val).into_owned())
            } else {
                val
            };
            Some(format!("{key}={val}"))
        })
        .collect();

    if args.is_empty() {
        String::new()
    } else {
        format!("?{}", args.join("&"))
    }
}

/// Parses a query string (leading `?` optional) into a key/value map.
///
/// Pairs without `=` and empty segments are ignored. Values that fail to
/// percent-decode are kept as written.
pub fn query_to_obj(query: &str, opt: DecodeOptions) -> BTreeMap<String, String> {
    let query = query.trim().trim_start_matches('?');

    query
        .split('&')
        .filter(|q| !q.is_empty())
        .filter_map(|q| q.split_once('='))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, val)| {
            let key = if opt.decode_key { decode(key) } else { key.to_string() };
            let val = if opt.decode_value { decode(val) } else { val.to_string() };
            (key, val)
        })
        .collect()
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw.to_string())
}

/// Flattens request params into `(key, value)` pairs for a URL query.
///
/// Scalars are rendered as text, nulls are dropped, arrays repeat the key as
/// `key[]` per element and nested objects are sent as JSON text.
pub fn to_query_pairs(params: &JsonMap<String, JsonValue>) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(params.len());
    for (key, val) in params {
        match val {
            JsonValue::Null => {}
            JsonValue::Array(items) => {
                let array_key = format!("{key}[]");
                pairs.extend(
                    items
                        .iter()
                        .filter_map(scalar_text)
                        .map(|text| (array_key.clone(), text)),
                );
            }
            JsonValue::Object(_) => pairs.push((key.clone(), val.to_string())),
            _ => {
                if let Some(text) = scalar_text(val) {
                    pairs.push((key.clone(), text));
                }
            }
        }
    }
    pairs
}

fn scalar_text(val: &JsonValue) -> Option<String> {
    match val {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
