//! The uniform result of every request and the payload normalization that
//! produces it.
//!
//! Backends disagree on how they report success. The normalizer looks at
//! these top-level fields, first present (non-null) one wins:
//!
//! | meaning | fields             |
//! |---------|--------------------|
//! | success | `ok`, `result`     |
//! | message | `err`, `msg`, `message` (empty strings skipped) |
//! | data    | `data`, `res`, else the whole payload |
//!
//! `server_date` and `server_time` are lifted into [`EnvelopeMeta`]; any other
//! field is carried through in `extra`.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, ser::SerializeMap, Serialize, Serializer};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::utils::date;

const SUCCESS_FIELDS: [&str; 2] = ["ok", "result"];
const MESSAGE_FIELDS: [&str; 3] = ["err", "msg", "message"];
const DATA_FIELDS: [&str; 2] = ["data", "res"];
const SERVER_DATE: &str = "server_date";
const SERVER_TIME: &str = "server_time";

/// Fields that ride along with the payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvelopeMeta {
    pub server_date: Option<String>,
    pub server_time: Option<i64>,
    pub extra: JsonMap<String, JsonValue>,
}

impl EnvelopeMeta {
    /// Server clock of the response: `server_time` (epoch ms) if sent,
    /// otherwise a parsed `server_date`.
    pub fn server_datetime(&self) -> Option<DateTime<Utc>> {
        self.server_time
            .and_then(date::from_millis)
            .or_else(|| self.server_date.as_deref().and_then(date::parse_datetime))
    }
}

/// Normalized result of a request
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Ok { data: JsonValue, meta: EnvelopeMeta },
    Fail { err: String, meta: EnvelopeMeta },
}

impl Envelope {
    pub(crate) fn fail(err: impl Into<String>) -> Self {
        Envelope::Fail {
            err: err.into(),
            meta: EnvelopeMeta::default(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Envelope::Ok { .. })
    }

    pub fn data(&self) -> Option<&JsonValue> {
        match self {
            Envelope::Ok { data, .. } => Some(data),
            Envelope::Fail { .. } => None,
        }
    }

    pub fn err(&self) -> Option<&str> {
        match self {
            Envelope::Ok { .. } => None,
            Envelope::Fail { err, .. } => Some(err),
        }
    }

    pub fn meta(&self) -> &EnvelopeMeta {
        match self {
            Envelope::Ok { meta, .. } | Envelope::Fail { meta, .. } => meta,
        }
    }

    /// Deserializes the data of an `Ok` envelope; `None` on failure or type mismatch.
    pub fn data_as<T: DeserializeOwned>(&self) -> Option<T> {
        self.data()
            .and_then(|data| serde_json::from_value(data.clone()).ok())
    }

    pub fn into_result(self) -> Result<JsonValue, String> {
        match self {
            Envelope::Ok { data, .. } => Ok(data),
            Envelope::Fail { err, .. } => Err(err),
        }
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let meta = self.meta();
        let mut map = serializer.serialize_map(None)?;
        match self {
            Envelope::Ok { data, .. } => {
                map.serialize_entry("ok", &true)?;
                map.serialize_entry("data", data)?;
            }
            Envelope::Fail { err, .. } => {
                map.serialize_entry("ok", &false)?;
                map.serialize_entry("err", err)?;
            }
        }
        if let Some(server_date) = &meta.server_date {
            map.serialize_entry(SERVER_DATE, server_date)?;
        }
        if let Some(server_time) = &meta.server_time {
            map.serialize_entry(SERVER_TIME, server_time)?;
        }
        for (key, value) in &meta.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// A backend payload reduced to the fields the orchestrator cares about
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPayload {
    pub ok: bool,
    pub err: Option<String>,
    pub data: JsonValue,
    pub meta: EnvelopeMeta,
}

/// Reduces a raw backend payload following the field priority above.
///
/// Anything that is not a JSON object is treated as a failure without a
/// message, keeping the payload itself as data.
pub fn normalize_payload(payload: JsonValue) -> NormalizedPayload {
    let mut fields = match payload {
        JsonValue::Object(fields) => fields,
        other => {
            return NormalizedPayload {
                ok: false,
                err: None,
                data: other,
                meta: EnvelopeMeta::default(),
            }
        }
    };

    let ok = first_present(&fields, &SUCCESS_FIELDS).is_some_and(is_truthy);
    let err = MESSAGE_FIELDS
        .iter()
        .filter_map(|name| fields.get(*name))
        .find_map(message_text);
    let data = first_present(&fields, &DATA_FIELDS).cloned();

    let server_date = fields
        .get(SERVER_DATE)
        .and_then(JsonValue::as_str)
        .map(str::to_string);
    let server_time = fields.get(SERVER_TIME).and_then(|v| {
        v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
    });

    let data = match data {
        Some(data) => data,
        None => JsonValue::Object(fields.clone()),
    };

    for name in SUCCESS_FIELDS
        .iter()
        .chain(MESSAGE_FIELDS.iter())
        .chain(DATA_FIELDS.iter())
        .chain([SERVER_DATE, SERVER_TIME].iter())
    {
        fields.remove(*name);
    }

    NormalizedPayload {
        ok,
        err,
        data,
        meta: EnvelopeMeta {
            server_date,
            server_time,
            extra: fields,
        },
    }
}

fn first_present<'a>(fields: &'a JsonMap<String, JsonValue>, names: &[&str]) -> Option<&'a JsonValue> {
    names
        .iter()
        .filter_map(|name| fields.get(*name))
        .find(|value| !value.is_null())
}

fn message_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) if s.is_empty() => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// JavaScript truthiness, which is what backends mean by `ok: 1` or `result: "yes"`.
fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}
