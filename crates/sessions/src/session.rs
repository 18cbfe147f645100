//! Application-facing handle to the attached session payload.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use sg_domain::error::{Error, Result};

use crate::context::{ContextData, DATA_KEY};
use crate::envelope::{SessionPayload, COOKIE_FIELD, DATA_FIELD};

/// Read/write access to the payload of the session attached to a request.
///
/// Handlers get this from the host (an axum request extension in the
/// gateway).  Writes land in the shared [`ContextData`], so the response
/// phase persists them without any extra call.
#[derive(Debug, Clone)]
pub struct Session {
    data: ContextData,
}

impl Session {
    /// The handle for `data`, if the request phase attached a session.
    pub fn attached(data: &ContextData) -> Option<Self> {
        data.contains(DATA_KEY).then(|| Self { data: data.clone() })
    }

    /// The session identifier (the cookie value).
    pub fn id(&self) -> Option<String> {
        self.data
            .with(DATA_KEY, |doc| {
                doc.get(COOKIE_FIELD)
                    .and_then(|c| c.get("value"))
                    .and_then(Value::as_str)
                    .map(str::to_owned)
            })
            .flatten()
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .with(DATA_KEY, |doc| {
                doc.get(DATA_FIELD)
                    .and_then(|d| d.get(key))
                    .cloned()
            })
            .flatten()
            .and_then(|v| serde_json::from_value(v).ok())
    }

    pub fn insert<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.with_payload(|payload| {
            payload.insert(key.to_owned(), value);
        })
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.with_payload(|payload| payload.remove(key)).ok().flatten()
    }

    /// Shallow-merge `entries` into the payload, replacing existing keys.
    pub fn merge(&self, entries: SessionPayload) -> Result<()> {
        self.with_payload(|payload| payload.extend(entries))
    }

    /// A copy of the whole payload.
    pub fn payload(&self) -> SessionPayload {
        self.data
            .with(DATA_KEY, |doc| match doc.get(DATA_FIELD) {
                Some(Value::Object(map)) => map.clone(),
                _ => SessionPayload::new(),
            })
            .unwrap_or_default()
    }

    fn with_payload<R>(&self, f: impl FnOnce(&mut SessionPayload) -> R) -> Result<R> {
        self.data
            .with_mut(DATA_KEY, |doc| {
                let obj = doc.as_object_mut()?;
                let slot = obj
                    .entry(DATA_FIELD)
                    .or_insert_with(|| Value::Object(SessionPayload::new()));
                // Older records stored an absent payload as null.
                if slot.is_null() {
                    *slot = Value::Object(SessionPayload::new());
                }
                slot.as_object_mut().map(f)
            })
            .flatten()
            .ok_or_else(|| Error::EnvelopeCorrupt("session payload is not an object".into()))
    }
}
