//! Session envelope codec.
//!
//! The envelope is the single document stored in the backend and attached
//! to the request context:
//!
//! ```json
//! {
//!     "cookie": { "name": "sid", "value": "sg:…", "domain": "", "path": "/",
//!                 "max_age": 1800, "http_only": true, "secure": false,
//!                 "same_site": "lax" },
//!     "data": { … application payload … }
//! }
//! ```
//!
//! Keeping the cookie attributes next to the payload means one backend read
//! is enough to rebuild the outgoing `Set-Cookie` header.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use sg_domain::config::{SameSitePolicy, SessionConfig};
use sg_domain::error::{Error, Result};

use crate::id::SessionId;

/// Top-level member holding the cookie attributes.
pub const COOKIE_FIELD: &str = "cookie";
/// Top-level member holding the application payload.
pub const DATA_FIELD: &str = "data";

/// Application-owned payload.  Never interpreted by the session layer.
pub type SessionPayload = Map<String, Value>;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Cookie attributes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The session cookie as persisted inside the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieAttributes {
    pub name: String,
    /// The session identifier.
    pub value: String,
    pub domain: String,
    pub path: String,
    /// Seconds.  Also the TTL of the backend record.
    pub max_age: u64,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSitePolicy,
}

impl CookieAttributes {
    /// Build fresh attributes for `id` from the configured options.
    pub fn from_config(options: &SessionConfig, id: &SessionId) -> Self {
        Self {
            name: options.name.clone(),
            value: id.as_str().to_owned(),
            domain: options.domain.clone(),
            path: options.path.clone(),
            max_age: options.max_age,
            http_only: options.http_only,
            secure: options.secure,
            same_site: options.same_site,
        }
    }

    /// The session identifier carried by this cookie.
    pub fn session_id(&self) -> &str {
        &self.value
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Envelope
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Cookie attributes glued to the payload they identify.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEnvelope {
    pub cookie: CookieAttributes,
    pub data: SessionPayload,
}

impl SessionEnvelope {
    /// A brand-new session: fresh identifier, attributes from config, empty
    /// payload.
    pub fn new_session(options: &SessionConfig) -> Self {
        let id = SessionId::generate(&options.prefix);
        Self {
            cookie: CookieAttributes::from_config(options, &id),
            data: SessionPayload::new(),
        }
    }

    pub fn encode(&self) -> Value {
        encode(&self.cookie, &self.data)
    }

    pub fn decode(doc: &Value) -> Option<Self> {
        decode(doc).map(|(cookie, data)| Self { cookie, data })
    }
}

/// Combine cookie attributes and payload into one document.
pub fn encode(cookie: &CookieAttributes, payload: &SessionPayload) -> Value {
    serde_json::json!({
        COOKIE_FIELD: cookie,
        DATA_FIELD: payload,
    })
}

/// Split a document back into cookie attributes and payload.
///
/// Returns `None` when the document is not an object, when either member
/// is missing, when the cookie member does not have the expected shape or
/// carries no identifier, or when the payload is neither an object nor
/// `null` (older records stored an absent payload as `null`).
pub fn decode(doc: &Value) -> Option<(CookieAttributes, SessionPayload)> {
    let obj = doc.as_object()?;

    let cookie: CookieAttributes = CookieAttributes::deserialize(obj.get(COOKIE_FIELD)?).ok()?;
    if cookie.value.is_empty() {
        return None;
    }

    let payload = match obj.get(DATA_FIELD)? {
        Value::Object(map) => map.clone(),
        Value::Null => SessionPayload::new(),
        _ => return None,
    };

    Some((cookie, payload))
}

/// `true` for `null`, `{}` and `[]`: documents that carry no session at all.
pub fn is_empty_document(doc: &Value) -> bool {
    match doc {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire form
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Serialize a document for storage (pretty-printed, four-space indent).
pub fn to_wire(doc: &Value) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    doc.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(|e| Error::Other(format!("envelope is not UTF-8: {e}")))
}

/// Parse a stored document.  Accepts compact and pretty-printed JSON.
pub fn from_wire(raw: &str) -> Result<Value> {
    Ok(serde_json::from_str(raw)?)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
