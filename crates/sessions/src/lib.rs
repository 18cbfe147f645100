//! Cookie-bound server-side sessions for SessionGate.
//!
//! A session is an opaque identifier carried in a cookie and a JSON
//! [`SessionEnvelope`] stored under that identifier in a key-value
//! [`SessionBackend`].  The [`SessionController`] runs twice per request:
//! on the way in it loads (or creates) the envelope and attaches it to the
//! request context, on the way out it sets the cookie and writes the
//! envelope back with a TTL equal to the cookie's max-age.
//!
//! The controller is transport-agnostic.  Hosts implement
//! [`SessionContext`] over their request/response types and drive it through
//! a [`Pipeline`].

pub mod backend;
pub mod context;
pub mod controller;
pub mod envelope;
pub mod id;
pub mod pipeline;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{create_backend, MemoryBackend, RedisBackend, SessionBackend};
pub use context::{ContextData, Flow, Phase, SessionContext, DATA_KEY};
pub use controller::{Gate, RequestOutcome, ResponseOutcome, SessionController, SkipReason};
pub use envelope::{CookieAttributes, SessionEnvelope, SessionPayload};
pub use id::SessionId;
pub use pipeline::{Interceptor, Pipeline};
pub use session::Session;
