//! Test doubles shared by the unit tests in this crate.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use sg_domain::error::{Error, Result};

use crate::backend::SessionBackend;
use crate::context::{ContextData, SessionContext};
use crate::envelope::CookieAttributes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Get(String),
    SetEx(String, u64, String),
}

#[derive(Default)]
struct Script {
    values: HashMap<String, String>,
    fail_get: bool,
    fail_set: bool,
    calls: Vec<Call>,
}

/// Backend that serves canned values, records every call and can be told
/// to fail either command.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    script: Arc<Mutex<Script>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(self, key: &str, raw: &str) -> Self {
        self.script.lock().values.insert(key.into(), raw.into());
        self
    }

    pub fn failing_get(self) -> Self {
        self.script.lock().fail_get = true;
        self
    }

    pub fn failing_set(self) -> Self {
        self.script.lock().fail_set = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().calls.clone()
    }
}

#[async_trait]
impl SessionBackend for ScriptedBackend {
    fn kind(&self) -> &'static str {
        "scripted"
    }

    async fn get(&self, key: &str) -> Result<String> {
        let mut script = self.script.lock();
        script.calls.push(Call::Get(key.into()));
        if script.fail_get {
            return Err(Error::backend("scripted", "connection refused"));
        }
        Ok(script.values.get(key).cloned().unwrap_or_default())
    }

    async fn set_with_expiry(&self, key: &str, ttl_secs: u64, value: &str) -> Result<()> {
        let mut script = self.script.lock();
        script
            .calls
            .push(Call::SetEx(key.into(), ttl_secs, value.into()));
        if script.fail_set {
            return Err(Error::backend("scripted", "READONLY replica"));
        }
        script.values.insert(key.into(), value.into());
        Ok(())
    }
}

/// In-memory [`SessionContext`] with inspectable outputs.
pub struct FakeContext {
    pub path: String,
    pub cookies: HashMap<String, String>,
    pub backend: Option<Arc<dyn SessionBackend>>,
    pub data: ContextData,
    pub response_cookies: Vec<CookieAttributes>,
}

impl FakeContext {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.into(),
            cookies: HashMap::new(),
            backend: None,
            data: ContextData::new(),
            response_cookies: Vec::new(),
        }
    }

    pub fn with_backend<B: SessionBackend + 'static>(self, backend: B) -> Self {
        self.with_shared_backend(Arc::new(backend))
    }

    pub fn with_shared_backend<B: SessionBackend + 'static>(mut self, backend: Arc<B>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }
}

impl SessionContext for FakeContext {
    fn request_cookie(&self, name: &str) -> Option<String> {
        self.cookies.get(name).cloned()
    }

    fn request_path(&self) -> &str {
        &self.path
    }

    fn backend(&self) -> Option<Arc<dyn SessionBackend>> {
        self.backend.clone()
    }

    fn save_data(&mut self, key: &str, data: Value) {
        self.data.save(key, data);
    }

    fn load_data(&self, key: &str) -> Option<Value> {
        self.data.load(key)
    }

    fn set_response_cookie(&mut self, cookie: &CookieAttributes) {
        self.response_cookies.push(cookie.clone());
    }
}
