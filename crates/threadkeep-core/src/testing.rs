//! Fakes shared by the unit tests in this crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use threadkeep_types::error::StoreError;
use threadkeep_types::llm::{CompletionRequest, CompletionResponse, LlmError, Usage};

use crate::clock::SharedClock;
use crate::llm::provider::LlmProvider;
use crate::storage::transcript_backend::{PushOptions, TranscriptBackend};

#[derive(Default)]
struct Entry {
    values: Vec<String>,
    expires_at: Option<DateTime<Utc>>,
}

/// Mutex-guarded map backend with an "unreachable" switch.
pub(crate) struct FakeBackend {
    clock: SharedClock,
    entries: Mutex<HashMap<String, Entry>>,
    down: AtomicBool,
}

impl FakeBackend {
    pub(crate) fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
            down: AtomicBool::new(false),
        }
    }

    pub(crate) fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Write a raw value, bypassing encoding, to simulate corruption.
    pub(crate) fn inject_raw(&self, key: &str, raw: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.entry(key.to_string()).or_default().values.push(raw.to_string());
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("fake backend is down"));
        }
        Ok(())
    }

    fn live<'a>(&self, entries: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
        let now = self.clock.now();
        if entries
            .get(key)
            .and_then(|e| e.expires_at)
            .is_some_and(|deadline| deadline <= now)
        {
            entries.remove(key);
        }
        entries.get_mut(key)
    }
}

impl TranscriptBackend for FakeBackend {
    async fn push(&self, key: &str, values: &[String], options: PushOptions) -> Result<(), StoreError> {
        self.check()?;
        let mut entries = self.entries.lock().unwrap();
        self.live(&mut entries, key);
        let entry = entries.entry(key.to_string()).or_default();
        entry.values.extend(values.iter().cloned());
        if let Some(keep) = options.keep_last {
            let excess = entry.values.len().saturating_sub(keep);
            entry.values.drain(..excess);
        }
        if options.expires_at.is_some() {
            entry.expires_at = options.expires_at;
        }
        Ok(())
    }

    async fn range(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.check()?;
        let mut entries = self.entries.lock().unwrap();
        Ok(self.live(&mut entries, key).map(|e| e.values.clone()).unwrap_or_default())
    }

    async fn len(&self, key: &str) -> Result<usize, StoreError> {
        self.check()?;
        let mut entries = self.entries.lock().unwrap();
        Ok(self.live(&mut entries, key).map_or(0, |e| e.values.len()))
    }

    async fn remove(&self, key: &str) -> Result<bool, StoreError> {
        self.check()?;
        let mut entries = self.entries.lock().unwrap();
        let existed = self.live(&mut entries, key).is_some();
        entries.remove(key);
        Ok(existed)
    }

    async fn expire(&self, key: &str, expires_at: DateTime<Utc>) -> Result<bool, StoreError> {
        self.check()?;
        let mut entries = self.entries.lock().unwrap();
        match self.live(&mut entries, key) {
            Some(entry) => {
                entry.expires_at = Some(expires_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        self.check()?;
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, e| e.expires_at.is_none_or(|d| d > now));
        Ok((before - entries.len()) as u64)
    }
}

/// Model fake that answers `"echo: {prompt}"` and records every request.
#[derive(Default)]
pub(crate) struct EchoProvider {
    pub(crate) requests: Mutex<Vec<CompletionRequest>>,
    fail: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl EchoProvider {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

impl LlmProvider for Arc<EchoProvider> {
    fn name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(LlmError::Provider {
                message: "upstream exploded".to_string(),
            });
        }

        let prompt = request.messages.last().map(|t| t.text.clone()).unwrap_or_default();
        Ok(CompletionResponse {
            content: format!("echo: {prompt}"),
            model: request.model.clone(),
            finish_reason: Some("STOP".to_string()),
            usage: Usage::default(),
        })
    }
}
