// tests/support/mod.rs
//
// In-memory document stores shared by the integration tests.
#![allow(dead_code)]

use anyhow::Result;

use risk_radar::store::DocumentStore;

/// In-memory store; records every saved body.
pub struct MemoryStore {
    key: String,
    pub body: std::sync::Mutex<Option<String>>,
    pub saves: std::sync::Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_body(None)
    }

    pub fn with_body(body: Option<String>) -> Self {
        Self {
            key: "data.json".to_string(),
            body: std::sync::Mutex::new(body),
            saves: std::sync::Mutex::new(vec![]),
        }
    }

    pub fn current(&self) -> Option<String> {
        self.body.lock().ok().and_then(|b| b.clone())
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn load(&self) -> Result<Option<String>> {
        let guard = self
            .body
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        Ok(guard.clone())
    }

    async fn save(&self, body: &str) -> Result<()> {
        let mut guard = self
            .body
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        *guard = Some(body.to_string());
        drop(guard);
        self.saves
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?
            .push(body.to_string());
        Ok(())
    }

    fn key(&self) -> &str {
        &self.key
    }
}

/// Store whose reads or writes always fail.
pub struct FailingStore {
    pub fail_load: bool,
    pub fail_save: bool,
}

#[async_trait::async_trait]
impl DocumentStore for FailingStore {
    async fn load(&self) -> Result<Option<String>> {
        if self.fail_load {
            anyhow::bail!("storage unavailable");
        }
        Ok(None)
    }

    async fn save(&self, _body: &str) -> Result<()> {
        if self.fail_save {
            anyhow::bail!("storage unavailable");
        }
        Ok(())
    }

    fn key(&self) -> &str {
        "data.json"
    }
}
