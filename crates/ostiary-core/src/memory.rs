use crate::error::{CoreError, CoreResult};
use crate::traits::CredentialStore;
use crate::types::Credential;
use std::collections::HashMap;
use std::sync::Mutex;

type BoundaryKey = (String, String, Option<String>, Option<u16>);

/// In-memory credential store implementing CredentialStore.
///
/// Useful for testing and for sessions where credentials should not
/// outlive the process. Insertion order per boundary is preserved; storing
/// an existing username updates its password in place.
pub struct InMemoryCredentialStore {
    entries: Mutex<HashMap<BoundaryKey, Vec<Credential>>>,
}

fn lock_entries(
    mutex: &Mutex<HashMap<BoundaryKey, Vec<Credential>>>,
) -> CoreResult<std::sync::MutexGuard<'_, HashMap<BoundaryKey, Vec<Credential>>>> {
    mutex
        .lock()
        .map_err(|e| CoreError::Store(format!("lock poisoned: {}", e)))
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Number of stored credentials across all boundaries (for inspection).
    pub fn count(&self) -> usize {
        lock_entries(&self.entries)
            .map(|e| e.values().map(Vec::len).sum())
            .unwrap_or(0)
    }
}

impl Default for InMemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn lookup(
        &self,
        host: &str,
        protocol: &str,
        realm: Option<&str>,
        port: Option<u16>,
    ) -> CoreResult<Vec<Credential>> {
        let entries = lock_entries(&self.entries)?;
        let key = (
            host.to_string(),
            protocol.to_string(),
            realm.map(str::to_string),
            port,
        );
        Ok(entries.get(&key).cloned().unwrap_or_default())
    }

    fn store(
        &self,
        host: &str,
        protocol: &str,
        realm: Option<&str>,
        port: Option<u16>,
        username: &str,
        password: &str,
    ) -> CoreResult<()> {
        let mut entries = lock_entries(&self.entries)?;
        let key = (
            host.to_string(),
            protocol.to_string(),
            realm.map(str::to_string),
            port,
        );
        let slot = entries.entry(key).or_default();
        let stored = Credential::new(username, password).with_persistence(true);
        match slot.iter_mut().find(|c| c.username == username) {
            Some(existing) => *existing = stored,
            None => slot.push(stored),
        }
        Ok(())
    }
}
