//! Load-once access to the user's stored keys.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::warn;

use crate::ports::credentials::{CredentialStore, Credentials};

/// Holds the user's credentials in memory.
///
/// The backing store is read once at construction; afterwards the only way
/// to change what callers see is [`CredentialProvider::update`], which
/// persists before swapping the in-memory copy.
pub struct CredentialProvider {
    store: Arc<dyn CredentialStore>,
    current: RwLock<Credentials>,
}

impl CredentialProvider {
    /// Reads `store` once. An unreadable store starts out empty.
    #[must_use]
    pub fn load(store: Arc<dyn CredentialStore>) -> Self {
        let current = store.load().unwrap_or_else(|err| {
            warn!(error = %err, "could not read stored credentials");
            Credentials::default()
        });
        Self { store, current: RwLock::new(current) }
    }

    /// A copy of the current credentials.
    #[must_use]
    pub fn current(&self) -> Credentials {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Applies `change` and persists the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write; the in-memory copy
    /// is left unchanged in that case.
    pub fn update<F>(&self, change: F) -> Result<Credentials, String>
    where
        F: FnOnce(&mut Credentials),
    {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.clone();
        change(&mut next);
        self.store.save(&next).map_err(|e| format!("Failed to save credentials: {e}"))?;
        *guard = next.clone();
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct MemStore {
        saved: Mutex<Option<Credentials>>,
        reads: Mutex<usize>,
        fail_writes: bool,
    }

    impl CredentialStore for MemStore {
        fn load(&self) -> Result<Credentials, Box<dyn std::error::Error + Send + Sync>> {
            *self.reads.lock().unwrap() += 1;
            Ok(self.saved.lock().unwrap().clone().unwrap_or_default())
        }

        fn save(
            &self,
            credentials: &Credentials,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            if self.fail_writes {
                return Err("read-only".into());
            }
            *self.saved.lock().unwrap() = Some(credentials.clone());
            Ok(())
        }
    }

    #[test]
    fn reads_store_once_and_persists_updates() {
        let store = Arc::new(MemStore::default());
        let provider = CredentialProvider::load(store.clone());

        provider.update(|c| c.api_key = Some("sk-or-1".into())).unwrap();
        assert_eq!(provider.current().api_key.as_deref(), Some("sk-or-1"));
        assert_eq!(provider.current().api_key, store.saved.lock().unwrap().clone().unwrap().api_key);
        assert_eq!(*store.reads.lock().unwrap(), 1);
    }

    #[test]
    fn failed_write_keeps_previous_credentials() {
        let store = Arc::new(MemStore { fail_writes: true, ..MemStore::default() });
        let provider = CredentialProvider::load(store);

        let err = provider.update(|c| c.github_pat = Some("ghp_x".into())).unwrap_err();
        assert!(err.contains("read-only"));
        assert_eq!(provider.current(), Credentials::default());
    }
}
