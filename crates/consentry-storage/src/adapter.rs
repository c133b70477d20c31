//! The storage adapter.
//!
//! Serializes [`ConsentState`] records in and out of a backend under one
//! logical key, with optional obfuscation. All backend failures stop here:
//! `save`/`clear` degrade to a logged no-op and `load` to `None`, so the
//! manager above never sees a storage error.

use consentry_core::{ConsentState, ConsentStore, StoredConsent};
use tracing::{debug, warn};

use crate::backend::StorageBackend;
use crate::encoding;

/// Default logical key (cookie name / file stem) for the consent record.
pub const DEFAULT_STORAGE_KEY: &str = "consentry";

/// Persists consent records to a backend.
pub struct StorageAdapter {
    backend: Box<dyn StorageBackend>,
    alternate: Option<Box<dyn StorageBackend>>,
    key: String,
    encode: bool,
}

impl StorageAdapter {
    /// Creates an adapter over the given backend with the default key and
    /// no obfuscation.
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self {
            backend,
            alternate: None,
            key: DEFAULT_STORAGE_KEY.to_string(),
            encode: false,
        }
    }

    /// Sets the logical key records are stored under.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Enables or disables record obfuscation for writes. Reads accept
    /// plain and obfuscated records either way.
    pub fn with_encoding(mut self, encode: bool) -> Self {
        self.encode = encode;
        self
    }

    /// Attaches the alternate backend [`migrate_to_storage`] pulls from.
    ///
    /// [`migrate_to_storage`]: StorageAdapter::migrate_to_storage
    pub fn with_alternate(mut self, backend: Box<dyn StorageBackend>) -> Self {
        self.alternate = Some(backend);
        self
    }

    /// The configured storage key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Serializes and writes the record. Returns false (after logging) on
    /// any failure; never propagates.
    pub fn save(&self, state: &ConsentState) -> bool {
        let text = match serde_json::to_string(state) {
            Ok(text) => text,
            Err(err) => {
                warn!("failed to serialize consent record: {err}");
                return false;
            }
        };
        let payload = if self.encode {
            encoding::obfuscate(&text)
        } else {
            text
        };
        match self.backend.write(&self.key, &payload) {
            Ok(()) => true,
            Err(err) => {
                warn!("failed to persist consent record: {err}");
                false
            }
        }
    }

    /// Reads the stored record, `None` when absent or unreadable.
    ///
    /// A plain-text parse is attempted first so that un-obfuscated records
    /// are never routed through the decoder; only when that fails is a
    /// deobfuscate-then-parse attempted.
    pub fn load(&self) -> Option<StoredConsent> {
        let raw = match self.backend.read(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!("failed to read consent record: {err}");
                return None;
            }
        };
        let record = Self::parse(&raw);
        if record.is_none() {
            warn!("stored consent record is unreadable; treating as absent");
        }
        record
    }

    /// Removes the stored record. Idempotent; failures are logged and
    /// swallowed.
    pub fn clear(&self) {
        if let Err(err) = self.backend.remove(&self.key) {
            warn!("failed to clear consent record: {err}");
        }
    }

    /// One-time backend migration: when the configured backend holds no
    /// record but the alternate does, the record moves over. Returns
    /// whether a record was moved.
    pub fn migrate_to_storage(&self) -> bool {
        let Some(alternate) = &self.alternate else {
            return false;
        };
        if !matches!(self.backend.read(&self.key), Ok(None)) {
            return false;
        }
        let record = match alternate.read(&self.key) {
            Ok(Some(record)) => record,
            _ => return false,
        };
        match self.backend.write(&self.key, &record) {
            Ok(()) => {
                debug!("migrated consent record from alternate backend");
                if let Err(err) = alternate.remove(&self.key) {
                    warn!("failed to remove migrated record from alternate backend: {err}");
                }
                true
            }
            Err(err) => {
                warn!("failed to migrate consent record: {err}");
                false
            }
        }
    }

    fn parse(raw: &str) -> Option<StoredConsent> {
        if let Ok(record) = serde_json::from_str(raw) {
            return Some(record);
        }
        let decoded = encoding::deobfuscate(raw)?;
        serde_json::from_str(&decoded).ok()
    }
}

impl ConsentStore for StorageAdapter {
    fn save(&self, state: &ConsentState) -> bool {
        StorageAdapter::save(self, state)
    }

    fn load(&self) -> Option<StoredConsent> {
        StorageAdapter::load(self)
    }

    fn clear(&self) {
        StorageAdapter::clear(self)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use consentry_core::{
        Category, CategoryOverrides, ConsentCategories, ConsentManager, ConsentStatus,
    };

    use super::*;
    use crate::backend::MemoryBackend;
    use crate::cookie::{CookieBackend, MemoryCookieJar};
    use crate::encoding::obfuscate;

    fn state() -> ConsentState {
        ConsentState::new(
            ConsentCategories {
                functional: true,
                analytics: true,
                ..Default::default()
            },
            None,
        )
    }

    // ==================== Round-Trip Tests ====================

    #[test]
    fn plain_round_trip() {
        let adapter = StorageAdapter::new(Box::new(MemoryBackend::new()));
        let state = state();
        assert!(adapter.save(&state));
        assert_eq!(adapter.load().unwrap().normalize(), state);
    }

    #[test]
    fn encoded_round_trip() {
        let adapter = StorageAdapter::new(Box::new(MemoryBackend::new())).with_encoding(true);
        let state = state();
        assert!(adapter.save(&state));
        assert_eq!(adapter.load().unwrap().normalize(), state);
    }

    #[test]
    fn encoded_record_is_not_plain_json() {
        let backend = Arc::new(MemoryBackend::new());

        struct Shared(Arc<MemoryBackend>);
        impl StorageBackend for Shared {
            fn read(&self, key: &str) -> crate::error::Result<Option<String>> {
                self.0.read(key)
            }
            fn write(&self, key: &str, value: &str) -> crate::error::Result<()> {
                self.0.write(key, value)
            }
            fn remove(&self, key: &str) -> crate::error::Result<()> {
                self.0.remove(key)
            }
        }

        let adapter =
            StorageAdapter::new(Box::new(Shared(backend.clone()))).with_encoding(true);
        adapter.save(&state());
        let raw = backend.read(DEFAULT_STORAGE_KEY).unwrap().unwrap();
        assert!(!raw.starts_with('{'));
    }

    #[test]
    fn plain_record_readable_with_encoding_enabled() {
        // Legacy deployments wrote plain text; flipping the encode toggle
        // on must not orphan those records.
        let backend = Box::new(MemoryBackend::new());
        backend
            .write(DEFAULT_STORAGE_KEY, r#"{"version":"2.0","analytics":true}"#)
            .unwrap();
        let adapter = StorageAdapter::new(backend).with_encoding(true);
        assert!(adapter.load().unwrap().analytics.unwrap());
    }

    #[test]
    fn encoded_record_readable_with_encoding_disabled() {
        let backend = Box::new(MemoryBackend::new());
        backend
            .write(
                DEFAULT_STORAGE_KEY,
                &obfuscate(r#"{"version":"2.0","marketing":true}"#),
            )
            .unwrap();
        let adapter = StorageAdapter::new(backend);
        assert!(adapter.load().unwrap().marketing.unwrap());
    }

    #[test]
    fn garbage_record_loads_as_none() {
        let backend = Box::new(MemoryBackend::new());
        backend.write(DEFAULT_STORAGE_KEY, "not json at all").unwrap();
        let adapter = StorageAdapter::new(backend);
        assert!(adapter.load().is_none());
    }

    #[test]
    fn load_absent_is_none() {
        let adapter = StorageAdapter::new(Box::new(MemoryBackend::new()));
        assert!(adapter.load().is_none());
    }

    // ==================== Clear Tests ====================

    #[test]
    fn clear_is_idempotent() {
        let adapter = StorageAdapter::new(Box::new(MemoryBackend::new()));
        adapter.save(&state());
        adapter.clear();
        adapter.clear();
        assert!(adapter.load().is_none());
    }

    #[test]
    fn cookie_clear_does_not_poison_later_saves() {
        let jar = Arc::new(MemoryCookieJar::new());
        let adapter = StorageAdapter::new(Box::new(CookieBackend::new(jar)));
        let state = state();

        adapter.save(&state);
        adapter.clear();
        adapter.save(&state);
        assert_eq!(adapter.load().unwrap().normalize(), state);
    }

    // ==================== Migration Tests ====================

    #[test]
    fn migrate_moves_record_into_empty_primary() {
        let alternate = Box::new(MemoryBackend::new());
        alternate
            .write(DEFAULT_STORAGE_KEY, r#"{"version":"2.0","analytics":true}"#)
            .unwrap();
        let adapter =
            StorageAdapter::new(Box::new(MemoryBackend::new())).with_alternate(alternate);

        assert!(adapter.migrate_to_storage());
        assert!(adapter.load().unwrap().analytics.unwrap());
        // Second call finds the primary occupied and does nothing.
        assert!(!adapter.migrate_to_storage());
    }

    #[test]
    fn migrate_keeps_existing_primary_record() {
        let alternate = Box::new(MemoryBackend::new());
        alternate
            .write(DEFAULT_STORAGE_KEY, r#"{"version":"2.0","analytics":true}"#)
            .unwrap();
        let adapter = StorageAdapter::new(Box::new(MemoryBackend::new())).with_alternate(alternate);
        adapter.save(&state());

        assert!(!adapter.migrate_to_storage());
        // The primary record survived untouched.
        assert!(adapter.load().unwrap().functional.unwrap());
    }

    #[test]
    fn migrate_without_alternate_is_noop() {
        let adapter = StorageAdapter::new(Box::new(MemoryBackend::new()));
        assert!(!adapter.migrate_to_storage());
    }

    // ==================== End-to-End Tests ====================

    #[test]
    fn manager_over_adapter_full_scenario() {
        let jar = Arc::new(MemoryCookieJar::new());
        let adapter = StorageAdapter::new(Box::new(CookieBackend::new(jar.clone())));
        let manager = ConsentManager::new(Arc::new(adapter));

        assert!(!manager.is_allowed(Category::Marketing));
        tokio_test::block_on(
            manager.save_preferences(CategoryOverrides::new().with_analytics(true)),
        )
        .unwrap();
        assert!(manager.is_allowed(Category::Analytics));
        assert!(!manager.is_allowed(Category::Marketing));
        assert_eq!(manager.status(), ConsentStatus::Partial);

        // A second manager over the same jar sees the decision.
        let adapter = StorageAdapter::new(Box::new(CookieBackend::new(jar)));
        let reloaded = ConsentManager::new(Arc::new(adapter));
        let state = reloaded.load().unwrap();
        assert!(state.analytics);
        assert_eq!(reloaded.consent_id(), manager.consent_id());
        assert!(reloaded.consent_id().is_some());
    }

    #[test]
    fn manager_migrates_legacy_record_in_storage() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .write(
                DEFAULT_STORAGE_KEY,
                r#"{"necessary":true,"analytics":true,"marketing":false,"timestamp":"2023-04-01T10:00:00Z"}"#,
            )
            .unwrap();

        struct Shared(Arc<MemoryBackend>);
        impl StorageBackend for Shared {
            fn read(&self, key: &str) -> crate::error::Result<Option<String>> {
                self.0.read(key)
            }
            fn write(&self, key: &str, value: &str) -> crate::error::Result<()> {
                self.0.write(key, value)
            }
            fn remove(&self, key: &str) -> crate::error::Result<()> {
                self.0.remove(key)
            }
        }

        let adapter = StorageAdapter::new(Box::new(Shared(backend.clone())));
        let manager = ConsentManager::new(Arc::new(adapter));
        let state = manager.load().unwrap();
        assert_eq!(state.version, "2.0");
        assert_eq!(state.timestamp, "2023-04-01T10:00:00Z");

        // The migrated five-category record was written back immediately.
        let raw = backend.read(DEFAULT_STORAGE_KEY).unwrap().unwrap();
        assert!(raw.contains(r#""version":"2.0""#));
        assert!(raw.contains(r#""functional":false"#));
    }
}
