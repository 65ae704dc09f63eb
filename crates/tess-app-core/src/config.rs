// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Config service and storage port for tessellation tools.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Where endpoint prefs and other tool settings live, one blob per key.
pub trait ConfigStore {
    /// Bytes stored under `key`, or [`ConfigError::NotFound`].
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Replace whatever is stored under `key`.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Failure reading or writing a setting.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Nothing stored under the key.
    #[error("setting not found")]
    NotFound,
    /// Backing storage failed.
    #[error("config storage: {0}")]
    Io(#[from] std::io::Error),
    /// Stored bytes are not the JSON the caller expects.
    #[error("config json: {0}")]
    Serde(#[from] serde_json::Error),
    /// Store-specific failure, e.g. no config directory on this platform.
    #[error("config: {0}")]
    Other(String),
}

/// Typed settings on top of a [`ConfigStore`]; values travel as pretty JSON.
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Wrap `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S> ConfigService<S>
where
    S: ConfigStore,
{
    /// Load and deserialize the value for `key`. `Ok(None)` if missing or empty.
    pub fn load<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: DeserializeOwned,
    {
        match self.store.load_raw(key) {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(ConfigError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Serialize and persist the value for `key`.
    pub fn save<T>(&self, key: &str, value: &T) -> Result<(), ConfigError>
    where
        T: Serialize,
    {
        let data = serde_json::to_vec_pretty(value)?;
        self.store.save_raw(key, &data)
    }

    /// Load `key`, or persist and return `T::default()` when it is absent.
    ///
    /// Unreadable values are reported, not overwritten.
    pub fn load_or_init<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Serialize + Default,
    {
        if let Some(value) = self.load(key)? {
            return Ok(value);
        }
        let value = T::default();
        self.save(key, &value)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::{EndpointPrefs, ENDPOINT_KEY};
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemStore {
        blobs: RefCell<HashMap<String, Vec<u8>>>,
    }

    impl ConfigStore for MemStore {
        fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
            self.blobs
                .borrow()
                .get(key)
                .cloned()
                .ok_or(ConfigError::NotFound)
        }

        fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
            self.blobs.borrow_mut().insert(key.into(), data.to_vec());
            Ok(())
        }
    }

    #[test]
    fn load_or_init_persists_defaults_once() {
        let svc = ConfigService::new(MemStore::default());
        let prefs: EndpointPrefs = svc.load_or_init(ENDPOINT_KEY).expect("init");
        assert_eq!(prefs, EndpointPrefs::default());

        let custom = EndpointPrefs {
            host: "10.0.0.2".into(),
            port: 7000,
        };
        svc.save(ENDPOINT_KEY, &custom).expect("save");
        let again: EndpointPrefs = svc.load_or_init(ENDPOINT_KEY).expect("load");
        assert_eq!(again, custom);
    }

    #[test]
    fn empty_blob_reads_as_missing() {
        let store = MemStore::default();
        store.save_raw("k", b"").expect("save");
        let svc = ConfigService::new(store);
        assert!(svc.load::<EndpointPrefs>("k").expect("load").is_none());
    }

    #[test]
    fn garbage_is_a_serde_error() {
        let store = MemStore::default();
        store.save_raw(ENDPOINT_KEY, b"not json").expect("save");
        let svc = ConfigService::new(store);
        let err = svc
            .load_or_init::<EndpointPrefs>(ENDPOINT_KEY)
            .expect_err("garbage");
        assert!(matches!(err, ConfigError::Serde(_)));
    }
}
