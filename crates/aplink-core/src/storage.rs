//! Cached state reused across restarts: the versioned data package and the
//! locally generated client id.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::DataPackageData;

const DATA_PACKAGE_FILE: &str = "data_package.json";
const CLIENT_ID_FILE: &str = "client_id";

pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    /// Open the cache in the platform data directory.
    pub fn open_default() -> Result<Self> {
        let base = dirs::data_dir()
            .ok_or_else(|| Error::Config("no platform data directory".into()))?;
        Ok(Self::open(base.join("aplink")))
    }

    pub fn open<P: AsRef<Path>>(dir: P) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    /// The cached data package, if one has been stored.
    pub fn load_data_package(&self) -> Result<Option<DataPackageData>> {
        let path = self.dir.join(DATA_PACKAGE_FILE);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Persist a server-provided data package for future sessions.
    ///
    /// Version 0 marks a custom package: it is used for the session but
    /// never written to disk, so the next connection fetches fresh data.
    pub fn remember_data_package(&self, data: &DataPackageData) -> Result<()> {
        if data.version == 0 {
            debug!("Custom data package (version 0), not persisting");
            return Ok(());
        }
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(DATA_PACKAGE_FILE);
        fs::write(&path, serde_json::to_string(data)?)?;
        debug!("Cached data package version {}", data.version);
        Ok(())
    }

    /// Stable per-install identifier sent with the `Connect` handshake.
    /// Generated on first use.
    pub fn client_id(&self) -> Result<String> {
        let path = self.dir.join(CLIENT_ID_FILE);
        match fs::read_to_string(&path) {
            Ok(id) if !id.trim().is_empty() => Ok(id.trim().to_string()),
            Ok(_) | Err(_) => {
                let id = format!("{:016x}", rand::random::<u64>());
                fs::create_dir_all(&self.dir)?;
                fs::write(&path, &id)?;
                Ok(id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn package(version: i64) -> DataPackageData {
        DataPackageData {
            version,
            lookup_any_location_id_to_name: HashMap::from([(1i64, "Sanctuary".to_string())]),
            lookup_any_item_id_to_name: HashMap::from([(66i64, "Hookshot".to_string())]),
        }
    }

    #[test]
    fn test_data_package_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path());

        assert!(store.load_data_package().unwrap().is_none());

        store.remember_data_package(&package(5)).unwrap();
        let loaded = store.load_data_package().unwrap().unwrap();
        assert_eq!(loaded.version, 5);
        assert_eq!(
            loaded.lookup_any_location_id_to_name.get(&1).map(String::as_str),
            Some("Sanctuary")
        );
    }

    // Scenario D: a version 5 package replaces a cached version 4, but a
    // version 0 package never persists.
    #[test]
    fn test_version_zero_never_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path());

        store.remember_data_package(&package(4)).unwrap();
        store.remember_data_package(&package(5)).unwrap();
        assert_eq!(store.load_data_package().unwrap().unwrap().version, 5);

        store.remember_data_package(&package(0)).unwrap();
        assert_eq!(store.load_data_package().unwrap().unwrap().version, 5);
    }

    #[test]
    fn test_client_id_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path());

        let first = store.client_id().unwrap();
        let second = store.client_id().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 16);
    }
}
