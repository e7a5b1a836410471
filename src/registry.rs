use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{Error, Result, StorageFailure};
use crate::mac::MacAddress;

/// On-disk layout of one namespace: host name to canonical MAC.
pub type Store = BTreeMap<String, MacAddress>;

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub data_dir: PathBuf,
    pub file_suffix: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            file_suffix: "-macs.json".into(),
        }
    }
}

/// Durable name -> MAC bindings, one JSON document per namespace.
///
/// Every operation reloads the document, so edits made by hand between
/// calls are picked up. Load-mutate-store cycles on the same namespace are
/// serialized within the process and the document is replaced atomically.
#[derive(Debug)]
pub struct Registry {
    cfg: RegistryConfig,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Registry {
    pub fn new(cfg: RegistryConfig) -> Self {
        Self {
            cfg,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store_path(&self, namespace: &str) -> Result<PathBuf> {
        let invalid = namespace.is_empty()
            || namespace.contains(['/', '\\', '\0'])
            || namespace == "."
            || namespace == "..";
        if invalid {
            return Err(Error::InvalidNamespace(namespace.to_owned()));
        }
        Ok(self.cfg.data_dir.join(format!("{}{}", namespace, self.cfg.file_suffix)))
    }

    /// Locks nobody holds any more are dropped here, so the map only keeps
    /// namespaces with an operation in flight plus the one being locked.
    fn namespace_lock(&self, namespace: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|ns, lock| ns == namespace || Arc::strong_count(lock) > 1);
        locks.entry(namespace.to_owned()).or_default().clone()
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Binds `name` to the parsed `mac_text`. Nothing is read or written
    /// when the address is malformed.
    pub async fn add(&self, namespace: &str, name: &str, mac_text: &str) -> Result<MacAddress> {
        let mac = MacAddress::parse(mac_text)?;
        if name.is_empty() {
            return Err(Error::InvalidName);
        }
        let path = self.store_path(namespace)?;

        let lock = self.namespace_lock(namespace);
        let _guard = lock.lock().await;

        let mut store = self.load(&path).await?;
        if let Some(prev) = store.insert(name.to_owned(), mac) {
            log::debug!("[registry] {}: replacing {} for '{}'", namespace, prev, name);
        }
        self.save(&path, &store).await?;

        log::info!("[registry] {}: '{}' -> {}", namespace, name, mac);
        Ok(mac)
    }

    /// Removes `name` if present. Returns whether a binding existed.
    pub async fn remove(&self, namespace: &str, name: &str) -> Result<bool> {
        let path = self.store_path(namespace)?;

        let lock = self.namespace_lock(namespace);
        let _guard = lock.lock().await;

        let mut store = self.load(&path).await?;
        let existed = store.remove(name).is_some();
        self.save(&path, &store).await?;

        if existed {
            log::info!("[registry] {}: removed '{}'", namespace, name);
        }
        Ok(existed)
    }

    pub async fn get(&self, namespace: &str, name: &str) -> Result<MacAddress> {
        let path = self.store_path(namespace)?;

        let lock = self.namespace_lock(namespace);
        let _guard = lock.lock().await;

        let store = self.load(&path).await?;
        store.get(name).copied().ok_or_else(|| Error::NotFound(name.to_owned()))
    }

    /// All bindings of `namespace`, ordered by name.
    pub async fn list(&self, namespace: &str) -> Result<Vec<(String, MacAddress)>> {
        let path = self.store_path(namespace)?;

        let lock = self.namespace_lock(namespace);
        let _guard = lock.lock().await;

        Ok(self.load(&path).await?.into_iter().collect())
    }

    async fn load(&self, path: &Path) -> Result<Store> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::trace!("[registry] {} does not exist yet", path.display());
                return Ok(Store::new());
            }
            Err(e) => return Err(Error::storage(path, StorageFailure::Io(e))),
        };

        let store: Store = serde_json::from_str(&text)
            .map_err(|e| Error::storage(path, StorageFailure::Corrupt(e)))?;
        log::debug!("[registry] loaded {} entries from {}", store.len(), path.display());
        Ok(store)
    }

    async fn save(&self, path: &Path, store: &Store) -> Result<()> {
        let data = serde_json::to_vec(store)
            .map_err(|e| Error::storage(path, StorageFailure::Encode(e)))?;
        let dir = self.cfg.data_dir.clone();
        let target = path.to_owned();

        tokio::task::spawn_blocking(move || write_replace(&dir, &target, &data))
            .await
            .map_err(|e| Error::storage(path, StorageFailure::Persist(io::Error::other(e))))??;

        log::debug!("[registry] wrote {} entries to {}", store.len(), path.display());
        Ok(())
    }
}

/*
 * The temp file lives next to the target so the final rename never crosses
 * a filesystem boundary. Readers see either the old or the new document.
 */
fn write_replace(dir: &Path, target: &Path, data: &[u8]) -> Result<()> {
    let io_err = |e| Error::storage(target, StorageFailure::Io(e));

    std::fs::create_dir_all(dir).map_err(io_err)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(data).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(target)
        .map_err(|e| Error::storage(target, StorageFailure::Persist(e.error)))?;
    Ok(())
}
