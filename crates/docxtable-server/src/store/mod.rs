mod path;

pub use path::normalize_path;

use docxtable_core::{Document, TableError};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, info, warn};

use crate::codec::DocumentCodec;
use crate::config::Config;
use crate::error::ToolError;

/// A loaded document and its unsaved-changes flag
#[derive(Debug)]
pub struct DocumentHandle {
    path: PathBuf,
    document: Document,
    dirty: bool,
}

impl DocumentHandle {
    fn new(path: PathBuf, document: Document) -> Self {
        Self {
            path,
            document,
            dirty: false,
        }
    }

    /// Normalized path this handle is cached under
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Run a mutation; the handle becomes dirty only if it succeeds
    pub fn mutate<T>(
        &mut self,
        f: impl FnOnce(&mut Document) -> Result<T, TableError>,
    ) -> Result<T, TableError> {
        let value = f(&mut self.document)?;
        self.dirty = true;
        Ok(value)
    }
}

/// How a path was resolved to a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Already in the cache
    Cached,
    /// Read from storage
    Loaded,
    /// Did not exist; a new empty document was registered
    Created,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedDocument {
    pub path: PathBuf,
    pub dirty: bool,
}

/// One cache entry. `None` until the first successful load or create.
type Slot = Arc<Mutex<Option<DocumentHandle>>>;

fn lock(slot: &Slot) -> MutexGuard<'_, Option<DocumentHandle>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cache of open documents keyed by normalized path.
///
/// The map lock is only held to find or insert an entry; each entry has its own
/// mutex, so calls on the same path run one at a time while calls on different
/// paths proceed independently.
pub struct DocumentStore {
    codec: Box<dyn DocumentCodec>,
    max_file_size: u64,
    max_file_size_mb: u64,
    documents: RwLock<HashMap<PathBuf, Slot>>,
}

impl DocumentStore {
    pub fn new(codec: impl DocumentCodec + 'static, config: &Config) -> Self {
        Self {
            codec: Box::new(codec),
            max_file_size: config.max_file_size_bytes(),
            max_file_size_mb: config.max_file_size_mb,
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Get or create the cache entry for a normalized path
    fn slot(&self, key: &Path) -> Slot {
        // First try to get existing
        {
            let docs = self.documents.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = docs.get(key) {
                return Arc::clone(slot);
            }
        }

        let mut docs = self.documents.write().unwrap_or_else(PoisonError::into_inner);
        // Double-check after acquiring write lock
        if let Some(slot) = docs.get(key) {
            return Arc::clone(slot);
        }

        let slot: Slot = Arc::new(Mutex::new(None));
        docs.insert(key.to_path_buf(), Arc::clone(&slot));
        slot
    }

    /// Remove an entry whose load failed, unless another call has claimed it since
    fn evict_empty(&self, key: &Path, slot: &Slot) {
        let mut docs = self.documents.write().unwrap_or_else(PoisonError::into_inner);
        let unused = docs.get(key).map_or(false, |current| Arc::ptr_eq(current, slot))
            && slot.try_lock().map_or(false, |guard| guard.is_none());
        if unused {
            docs.remove(key);
        }
    }

    /// Load the document at `key`, or create an empty one if allowed
    fn open_handle(&self, key: &Path, create_if_missing: bool) -> Result<(DocumentHandle, Resolution), ToolError> {
        let metadata = match fs::metadata(key) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if !create_if_missing {
                    return Err(ToolError::DocumentNotFound(key.to_path_buf()));
                }
                info!("Created new document: {}", key.display());
                let handle = DocumentHandle::new(key.to_path_buf(), self.codec.create_empty());
                return Ok((handle, Resolution::Created));
            }
            Err(e) => return Err(e.into()),
        };

        if metadata.len() > self.max_file_size {
            return Err(ToolError::FileTooLarge {
                path: key.to_path_buf(),
                size_mb: metadata.len() as f64 / (1024.0 * 1024.0),
                limit_mb: self.max_file_size_mb,
            });
        }

        let document = self.codec.load(key).map_err(|e| {
            warn!("Failed to load {}: {}", key.display(), e);
            ToolError::from_codec(key, e)
        })?;
        info!(
            tables = document.table_count(),
            "Loaded document: {}",
            key.display()
        );
        Ok((DocumentHandle::new(key.to_path_buf(), document), Resolution::Loaded))
    }

    /// Resolve `path` and run `f` on its handle while holding the path's lock.
    /// `f` also learns how the handle was resolved.
    pub fn access<T>(
        &self,
        path: &Path,
        create_if_missing: bool,
        f: impl FnOnce(&mut DocumentHandle, Resolution) -> Result<T, ToolError>,
    ) -> Result<T, ToolError> {
        let key = normalize_path(path)?;
        let slot = self.slot(&key);
        let mut guard = lock(&slot);

        let resolution = if guard.is_some() {
            debug!("Cache hit: {}", key.display());
            Resolution::Cached
        } else {
            match self.open_handle(&key, create_if_missing) {
                Ok((handle, resolution)) => {
                    *guard = Some(handle);
                    resolution
                }
                Err(e) => {
                    drop(guard);
                    self.evict_empty(&key, &slot);
                    return Err(e);
                }
            }
        };

        match guard.as_mut() {
            Some(handle) => f(handle, resolution),
            None => Err(ToolError::DocumentNotFound(key)),
        }
    }

    /// Make sure `path` is loaded, creating it if missing and allowed
    pub fn resolve(&self, path: &Path, create_if_missing: bool) -> Result<Resolution, ToolError> {
        self.access(path, create_if_missing, |_, resolution| Ok(resolution))
    }

    /// Run `f` on the handle for `path`, auto-loading it on a cache miss
    pub fn with_document<T>(
        &self,
        path: &Path,
        create_if_missing: bool,
        f: impl FnOnce(&mut DocumentHandle) -> Result<T, ToolError>,
    ) -> Result<T, ToolError> {
        self.access(path, create_if_missing, |handle, _| f(handle))
    }

    /// Write the document for `path` to storage and return the path written.
    ///
    /// Saving in place clears the dirty flag. With `save_as` pointing elsewhere,
    /// the written copy is cached under the new path as an independent, clean
    /// handle and the original handle keeps its own state.
    pub fn save(&self, path: &Path, save_as: Option<&Path>) -> Result<PathBuf, ToolError> {
        let target = save_as.map(normalize_path).transpose()?;

        let copy = self.access(path, true, |handle, _| {
            let target = target.clone().unwrap_or_else(|| handle.path.clone());
            if let Err(e) = self.codec.save(&handle.document, &target) {
                warn!("Failed to save {}: {}", target.display(), e);
                return Err(ToolError::from_codec(&target, e));
            }
            info!("Saved document: {}", target.display());

            if target == handle.path {
                handle.dirty = false;
                Ok(None)
            } else {
                Ok(Some(DocumentHandle::new(target, handle.document.clone())))
            }
        })?;

        match copy {
            Some(copy) => {
                let written = copy.path.clone();
                *lock(&self.slot(&written)) = Some(copy);
                Ok(written)
            }
            None => normalize_path(path),
        }
    }

    /// Drop the cached handle for `path`. Returns false if it was not loaded.
    pub fn close(&self, path: &Path) -> Result<bool, ToolError> {
        let key = normalize_path(path)?;
        let removed = self
            .documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);

        let Some(slot) = removed else {
            return Ok(false);
        };
        // Wait for any in-flight call on this path
        let guard = lock(&slot);
        match guard.as_ref() {
            Some(handle) => {
                if handle.dirty {
                    warn!("Closing document with unsaved changes: {}", key.display());
                }
                info!("Closed document: {}", key.display());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Documents currently held in the cache, sorted by path
    pub fn list_loaded(&self) -> Vec<LoadedDocument> {
        let slots: Vec<Slot> = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        let mut loaded: Vec<LoadedDocument> = slots
            .iter()
            .filter_map(|slot| {
                lock(slot).as_ref().map(|handle| LoadedDocument {
                    path: handle.path.clone(),
                    dirty: handle.dirty,
                })
            })
            .collect();
        loaded.sort_by(|a, b| a.path.cmp(&b.path));
        loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use docxtable_core::TablePosition;
    use std::thread;

    fn store() -> DocumentStore {
        DocumentStore::new(JsonCodec::default(), &Config::default())
    }

    fn add_table(store: &DocumentStore, path: &Path) {
        store
            .with_document(path, true, |handle| {
                handle
                    .mutate(|doc| doc.create_table(1, 1, TablePosition::End, None))
                    .map_err(ToolError::from)
            })
            .unwrap();
    }

    fn table_count(store: &DocumentStore, path: &Path) -> usize {
        store
            .with_document(path, false, |handle| Ok(handle.document().table_count()))
            .unwrap()
    }

    #[test]
    fn test_resolve_creates_then_hits_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.docx");
        let store = store();

        assert_eq!(store.resolve(&path, true).unwrap(), Resolution::Created);
        assert_eq!(store.resolve(&path, true).unwrap(), Resolution::Cached);
        // Created documents are not written until saved
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_without_create() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        let err = store.resolve(&dir.path().join("absent.docx"), false).unwrap_err();
        assert!(matches!(err, ToolError::DocumentNotFound(_)));
        assert!(store.list_loaded().is_empty());
    }

    #[test]
    fn test_equivalent_paths_share_handle() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        let path = dir.path().join("doc.docx");
        add_table(&store, &path);

        let dotted = dir.path().join("sub").join("..").join(".").join("doc.docx");
        assert_eq!(table_count(&store, &dotted), 1);
        assert_eq!(store.list_loaded().len(), 1);
    }

    #[test]
    fn test_mutation_marks_dirty_and_save_clears() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.docx");
        let store = store();
        add_table(&store, &path);
        assert!(store.list_loaded()[0].dirty);

        let written = store.save(&path, None).unwrap();
        assert_eq!(written, normalize_path(&path).unwrap());
        assert!(path.exists());
        assert!(!store.list_loaded()[0].dirty);

        // A failed mutation leaves the flag alone
        let _ = store.with_document(&path, false, |handle| {
            handle
                .mutate(|doc| doc.delete_table(9))
                .map_err(ToolError::from)
        });
        assert!(!store.list_loaded()[0].dirty);
    }

    #[test]
    fn test_loads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.docx");
        {
            let store = store();
            add_table(&store, &path);
            store.save(&path, None).unwrap();
        }

        let store = store();
        assert_eq!(store.resolve(&path, false).unwrap(), Resolution::Loaded);
        assert_eq!(table_count(&store, &path), 1);
    }

    #[test]
    fn test_malformed_file_is_not_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.docx");
        fs::write(&path, "{ not json").unwrap();

        let err = store().resolve(&path, true).unwrap_err();
        assert_eq!(err.code(), "DATA_FORMAT_ERROR");
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_binary_file_is_data_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packaged.docx");
        fs::write(&path, b"PK\x03\x04\x14\x00\xC3\x28\xFF\xFE").unwrap();

        let store = store();
        let err = store.resolve(&path, true).unwrap_err();
        assert_eq!(err.code(), "DATA_FORMAT_ERROR");
        assert!(store.list_loaded().is_empty());
    }

    #[test]
    fn test_failed_save_keeps_handle_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.docx");
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "regular file").unwrap();

        let store = store();
        add_table(&store, &path);
        let err = store.save(&path, Some(blocker.join("copy.docx").as_path())).unwrap_err();
        assert_eq!(err.code(), "IO_ERROR");

        let loaded = store.list_loaded();
        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].dirty);

        store.save(&path, None).unwrap();
        assert!(!store.list_loaded()[0].dirty);
        assert!(path.exists());
    }

    #[test]
    fn test_access_reports_resolution_with_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.docx");
        let store = store();

        let (resolution, tables) = store
            .access(&path, true, |handle, resolution| {
                Ok((resolution, handle.document().table_count()))
            })
            .unwrap();
        assert_eq!((resolution, tables), (Resolution::Created, 0));
    }

    #[test]
    fn test_file_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.docx");
        fs::write(&path, vec![b' '; 2 * 1024 * 1024]).unwrap();

        let config = Config {
            max_file_size_mb: 1,
            ..Config::default()
        };
        let store = DocumentStore::new(JsonCodec::default(), &config);
        let err = store.resolve(&path, false).unwrap_err();
        assert!(matches!(err, ToolError::FileTooLarge { limit_mb: 1, .. }));
    }

    #[test]
    fn test_save_as_creates_independent_copy() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("a.docx");
        let copy = dir.path().join("out").join("b.docx");
        let store = store();
        add_table(&store, &original);

        store.save(&original, Some(copy.as_path())).unwrap();
        assert!(copy.exists());
        assert!(!original.exists());

        add_table(&store, &original);
        assert_eq!(table_count(&store, &original), 2);
        assert_eq!(table_count(&store, &copy), 1);

        let loaded = store.list_loaded();
        assert_eq!(loaded.len(), 2);
        let original_entry = loaded
            .iter()
            .find(|d| d.path == normalize_path(&original).unwrap())
            .unwrap();
        assert!(original_entry.dirty);
    }

    #[test]
    fn test_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.docx");
        let store = store();
        store.resolve(&path, true).unwrap();

        assert!(store.close(&path).unwrap());
        assert!(!store.close(&path).unwrap());
        assert!(store.list_loaded().is_empty());
    }

    #[test]
    fn test_concurrent_calls_on_one_path_serialize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.docx");
        let store = Arc::new(store());

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let path = path.clone();
                thread::spawn(move || {
                    for _ in 0..10 {
                        add_table(&store, &path);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(table_count(&store, &path), 80);
        assert_eq!(store.list_loaded().len(), 1);
    }
}
