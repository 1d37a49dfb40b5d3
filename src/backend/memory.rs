//! In-process blob backend used by unit and property tests.
//!
//! Lets tests assert "no write was issued" (spec §8 property 7, read-only
//! rejection) and exercise the codec/layout/index logic without touching a
//! real filesystem.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{BlobBackend, Container};
use crate::error::{RepositoryError, Result};

#[derive(Default)]
struct Store {
    blobs: HashMap<String, Vec<u8>>,
}

/// A shared, in-memory blob store addressed by full slash-joined path.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    store: Arc<Mutex<Store>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently stored, for test assertions.
    pub fn blob_count(&self) -> usize {
        self.store.lock().unwrap().blobs.len()
    }

    /// True if any blob under `path` exists, for test assertions.
    pub fn contains_path(&self, path: &str) -> bool {
        self.store.lock().unwrap().blobs.contains_key(path)
    }
}

impl BlobBackend for MemoryBackend {
    fn container(&self, path: &str) -> Box<dyn Container> {
        Box::new(MemoryContainer {
            store: self.store.clone(),
            prefix: normalize(path),
        })
    }
}

struct MemoryContainer {
    store: Arc<Mutex<Store>>,
    prefix: String,
}

fn normalize(path: &str) -> String {
    path.trim_matches('/').to_string()
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

impl Container for MemoryContainer {
    fn exists(&self, name: &str) -> Result<bool> {
        let key = join(&self.prefix, name);
        Ok(self.store.lock().unwrap().blobs.contains_key(&key))
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        let key = join(&self.prefix, name);
        self.store
            .lock()
            .unwrap()
            .blobs
            .get(&key)
            .cloned()
            .ok_or_else(|| RepositoryError::Missing(key))
    }

    fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        let key = join(&self.prefix, name);
        self.store.lock().unwrap().blobs.insert(key, data.to_vec());
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<()> {
        let key = join(&self.prefix, name);
        self.store.lock().unwrap().blobs.remove(&key);
        Ok(())
    }

    fn list(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        let full_prefix = match prefix {
            Some(p) => join(&self.prefix, p),
            None => self.prefix.clone(),
        };
        let store = self.store.lock().unwrap();
        Ok(store
            .blobs
            .keys()
            .filter(|k| k.starts_with(&full_prefix))
            .map(|k| {
                k.strip_prefix(&self.prefix)
                    .unwrap_or(k)
                    .trim_start_matches('/')
                    .to_string()
            })
            .collect())
    }

    fn move_blob(&self, src: &str, dst: &str) -> Result<()> {
        let src_key = join(&self.prefix, src);
        let dst_key = join(&self.prefix, dst);
        let mut store = self.store.lock().unwrap();
        let data = store
            .blobs
            .remove(&src_key)
            .ok_or_else(|| RepositoryError::Missing(src_key.clone()))?;
        store.blobs.insert(dst_key, data);
        Ok(())
    }

    fn delete_container(&self) -> Result<()> {
        let mut store = self.store.lock().unwrap();
        let prefix = format!("{}/", self.prefix);
        store
            .blobs
            .retain(|k, _| !(k.starts_with(&prefix) || *k == self.prefix));
        Ok(())
    }

    fn sub_container(&self, relative_path: &str) -> Box<dyn Container> {
        Box::new(MemoryContainer {
            store: self.store.clone(),
            prefix: join(&self.prefix, &normalize(relative_path)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_delete() {
        let backend = MemoryBackend::new();
        let c = backend.container("root");
        c.write("index", b"abc").unwrap();
        assert_eq!(c.read("index").unwrap(), b"abc");
        c.delete("index").unwrap();
        assert!(!c.exists("index").unwrap());
    }

    #[test]
    fn sub_container_isolated_by_prefix() {
        let backend = MemoryBackend::new();
        let a = backend.container("indices/a");
        let b = backend.container("indices/b");
        a.write("meta-U1.dat", b"a-data").unwrap();
        assert!(!b.exists("meta-U1.dat").unwrap());
    }

    #[test]
    fn delete_container_removes_nested() {
        let backend = MemoryBackend::new();
        let c = backend.container("tests-seed1");
        c.write("master.dat", b"token").unwrap();
        c.delete_container().unwrap();
        assert!(!backend.contains_path("tests-seed1/master.dat"));
    }
}
