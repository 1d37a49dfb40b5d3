//! Local filesystem blob backend.
//!
//! Grounded in `proxmox-backup`'s documented convention of atomic rename for
//! `.idx`/`.tmp` files (see the locking section of the teacher crate's
//! datastore module doc comment): every write goes through a sibling
//! `.tmp-<pid>-<counter>` file followed by `std::fs::rename`, which is
//! atomic on a single filesystem.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;

use super::{map_io_error, BlobBackend, Container};
use crate::error::{RepositoryError, Result};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Blob backend rooted at a directory on the local filesystem.
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

impl BlobBackend for FilesystemBackend {
    fn container(&self, path: &str) -> Box<dyn Container> {
        Box::new(FsContainer {
            path: join(&self.root, path),
        })
    }
}

struct FsContainer {
    path: PathBuf,
}

fn join(base: &Path, rel: &str) -> PathBuf {
    if rel.is_empty() {
        base.to_path_buf()
    } else {
        base.join(rel)
    }
}

fn tmp_name(name: &str) -> String {
    let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}.tmp-{}-{}", name, std::process::id(), n)
}

impl Container for FsContainer {
    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.path.join(name).exists())
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        let full = self.path.join(name);
        std::fs::read(&full).map_err(|e| map_io_error(e, &full.display().to_string()))
    }

    fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        std::fs::create_dir_all(&self.path)?;
        let tmp = self.path.join(tmp_name(name));
        std::fs::write(&tmp, data)?;
        let dst = self.path.join(name);
        std::fs::rename(&tmp, &dst)?;
        debug!("wrote blob {:?}", dst);
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<()> {
        let full = self.path.join(name);
        match std::fs::remove_file(&full) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RepositoryError::Io(e)),
        }
    }

    fn list(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        let mut out = Vec::new();
        let entries = match std::fs::read_dir(&self.path) {
            Ok(it) => it,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(RepositoryError::Io(e)),
        };
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            match prefix {
                Some(p) if !name.starts_with(p) => continue,
                _ => {}
            }
            out.push(name);
        }
        Ok(out)
    }

    fn move_blob(&self, src: &str, dst: &str) -> Result<()> {
        let src_path = self.path.join(src);
        let dst_path = self.path.join(dst);
        std::fs::create_dir_all(&self.path)?;
        std::fs::rename(&src_path, &dst_path).map_err(RepositoryError::Io)
    }

    fn delete_container(&self) -> Result<()> {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RepositoryError::Io(e)),
        }
    }

    fn sub_container(&self, relative_path: &str) -> Box<dyn Container> {
        Box::new(FsContainer {
            path: join(&self.path, relative_path),
        })
    }
}
