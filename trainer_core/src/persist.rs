//! JSON document persistence with file locking.
//!
//! Shared by the file gateway, the local identity provider and the
//! preference store:
//! - reads take a shared lock on the document
//! - writes go through a temp file, fsync and atomic rename
//! - read-modify-write cycles hold an exclusive lock on a sidecar `.lock`

use crate::{Error, Result};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Load a JSON document; a missing or empty file yields the default value
pub fn load_json<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        return Ok(T::default());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let mut contents = String::new();
    let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
    file.unlock()?;
    read?;

    if contents.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_json::from_str(&contents)?)
}

/// Atomically replace a JSON document
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    write_atomic(path, |writer| Ok(serde_json::to_writer(writer, value)?))
}

/// Atomically replace a file's contents
///
/// 1. Write to a temp file in the same directory
/// 2. Sync to disk
/// 3. Rename over the original
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let parent = parent_dir(path);
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        write(&mut writer)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;

    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    tracing::debug!("Saved {:?}", path);
    Ok(())
}

/// Load, modify and save a document while holding its writer lock
pub fn update_json<T, R, F>(path: &Path, f: F) -> Result<R>
where
    T: DeserializeOwned + Serialize + Default,
    F: FnOnce(&mut T) -> Result<R>,
{
    let lock = open_lock_file(path)?;
    lock.lock_exclusive()?;

    let result = load_json::<T>(path).and_then(|mut doc| {
        let out = f(&mut doc)?;
        save_json(path, &doc)?;
        Ok(out)
    });

    lock.unlock()?;
    result
}

/// Run blocking file or hashing work off the async executor
pub async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Other(format!("blocking task failed: {}", e)))?
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    std::fs::create_dir_all(parent_dir(path))?;
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path.with_extension("lock"))?;
    Ok(file)
}
