//! File-backed shared-memory exchange point
//!
//! One file per address under `{base_dir}/{channel}/`. The whole file is one
//! serialized snapshot: no header, no framing, length equal to the payload.
//!
//! There is no cross-process lock. A publish stages the snapshot in a hidden
//! sibling file through a writable mapping and renames it over the address,
//! so a poller sees either the previous snapshot, the new one, or nothing.
//! A zero-length file reads as "not yet delivered" and the poller retries;
//! a successful decode is the only verification of a snapshot.

use memmap2::{Mmap, MmapMut};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::ChannelError;

const STAGING_SUFFIX: &str = ".staging";

/// Check that `name` is usable as a single path component
pub fn validate_name(kind: &'static str, name: &str) -> Result<(), ChannelError> {
    let reason = if name.is_empty() {
        Some("must not be empty")
    } else if name.contains(['/', '\\']) {
        Some("must not contain path separators")
    } else if name.starts_with('.') {
        Some("must not start with '.'")
    } else if name.contains('\0') {
        Some("must not contain NUL")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ChannelError::InvalidName {
            kind,
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// A named channel directory holding one snapshot per address
#[derive(Debug, Clone)]
pub struct Channel {
    name: String,
    directory: PathBuf,
}

impl Channel {
    /// Open the channel `name` under `base_dir`, creating its directory
    pub fn open(base_dir: impl AsRef<Path>, name: &str) -> Result<Self, ChannelError> {
        validate_name("channel", name)?;
        let directory = base_dir.as_ref().join(name);
        fs::create_dir_all(&directory).map_err(|e| ChannelError::io(&directory, e))?;
        debug!(?directory, "Opened channel");
        Ok(Self {
            name: name.to_string(),
            directory,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Backing file for `address`
    pub fn path_for(&self, address: &str) -> Result<PathBuf, ChannelError> {
        validate_name("address", address)?;
        Ok(self.directory.join(address))
    }

    /// Replace the snapshot at `address` with `bytes`
    pub fn publish(&self, address: &str, bytes: &[u8]) -> Result<(), ChannelError> {
        let path = self.path_for(address)?;
        let staging = self.directory.join(format!(".{address}{STAGING_SUFFIX}"));

        write_mapped(&staging, bytes).map_err(|e| ChannelError::io(&staging, e))?;
        if let Err(e) = fs::rename(&staging, &path) {
            let _ = fs::remove_file(&staging);
            return Err(ChannelError::io(&path, e));
        }

        debug!(channel = %self.name, address, len = bytes.len(), "Published snapshot");
        Ok(())
    }

    /// Copy of the current snapshot at `address`, empty when nothing is there
    pub fn poll(&self, address: &str) -> Result<Vec<u8>, ChannelError> {
        let path = self.path_for(address)?;

        let file = match OpenOptions::new().read(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ChannelError::io(&path, e)),
        };

        let len = file.metadata().map_err(|e| ChannelError::io(&path, e))?.len();
        if len == 0 {
            return Ok(Vec::new());
        }

        // SAFETY: publishers never write to a live address file; they rename a
        // fully written staging file over it, so this inode is not resized
        // while mapped. A foreign process truncating it is outside the protocol.
        let map = unsafe { Mmap::map(&file) }.map_err(|e| ChannelError::io(&path, e))?;
        Ok(map.to_vec())
    }

    pub fn is_published(&self, address: &str) -> Result<bool, ChannelError> {
        Ok(self.path_for(address)?.is_file())
    }

    /// Addresses with a published snapshot, sorted
    pub fn addresses(&self) -> Result<Vec<String>, ChannelError> {
        let entries = fs::read_dir(&self.directory).map_err(|e| ChannelError::io(&self.directory, e))?;

        let mut addresses = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ChannelError::io(&self.directory, e))?;
            if !entry.path().is_file() {
                continue;
            }
            match entry.file_name().to_str() {
                Some(name) if !name.starts_with('.') => addresses.push(name.to_string()),
                Some(_) => {}
                None => warn!(path = ?entry.path(), "Skipping non UTF-8 address"),
            }
        }

        addresses.sort();
        Ok(addresses)
    }

    /// Remove the snapshot at `address`; false when there was none
    pub fn clear(&self, address: &str) -> Result<bool, ChannelError> {
        let path = self.path_for(address)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(channel = %self.name, address, "Cleared snapshot");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ChannelError::io(&path, e)),
        }
    }
}

fn write_mapped(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.set_len(bytes.len() as u64)?;

    if !bytes.is_empty() {
        // SAFETY: the staging file is private to this publisher until renamed,
        // and it was sized to `bytes.len()` above.
        let mut map = unsafe { MmapMut::map_mut(&file) }?;
        map.copy_from_slice(bytes);
        map.flush()?;
    }
    Ok(())
}
