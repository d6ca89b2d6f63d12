//! File-backed persistence: one record file per persistent secret.
//!
//! Records live at `<root>/<persistence-id>.secret`.  Writes go to a temp
//! file in the same directory, are fsynced, then renamed over the target,
//! and finally the directory itself is fsynced so the rename is durable.
//! Readers never see a half-written record.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::errors::{Result, VaultError};
use crate::vault::secret::PersistenceId;

use super::format;
use super::{PersistenceBackend, SecretRecord};

/// File extension of record files.
const RECORD_EXTENSION: &str = "secret";

#[derive(Debug)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Open (creating if needed) the record directory at `root`.
    ///
    /// Fails with `InitError` if `root` is not a directory or cannot be
    /// created or read.
    pub fn open(root: &Path) -> Result<Self> {
        if root.as_os_str().is_empty() {
            return Err(VaultError::InitError("vault path is empty".into()));
        }
        if root.exists() && !root.is_dir() {
            return Err(VaultError::InitError(format!(
                "{} exists and is not a directory",
                root.display()
            )));
        }

        if !root.exists() {
            fs::create_dir_all(root).map_err(|e| {
                VaultError::InitError(format!("cannot create {}: {e}", root.display()))
            })?;

            // On Unix, restrict the directory to the owner.
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(root, fs::Permissions::from_mode(0o700)).map_err(|e| {
                    VaultError::InitError(format!(
                        "cannot set permissions on {}: {e}",
                        root.display()
                    ))
                })?;
            }
        }

        // Probe that the directory is readable now rather than on first use.
        fs::read_dir(root)
            .map_err(|e| VaultError::InitError(format!("cannot read {}: {e}", root.display())))?;

        tracing::debug!(root = %root.display(), "opened file backend");
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Directory holding the record files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the record file for `id`.
    pub fn record_path(&self, id: &PersistenceId) -> PathBuf {
        self.root.join(format!("{id}.{RECORD_EXTENSION}"))
    }

    fn sync_dir(&self) -> Result<()> {
        // Directories cannot be opened for syncing on Windows.
        #[cfg(unix)]
        File::open(&self.root)?.sync_all()?;
        Ok(())
    }
}

impl PersistenceBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    fn supports_persistence(&self) -> bool {
        true
    }

    fn put(&self, id: &PersistenceId, record: &SecretRecord) -> Result<()> {
        let bytes = format::encode(record)?;
        let path = self.record_path(id);
        let tmp_path = self.root.join(format!(".{id}.tmp"));

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let write = || -> Result<()> {
            let mut file = options.open(&tmp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
            fs::rename(&tmp_path, &path)?;
            self.sync_dir()
        };

        if let Err(e) = write() {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        tracing::debug!(%id, "stored persistent record");
        Ok(())
    }

    fn get(&self, id: &PersistenceId) -> Result<SecretRecord> {
        let path = self.record_path(id);
        let data = match fs::read(&path) {
            Ok(data) => zeroize::Zeroizing::new(data),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(VaultError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        format::decode(&data)
    }

    fn delete(&self, id: &PersistenceId) -> Result<()> {
        match fs::remove_file(self.record_path(id)) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(VaultError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        }
        self.sync_dir()?;
        tracing::debug!(%id, "deleted persistent record");
        Ok(())
    }

    fn list(&self) -> Result<Vec<PersistenceId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            // Foreign files with a .secret extension are skipped, not fatal.
            if let Ok(id) = PersistenceId::parse(stem) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}
