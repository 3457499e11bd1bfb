//! Ownership and mode of a path, and the identity of the running process.
//!
//! A [`FileIdentity`] is a snapshot: it is never cached, and any chmod/chgrp performed after it
//! was taken is not reflected in it. Re-resolve after mutating.

use std::collections::BTreeSet;
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::mode::PermissionSet;
use crate::platform::unix_ids;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileIdentity {
    pub path: PathBuf,
    pub uid: u32,
    pub gid: u32,
    pub permissions: PermissionSet,
    pub is_dir: bool,
}

impl FileIdentity {
    /// Stat `path` (following symlinks).
    ///
    /// Fails with [`Error::Stat`] when the path cannot be stat-ed for any reason, including when
    /// it does not exist.
    pub fn resolve(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let meta = fs::metadata(path).map_err(|err| Error::stat(path, err))?;
        Ok(Self::from_metadata(path, &meta))
    }

    pub(crate) fn from_metadata(path: &Path, meta: &fs::Metadata) -> Self {
        Self {
            path: path.to_path_buf(),
            uid: meta.uid(),
            gid: meta.gid(),
            permissions: PermissionSet::from_mode(meta.mode()),
            is_dir: meta.is_dir(),
        }
    }

    /// Whether the real uid of the running process owns this path.
    pub fn is_owned_by_current_user(&self) -> bool {
        self.uid == current_uid()
    }
}

/// Real uid of the running process.
pub fn current_uid() -> u32 {
    unix_ids::real_uid()
}

/// Supplementary groups of the running process plus its real primary group.
pub fn current_user_groups() -> Result<BTreeSet<u32>> {
    let mut groups: BTreeSet<u32> = unix_ids::supplementary_groups()?.into_iter().collect();
    groups.insert(unix_ids::real_gid());
    Ok(groups)
}

/// Whether the running process may write to `path` right now.
pub fn is_writable(path: impl AsRef<Path>) -> bool {
    unix_ids::is_writable(path.as_ref())
}

/// Resolve a group name to its gid. A purely numeric name that matches no group is taken as a
/// literal gid.
pub fn resolve_group(name: &str) -> Result<u32> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidPolicy("file_group is empty".to_string()));
    }
    if let Some(gid) = unix_ids::group_id_by_name(trimmed)? {
        return Ok(gid);
    }
    trimmed
        .parse::<u32>()
        .map_err(|_| Error::InvalidPolicy(format!("unknown group: {trimmed:?}")))
}
