use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::Context;

/// Which entries a [`DirReader`] yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadFilter {
    #[default]
    All,
    Files,
    Dirs,
}

impl ReadFilter {
    fn admits(self, kind: EntryKind) -> bool {
        match self {
            Self::All => true,
            Self::Files => kind == EntryKind::File,
            Self::Dirs => kind == EntryKind::Dir,
        }
    }
}

/// Kind of an entry's target. Symlinks are followed; a dangling link is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Dir,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub path: PathBuf,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub is_symlink: bool,
}

/// Lazy, restartable iteration over one directory.
///
/// `.` and `..` are never yielded. Entry order is whatever the filesystem returns.
#[derive(Debug)]
pub struct DirReader {
    path: PathBuf,
    filter: ReadFilter,
    entries: fs::ReadDir,
}

fn open(path: &Path) -> Result<fs::ReadDir> {
    fs::read_dir(path).map_err(|err| Error::io_path("read_dir", path, err))
}

pub fn read_dir(path: &Path, filter: ReadFilter) -> Result<DirReader> {
    let meta = fs::metadata(path).map_err(|err| Error::io_path("read_dir", path, err))?;
    if !meta.is_dir() {
        return Err(Error::InvalidPath(format!(
            "path {} is not a directory",
            path.display()
        )));
    }
    Ok(DirReader {
        path: path.to_path_buf(),
        filter,
        entries: open(path)?,
    })
}

impl DirReader {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn filter(&self) -> ReadFilter {
        self.filter
    }

    /// Start over from the first entry.
    pub fn rewind(&mut self) -> Result<()> {
        self.entries = open(&self.path)?;
        Ok(())
    }

    /// Apply the configured directory defaults to the directory being read.
    pub fn set_permissions(&self, ctx: &Context) -> Result<()> {
        ctx.set_permissions(&self.path, None)
    }

    fn describe(&self, entry: &fs::DirEntry) -> Result<DirEntry> {
        let path = entry.path();
        let is_symlink = entry
            .file_type()
            .map_err(|err| Error::io_path("file_type", &path, err))?
            .is_symlink();
        let kind = match fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => EntryKind::Dir,
            Ok(meta) if meta.is_file() => EntryKind::File,
            Ok(_) => EntryKind::Other,
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "entry does not resolve");
                EntryKind::Other
            }
        };
        Ok(DirEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            path,
            kind,
            is_symlink,
        })
    }
}

impl Iterator for DirReader {
    type Item = Result<DirEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(err) => return Some(Err(Error::io_path("read_dir", &self.path, err))),
            };
            match self.describe(&entry) {
                Ok(described) if self.filter.admits(described.kind) => return Some(Ok(described)),
                Ok(_) => {}
                Err(err) => return Some(Err(err)),
            }
        }
    }
}
