use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::platform::unix_ids;

use super::Context;

/// How [`FileInfo::open`] opens a file, parsed from an `fopen(3)` style string.
///
/// The first character is one of `r`, `w`, `a`, `x` or `c`. A `+` adds the missing direction.
/// `b`, `t` and `e` are accepted and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMode {
    pub read: bool,
    pub write: bool,
    pub append: bool,
    pub truncate: bool,
    pub create: bool,
    pub create_new: bool,
}

impl FromStr for OpenMode {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let invalid = || Error::InvalidOpenMode(raw.to_string());
        let mut chars = raw.chars();
        let mut mode = match chars.next().ok_or_else(invalid)? {
            'r' => Self::new(true, false),
            'w' => Self {
                truncate: true,
                create: true,
                ..Self::new(false, true)
            },
            'a' => Self {
                append: true,
                create: true,
                ..Self::new(false, true)
            },
            'x' => Self {
                create_new: true,
                ..Self::new(false, true)
            },
            'c' => Self {
                create: true,
                ..Self::new(false, true)
            },
            _ => return Err(invalid()),
        };
        let mut plus = false;
        for flag in chars {
            match flag {
                '+' if !plus => plus = true,
                'b' | 't' | 'e' => {}
                _ => return Err(invalid()),
            }
        }
        if plus {
            mode.read = true;
            mode.write = true;
        }
        Ok(mode)
    }
}

impl OpenMode {
    const fn new(read: bool, write: bool) -> Self {
        Self {
            read,
            write,
            append: false,
            truncate: false,
            create: false,
            create_new: false,
        }
    }

    fn options(self) -> fs::OpenOptions {
        let mut options = fs::OpenOptions::new();
        options
            .read(self.read)
            .write(self.write && !self.append)
            .append(self.append)
            .truncate(self.truncate)
            .create(self.create)
            .create_new(self.create_new);
        options
    }
}

/// A file path with name helpers and permission-aware open/touch.
///
/// Name helpers are lexical; only [`open`](Self::open), [`touch`](Self::touch) and
/// [`set_permissions`](Self::set_permissions) touch the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    path: PathBuf,
}

impl FileInfo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The extension, lowercased. `archive.TAR.GZ` gives `gz`.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
    }

    /// The file name without its extension.
    pub fn basename(&self) -> Option<&OsStr> {
        self.path.file_stem()
    }

    /// The containing directory, or `None` for a bare file name.
    pub fn dir(&self) -> Option<&Path> {
        self.path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
    }

    /// Same directory and basename with `ext` as the extension, e.g. `a/b.txt` to `a/b.md`.
    pub fn with_extension(&self, ext: &str) -> PathBuf {
        let mut name = self.basename().map(OsStr::to_os_string).unwrap_or_default();
        name.push(".");
        name.push(ext);
        self.sibling(name)
    }

    /// Insert `suffix` between basename and extension: `a/Photo.JPG` with `-small` gives
    /// `a/Photo-small.jpg`.
    pub fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut name = self.basename().map(OsStr::to_os_string).unwrap_or_default();
        name.push(suffix);
        if let Some(ext) = self.extension() {
            name.push(".");
            name.push(ext);
        }
        self.sibling(name)
    }

    fn sibling(&self, name: OsString) -> PathBuf {
        match self.dir() {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    pub fn touch(&self, ctx: &Context) -> Result<()> {
        ctx.touch(&self.path)
    }

    /// Apply the configured default group and mode.
    pub fn set_permissions(&self, ctx: &Context) -> Result<()> {
        ctx.set_permissions(&self.path, None)
    }

    /// Open with an `fopen(3)` style `mode`, explaining a failure in terms of the file's state.
    pub fn open(&self, mode: &str) -> Result<fs::File> {
        let mode: OpenMode = mode.parse()?;
        mode.options()
            .open(&self.path)
            .map_err(|source| self.open_error(mode, source))
    }

    fn open_error(&self, mode: OpenMode, source: std::io::Error) -> Error {
        let path = self.path.as_path();
        let exists = fs::symlink_metadata(path).is_ok();
        let reason = if mode.create_new && exists {
            "file already exists"
        } else if mode.write && !writable_target(path, exists) {
            "file is not writable"
        } else if mode.read && !unix_ids::is_readable(path) {
            "file is not readable"
        } else {
            "open failed"
        };
        tracing::debug!(path = %path.display(), reason, error = %source, "open failed");
        Error::OpenFile {
            path: path.to_path_buf(),
            reason,
            source,
        }
    }
}

/// A missing file is writable when its directory is.
fn writable_target(path: &Path, exists: bool) -> bool {
    if exists {
        return unix_ids::is_writable(path);
    }
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    unix_ids::is_writable(dir)
}
