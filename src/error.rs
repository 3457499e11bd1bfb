use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("io error during {op} ({path}): {source}")]
    IoPath {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("input is too large ({size_bytes} bytes; max {max_bytes} bytes)")]
    InputTooLarge { size_bytes: u64, max_bytes: u64 },

    #[error("invalid utf-8 in file: {0}")]
    InvalidUtf8(PathBuf),

    #[error("could not stat {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not set group on {path} to {group}: {source}")]
    GroupChange {
        path: PathBuf,
        group: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not set mode on {path} to {mode:#o}: {source}")]
    ModeChange {
        path: PathBuf,
        mode: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("could not repair permissions on {path}: {reason}")]
    PermissionRepair {
        path: PathBuf,
        reason: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot change permissions of {0}: not the owner, not group-writable, not world-writable")]
    PermissionDenied(PathBuf),

    #[error("required sandbox prefix must be configured before removing directory trees")]
    SandboxNotConfigured,

    #[error("refusing to remove {path}: outside required prefix {prefix}")]
    OutsideSandbox { prefix: PathBuf, path: PathBuf },

    #[error("could not create directory {path}: {source}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot delete {path}: permission denied ({source})")]
    DeletePermissionDenied {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("refusing to descend below {path}: depth limit {max_depth} reached")]
    DepthLimitExceeded { path: PathBuf, max_depth: usize },

    #[error("invalid mode for opening file: {0:?}")]
    InvalidOpenMode(String),

    #[error("cannot open {path}: {reason} ({source})")]
    OpenFile {
        path: PathBuf,
        reason: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io_path(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::IoPath {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn stat(path: &Path, source: std::io::Error) -> Self {
        Self::Stat {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Stable machine-readable identifier for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::IoPath { .. } => "io_path",
            Self::Json(_) => "json",
            Self::InvalidPolicy(_) => "invalid_policy",
            Self::InvalidPath(_) => "invalid_path",
            Self::InputTooLarge { .. } => "input_too_large",
            Self::InvalidUtf8(_) => "invalid_utf8",
            Self::Stat { .. } => "stat",
            Self::GroupChange { .. } => "group_change",
            Self::ModeChange { .. } => "mode_change",
            Self::PermissionRepair { .. } => "permission_repair",
            Self::PermissionDenied(_) => "permission_denied",
            Self::SandboxNotConfigured => "sandbox_not_configured",
            Self::OutsideSandbox { .. } => "outside_sandbox",
            Self::DirectoryCreate { .. } => "directory_create",
            Self::DeletePermissionDenied { .. } => "delete_permission_denied",
            Self::DepthLimitExceeded { .. } => "depth_limit_exceeded",
            Self::InvalidOpenMode(_) => "invalid_open_mode",
            Self::OpenFile { .. } => "open_file",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
