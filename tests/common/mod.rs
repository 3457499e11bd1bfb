#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use safe_fs_perms::{Context, PermissionPolicy};

#[cfg(unix)]
pub mod unix_helpers;

/// A context whose `remove_tree` is confined to `root`, with the default modes.
pub fn sandboxed_context(root: &Path) -> Context {
    Context::new(PermissionPolicy::sandboxed(root)).expect("sandboxed context")
}

pub fn sandboxed_policy(root: &Path, file_mode: u32, dir_mode: u32) -> PermissionPolicy {
    PermissionPolicy {
        file_mode,
        dir_mode,
        ..PermissionPolicy::sandboxed(root)
    }
}

/// Permission bits of `path`, following symlinks.
pub fn mode_of(path: &Path) -> u32 {
    fs::metadata(path)
        .unwrap_or_else(|err| panic!("stat {}: {err}", path.display()))
        .mode()
        & 0o777
}

/// Create each relative file under `root` (with parents) and return their full paths.
pub fn write_files(root: &Path, files: &[&str]) -> Vec<PathBuf> {
    files
        .iter()
        .map(|rel| {
            let path = root.join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("create parents");
            }
            fs::write(&path, rel.as_bytes()).expect("write file");
            path
        })
        .collect()
}
