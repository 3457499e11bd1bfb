use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use crate::error::{Error, Result};
use crate::path_utils::has_prefix;
use crate::platform::unix_ids;

use super::Context;

const UNLOCKED_FILE_MODE: u32 = 0o666;
const UNLOCKED_DIR_MODE: u32 = 0o777;

/// Recursively delete `path`, which must resolve to somewhere under the configured sandbox prefix.
///
/// Returns the number of nodes removed (files, symlinks and directories, `path` included). A path
/// that does not exist removes nothing. Symlinks below `path` are unlinked, never followed. Nodes
/// the process cannot use are opened up with `chmod` first. The deletion is not transactional: a
/// node that blocks does not stop its siblings from being removed, and the first error met is
/// returned once the walk has finished.
pub fn remove_tree(ctx: &Context, path: &Path) -> Result<usize> {
    let canonical = match path.canonicalize() {
        Ok(canonical) => canonical,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "remove_tree: path does not exist");
            return Ok(0);
        }
        Err(err) => return Err(Error::io_path("canonicalize", path, err)),
    };

    let Some(prefix) = ctx.required_prefix() else {
        return Err(Error::SandboxNotConfigured);
    };

    let sandbox = &ctx.policy().sandbox;
    if !has_prefix(&canonical, prefix, sandbox.prefix_match) {
        return Err(Error::OutsideSandbox {
            prefix: prefix.to_path_buf(),
            path: canonical,
        });
    }

    let removed = remove_node(&canonical, 0, sandbox.max_depth)?;
    tracing::info!(path = %canonical.display(), removed, "removed tree");
    Ok(removed)
}

fn remove_node(path: &Path, depth: usize, max_depth: usize) -> Result<usize> {
    let meta = fs::symlink_metadata(path).map_err(|err| Error::io_path("metadata", path, err))?;
    let file_type = meta.file_type();
    if file_type.is_symlink() {
        return Ok(unlink(path));
    }

    let is_dir = file_type.is_dir();
    if is_dir && depth >= max_depth {
        return Err(Error::DepthLimitExceeded {
            path: path.to_path_buf(),
            max_depth,
        });
    }

    ensure_deletable(path, is_dir)?;
    if !is_dir {
        return Ok(unlink(path));
    }

    let mut removed = 0_usize;
    let mut first_err: Option<Error> = None;
    let entries = fs::read_dir(path).map_err(|err| Error::io_path("read_dir", path, err))?;
    for entry in entries {
        let outcome = entry
            .map_err(|err| Error::io_path("read_dir", path, err))
            .and_then(|entry| remove_node(&entry.path(), depth + 1, max_depth));
        match outcome {
            Ok(count) => removed += count,
            Err(err) if first_err.is_none() => first_err = Some(err),
            Err(err) => tracing::warn!(error = %err, "further node blocked removal"),
        }
    }
    if let Some(err) = first_err {
        return Err(err);
    }

    fs::remove_dir(path).map_err(|err| Error::io_path("remove_dir", path, err))?;
    Ok(removed + 1)
}

fn ensure_deletable(path: &Path, is_dir: bool) -> Result<()> {
    let usable = if is_dir {
        unix_ids::is_traversable_dir(path)
    } else {
        unix_ids::is_writable(path)
    };
    if usable {
        return Ok(());
    }
    let mode = if is_dir {
        UNLOCKED_DIR_MODE
    } else {
        UNLOCKED_FILE_MODE
    };
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|source| {
        Error::DeletePermissionDenied {
            path: path.to_path_buf(),
            source,
        }
    })?;
    tracing::info!(
        path = %path.display(),
        mode = %format!("{mode:#o}"),
        "unlocked node for deletion"
    );
    Ok(())
}

/// Unlink failures are reported as zero removed nodes rather than errors.
fn unlink(path: &Path) -> usize {
    match fs::remove_file(path) {
        Ok(()) => 1,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "could not unlink");
            0
        }
    }
}
