use std::fs;
use std::io;
use std::path::Path;

use crate::error::{Error, Result};
use crate::path_utils::{dir_chain, local_path_for_location};

use super::Context;

/// Create `location` and every missing ancestor.
///
/// Each directory this call creates gets the configured directory mode and group; directories that
/// already exist are left alone. `location` may be a plain path or a `file://` URL.
pub fn mkdir_all(ctx: &Context, location: &Path) -> Result<()> {
    let path = local_path_for_location(location)?;
    if path.as_os_str().is_empty() {
        return Err(Error::InvalidPath(
            "refusing to create an empty path".to_string(),
        ));
    }

    for dir in dir_chain(&path) {
        if dir.is_dir() {
            continue;
        }
        match fs::create_dir(&dir) {
            Ok(()) => {
                tracing::debug!(path = %dir.display(), "created directory");
                ctx.set_permissions(&dir, None)?;
            }
            // Lost a race with another creator; fine as long as it is a directory.
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => {}
            Err(source) => {
                return Err(Error::DirectoryCreate { path: dir, source });
            }
        }
    }
    Ok(())
}
