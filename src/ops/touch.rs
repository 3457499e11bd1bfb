use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::SystemTime;

use crate::error::{Error, Result};
use crate::hooks::HookEvent;
use crate::platform::unix_ids;

use super::Context;

/// Create `path` if it is missing, otherwise bump its modification time; then apply the
/// configured defaults. A newly created file also fires [`HookEvent::FileCreated`].
pub fn touch(ctx: &Context, path: &Path) -> Result<()> {
    let existed = match fs::metadata(path) {
        Ok(_) => {
            if !unix_ids::is_writable(path) {
                ctx.make_writable(path)?;
            }
            true
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => false,
        Err(err) => return Err(Error::stat(path, err)),
    };

    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|err| Error::io_path("open", path, err))?;
    if existed {
        file.set_modified(SystemTime::now())
            .map_err(|err| Error::io_path("set_modified", path, err))?;
    }
    drop(file);

    ctx.set_permissions(path, None)?;
    if !existed {
        ctx.notify(HookEvent::FileCreated, path)?;
    }
    Ok(())
}

/// Write `contents` to a brand-new file at `path` and fire [`HookEvent::FileCreated`].
///
/// Fails if `path` already exists.
pub fn create_file(ctx: &Context, path: &Path, contents: &[u8]) -> Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|err| Error::io_path("create", path, err))?;
    file.write_all(contents)
        .map_err(|err| Error::io_path("write", path, err))?;
    drop(file);

    tracing::debug!(path = %path.display(), bytes = contents.len(), "created file");
    ctx.notify(HookEvent::FileCreated, path)
}
