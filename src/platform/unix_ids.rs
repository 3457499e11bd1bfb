use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

// Process identity and group lookups that Rust std does not expose. All `unsafe` is confined to
// the libc call sites below; buffers are sized from kernel/libc reported lengths and capped.

const MAX_GROUP_ENTRIES: usize = 65_536;
const MAX_GETGRNAM_BUF_BYTES: usize = 1024 * 1024;
const MAX_GETGROUPS_RACE_RETRIES: usize = 4;

fn path_to_cstring(path: &Path) -> std::io::Result<CString> {
    CString::new(path.as_os_str().as_bytes()).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("path contains interior NUL byte: {}", path.display()),
        )
    })
}

pub(crate) fn real_uid() -> u32 {
    // SAFETY: getuid has no preconditions and cannot fail.
    unsafe { libc::getuid() }
}

pub(crate) fn real_gid() -> u32 {
    // SAFETY: getgid has no preconditions and cannot fail.
    unsafe { libc::getgid() }
}

pub(crate) fn supplementary_groups() -> std::io::Result<Vec<u32>> {
    for _ in 0..MAX_GETGROUPS_RACE_RETRIES {
        // SAFETY: a zero count with a null buffer asks for the number of groups only.
        let count = unsafe { libc::getgroups(0, std::ptr::null_mut()) };
        if count < 0 {
            return Err(std::io::Error::last_os_error());
        }
        let count = usize::try_from(count).unwrap_or(0).min(MAX_GROUP_ENTRIES);
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut groups: Vec<libc::gid_t> = vec![0; count];
        let capacity = libc::c_int::try_from(groups.len()).unwrap_or(libc::c_int::MAX);
        // SAFETY: `groups` is a writable buffer holding `capacity` gid_t values.
        let read = unsafe { libc::getgroups(capacity, groups.as_mut_ptr()) };
        if read < 0 {
            let err = std::io::Error::last_os_error();
            // The group list grew between the two calls; ask again.
            if err.raw_os_error() == Some(libc::EINVAL) {
                continue;
            }
            return Err(err);
        }
        groups.truncate(usize::try_from(read).unwrap_or(0));
        return Ok(groups);
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::ResourceBusy,
        "supplementary group list changed concurrently during read",
    ))
}

/// Look up a group id by name. `Ok(None)` means no such group exists.
pub(crate) fn group_id_by_name(name: &str) -> std::io::Result<Option<u32>> {
    let c_name = CString::new(name).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "group name contains interior NUL byte",
        )
    })?;

    let mut buf_len = 1024_usize;
    loop {
        let mut buf = vec![0 as libc::c_char; buf_len];
        // SAFETY: `group` is plain old data; getgrnam_r fills it before we read it.
        let mut group: libc::group = unsafe { std::mem::zeroed() };
        let mut result: *mut libc::group = std::ptr::null_mut();
        // SAFETY: every pointer is valid for the duration of the call and `buf.len()` is the real
        // length of the scratch buffer.
        let rc = unsafe {
            libc::getgrnam_r(
                c_name.as_ptr(),
                &mut group,
                buf.as_mut_ptr(),
                buf.len(),
                &mut result,
            )
        };
        if rc == libc::ERANGE && buf_len < MAX_GETGRNAM_BUF_BYTES {
            buf_len *= 2;
            continue;
        }
        if rc != 0 {
            return Err(std::io::Error::from_raw_os_error(rc));
        }
        if result.is_null() {
            return Ok(None);
        }
        return Ok(Some(group.gr_gid));
    }
}

/// `access(2)` check of `mode` (an OR of `R_OK`, `W_OK`, `X_OK`) against the real uid/gid of the
/// process.
pub(crate) fn access_mode(path: &Path, mode: libc::c_int) -> bool {
    let Ok(c_path) = path_to_cstring(path) else {
        return false;
    };
    // SAFETY: `c_path` is NUL-terminated and outlives the call.
    unsafe { libc::access(c_path.as_ptr(), mode) == 0 }
}

pub(crate) fn is_writable(path: &Path) -> bool {
    access_mode(path, libc::W_OK)
}

pub(crate) fn is_readable(path: &Path) -> bool {
    access_mode(path, libc::R_OK)
}

/// Whether the directory at `path` can be listed, entered and emptied.
pub(crate) fn is_traversable_dir(path: &Path) -> bool {
    access_mode(path, libc::R_OK | libc::W_OK | libc::X_OK)
}

/// `chgrp`: change only the group of `path`, following symlinks.
pub(crate) fn change_group(path: &Path, gid: u32) -> std::io::Result<()> {
    let c_path = path_to_cstring(path)?;
    // SAFETY: `c_path` is NUL-terminated; uid_t::MAX (-1) leaves the owner unchanged.
    let rc = unsafe { libc::chown(c_path.as_ptr(), libc::uid_t::MAX, gid) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}
