use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;

/// Root bypasses `access(2)` write checks, so read-only fixtures do not block it.
pub fn running_as_root() -> bool {
    // Safety: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

pub fn create_fifo(path: &std::path::Path) {
    let c_path = CString::new(path.as_os_str().as_bytes())
        .unwrap_or_else(|_| panic!("invalid fifo path (contains NUL): {:?}", path));
    // Safety: `c_path` is NUL-terminated and outlives the call.
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) };
    if rc != 0 {
        panic!(
            "mkfifo failed for {}: {}",
            path.display(),
            std::io::Error::last_os_error()
        );
    }
}
