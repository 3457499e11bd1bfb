//! `safe-fs-perms` normalizes POSIX permissions and deletes directory trees inside a sandbox.
//!
//! Every operation runs against an [`ops::Context`] built from an explicit [`PermissionPolicy`]:
//! default file/directory modes, an optional group, and the prefix that confines
//! [`remove_tree`]. Creating files or directories fires [`HookEvent`]s whose standard subscriber
//! applies those defaults to the new path.

#[cfg(not(unix))]
compile_error!("safe-fs-perms supports POSIX targets only");

mod error;
pub mod hooks;
pub mod identity;
pub mod mode;
pub mod ops;
pub mod path_utils;
mod platform;
pub mod policy;
#[cfg(feature = "policy-io")]
pub mod policy_io;

pub use error::{Error, Result};

pub use hooks::{HookEvent, Hooks};
pub use identity::FileIdentity;
pub use mode::{Access, PermissionSet};
pub use ops::{
    Context, DirEntry, DirReader, EntryKind, FileInfo, OpenMode, ReadFilter, RepairPlan,
    create_file, get_permissions, make_writable, mkdir_all, plan_repair, read_dir, remove_tree,
    set_permissions, touch,
};

pub use policy::{PermissionPolicy, PrefixMatch, SandboxRules};
