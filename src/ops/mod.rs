use std::path::PathBuf;

use crate::hooks::Hooks;
use crate::policy::PermissionPolicy;

mod context;
mod file;
mod list_dir;
mod mkdir;
mod permissions;
mod remove_tree;
mod touch;

pub use file::{FileInfo, OpenMode};
pub use list_dir::{DirEntry, DirReader, EntryKind, ReadFilter, read_dir};
pub use mkdir::mkdir_all;
pub use permissions::{
    RepairPlan, get_permissions, identity, make_writable, plan_repair, set_permissions,
};
pub use remove_tree::remove_tree;
pub use touch::{create_file, touch};

/// Validated configuration plus the hook bus every operation runs against.
pub struct Context {
    policy: PermissionPolicy,
    file_gid: Option<u32>,
    required_prefix: Option<PathBuf>,
    hooks: Hooks,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("file_mode", &format_args!("{:#o}", self.policy.file_mode))
            .field("dir_mode", &format_args!("{:#o}", self.policy.dir_mode))
            .field("file_group", &self.policy.file_group)
            .field("file_gid", &self.file_gid)
            .field("required_prefix", &self.required_prefix)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}
