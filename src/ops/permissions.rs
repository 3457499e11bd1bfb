use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;

use crate::error::{Error, Result};
use crate::identity::{self, FileIdentity};
use crate::mode::{
    GROUP_EXECUTE, GROUP_WRITE, OWNER_EXECUTE, OWNER_WRITE, PERMISSION_BITS, PermissionSet,
};
use crate::platform::unix_ids;

use super::Context;

fn group_label(ctx: &Context, gid: u32) -> String {
    ctx.default_file_group()
        .map_or_else(|| gid.to_string(), str::to_string)
}

fn chmod(path: &Path, mode: u32) -> io::Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

/// Bring `path` in line with the configured group and mode.
///
/// `mode` overrides the configured default for the node's kind. A target mode of `0` leaves the
/// mode untouched. Paths that do not exist or are not owned by the running process are skipped
/// without error.
pub fn set_permissions(ctx: &Context, path: &Path, mode: Option<u32>) -> Result<()> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "set_permissions: path does not exist; skipping");
            return Ok(());
        }
        Err(err) => return Err(Error::stat(path, err)),
    };
    let identity = FileIdentity::from_metadata(path, &meta);
    if !identity.is_owned_by_current_user() {
        tracing::debug!(
            path = %path.display(),
            owner = identity.uid,
            "set_permissions: not the owner; skipping"
        );
        return Ok(());
    }

    if let Some(gid) = ctx.file_gid()
        && identity.gid != gid
    {
        unix_ids::change_group(path, gid).map_err(|source| Error::GroupChange {
            path: path.to_path_buf(),
            group: group_label(ctx, gid),
            source,
        })?;
        tracing::info!(
            path = %path.display(),
            from = identity.gid,
            to = gid,
            "changed group"
        );
    }

    let target = mode.unwrap_or_else(|| ctx.default_mode_for(identity.is_dir)) & PERMISSION_BITS;
    if target == 0 {
        return Ok(());
    }

    // chgrp may clear setgid bits; compare against a fresh stat.
    let current = fs::metadata(path).map_err(|err| Error::stat(path, err))?;
    let current_mode = current.mode() & PERMISSION_BITS;
    if current_mode == target {
        return Ok(());
    }

    chmod(path, target).map_err(|source| Error::ModeChange {
        path: path.to_path_buf(),
        mode: target,
        source,
    })?;
    tracing::info!(
        path = %path.display(),
        from = %PermissionSet::from_mode(current_mode),
        to = %PermissionSet::from_mode(target),
        "changed mode"
    );
    Ok(())
}

/// What `make_writable` must do for a node the process cannot currently write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairPlan {
    /// The process owns the node and fixes it itself.
    Repair {
        change_group: Option<u32>,
        new_mode: Option<u32>,
    },
    /// Not the owner, but a group the process belongs to may write.
    GroupWritable,
    /// Not the owner, but anyone may write.
    WorldWritable,
    /// Not the owner and nothing grants write access.
    Denied,
}

/// Decide how to make the node described by `identity` writable for `uid`, a member of `groups`.
///
/// With a configured `file_gid` the owner also grants group write (and group execute on
/// directories), even when the node already carries that group.
pub fn plan_repair(
    identity: &FileIdentity,
    uid: u32,
    groups: &BTreeSet<u32>,
    file_gid: Option<u32>,
) -> RepairPlan {
    let permissions = identity.permissions;
    if identity.uid != uid {
        if groups.contains(&identity.gid) && permissions.group.write {
            return RepairPlan::GroupWritable;
        }
        if permissions.world.write {
            return RepairPlan::WorldWritable;
        }
        return RepairPlan::Denied;
    }

    let with_group = file_gid.is_some();
    let current = permissions.mode();
    let mut wanted = current | OWNER_WRITE;
    if with_group {
        wanted |= GROUP_WRITE;
    }
    if identity.is_dir {
        wanted |= OWNER_EXECUTE;
        if with_group {
            wanted |= GROUP_EXECUTE;
        }
    }

    RepairPlan::Repair {
        change_group: file_gid.filter(|gid| *gid != identity.gid),
        new_mode: (wanted != current).then_some(wanted),
    }
}

/// Make `path` writable for the running process, repairing ownership bits when it is the owner.
pub fn make_writable(ctx: &Context, path: &Path) -> Result<()> {
    if unix_ids::is_writable(path) {
        return Ok(());
    }

    let identity = FileIdentity::resolve(path)?;
    let groups = if identity.is_owned_by_current_user() {
        BTreeSet::new()
    } else {
        identity::current_user_groups()?
    };

    match plan_repair(&identity, identity::current_uid(), &groups, ctx.file_gid()) {
        RepairPlan::Repair {
            change_group,
            new_mode,
        } => {
            if let Some(gid) = change_group {
                unix_ids::change_group(path, gid).map_err(|source| Error::PermissionRepair {
                    path: path.to_path_buf(),
                    reason: format!("cannot change group to {}", group_label(ctx, gid)),
                    source,
                })?;
                tracing::info!(path = %path.display(), from = identity.gid, to = gid, "changed group");
            }
            if let Some(mode) = new_mode {
                chmod(path, mode).map_err(|source| Error::PermissionRepair {
                    path: path.to_path_buf(),
                    reason: format!("cannot change mode to {mode:#o}"),
                    source,
                })?;
                tracing::info!(
                    path = %path.display(),
                    kind = if identity.is_dir { "directory" } else { "file" },
                    from = %identity.permissions,
                    to = %PermissionSet::from_mode(mode),
                    "made writable"
                );
            }
            Ok(())
        }
        RepairPlan::GroupWritable | RepairPlan::WorldWritable => Ok(()),
        RepairPlan::Denied => Err(Error::PermissionDenied(path.to_path_buf())),
    }
}

pub fn get_permissions(path: &Path) -> Result<PermissionSet> {
    Ok(FileIdentity::resolve(path)?.permissions)
}

pub fn identity(path: &Path) -> Result<FileIdentity> {
    FileIdentity::resolve(path)
}
