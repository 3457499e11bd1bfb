use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::hooks::{HookEvent, Hooks};
use crate::identity::{FileIdentity, resolve_group};
use crate::mode::PermissionSet;
use crate::policy::{PermissionPolicy, PrefixMatch, validate_mode};

use super::{Context, DirReader, ReadFilter};

fn canonical_prefix(prefix: &Path) -> PathBuf {
    // A prefix that does not exist yet cannot be canonicalized; compare it lexically instead.
    match prefix.canonicalize() {
        Ok(canonical) => canonical,
        Err(err) => {
            tracing::debug!(
                prefix = %prefix.display(),
                error = %err,
                "required prefix does not resolve; using its lexical form"
            );
            crate::path_utils::normalize_path_lexical(prefix)
        }
    }
}

impl Context {
    /// Build a context with the standard permissions subscriber registered for every
    /// [`HookEvent`].
    pub fn new(policy: PermissionPolicy) -> Result<Self> {
        let mut ctx = Self::without_default_hooks(policy)?;
        for event in HookEvent::ALL {
            ctx.hooks.subscribe(event, crate::hooks::apply_default_permissions);
        }
        Ok(ctx)
    }

    /// Build a context whose hook bus starts empty.
    pub fn without_default_hooks(policy: PermissionPolicy) -> Result<Self> {
        policy.validate()?;
        let file_gid = policy
            .file_group
            .as_deref()
            .map(resolve_group)
            .transpose()?;
        let required_prefix = policy
            .sandbox
            .required_prefix
            .as_deref()
            .map(canonical_prefix);

        Ok(Self {
            policy,
            file_gid,
            required_prefix,
            hooks: Hooks::new(),
        })
    }

    #[cfg(feature = "policy-io")]
    pub fn from_policy_path(path: impl AsRef<Path>) -> Result<Self> {
        let policy = crate::policy_io::load_policy(path)?;
        Self::new(policy)
    }

    pub fn policy(&self) -> &PermissionPolicy {
        &self.policy
    }

    /// Confine `remove_tree` to `prefix`. The prefix must be absolute.
    pub fn set_required_prefix(&mut self, prefix: impl Into<PathBuf>) -> Result<()> {
        let prefix = prefix.into();
        if !prefix.is_absolute() {
            return Err(Error::InvalidPolicy(format!(
                "sandbox.required_prefix must be absolute, got {}",
                prefix.display()
            )));
        }
        self.required_prefix = Some(canonical_prefix(&prefix));
        self.policy.sandbox.required_prefix = Some(prefix);
        Ok(())
    }

    /// Remove the sandbox prefix; `remove_tree` refuses to run until one is set again.
    pub fn clear_required_prefix(&mut self) {
        self.required_prefix = None;
        self.policy.sandbox.required_prefix = None;
    }

    /// The canonical form of the configured sandbox prefix.
    pub fn required_prefix(&self) -> Option<&Path> {
        self.required_prefix.as_deref()
    }

    pub fn set_prefix_match(&mut self, mode: PrefixMatch) {
        self.policy.sandbox.prefix_match = mode;
    }

    pub fn set_default_file_group(&mut self, group: Option<&str>) -> Result<()> {
        let file_gid = group.map(resolve_group).transpose()?;
        self.file_gid = file_gid;
        self.policy.file_group = group.map(str::to_string);
        Ok(())
    }

    pub fn default_file_group(&self) -> Option<&str> {
        self.policy.file_group.as_deref()
    }

    pub fn set_default_file_mode(&mut self, mode: u32) -> Result<()> {
        validate_mode(mode, "file_mode")?;
        self.policy.file_mode = mode;
        Ok(())
    }

    pub fn default_file_mode(&self) -> u32 {
        self.policy.file_mode
    }

    pub fn set_default_dir_mode(&mut self, mode: u32) -> Result<()> {
        validate_mode(mode, "dir_mode")?;
        self.policy.dir_mode = mode;
        Ok(())
    }

    pub fn default_dir_mode(&self) -> u32 {
        self.policy.dir_mode
    }

    /// Register `subscriber` for `event`. Registration is additive; subscribers run in the order
    /// they were added.
    pub fn subscribe<F>(&mut self, event: HookEvent, subscriber: F)
    where
        F: Fn(&Context, &Path) -> Result<()> + Send + Sync + 'static,
    {
        self.hooks.subscribe(event, subscriber);
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    /// Tell every subscriber of `event` that `path` was just created.
    pub fn notify(&self, event: HookEvent, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        tracing::trace!(%event, path = %path.display(), "firing creation hook");
        self.hooks.fire(self, event, path)
    }

    pub fn mkdir_all(&self, path: impl AsRef<Path>) -> Result<()> {
        super::mkdir_all(self, path.as_ref())
    }

    pub fn remove_tree(&self, path: impl AsRef<Path>) -> Result<usize> {
        super::remove_tree(self, path.as_ref())
    }

    pub fn set_permissions(&self, path: impl AsRef<Path>, mode: Option<u32>) -> Result<()> {
        super::set_permissions(self, path.as_ref(), mode)
    }

    pub fn make_writable(&self, path: impl AsRef<Path>) -> Result<()> {
        super::make_writable(self, path.as_ref())
    }

    pub fn get_permissions(&self, path: impl AsRef<Path>) -> Result<PermissionSet> {
        super::get_permissions(path.as_ref())
    }

    pub fn identity(&self, path: impl AsRef<Path>) -> Result<FileIdentity> {
        super::identity(path.as_ref())
    }

    pub fn read_dir(&self, path: impl AsRef<Path>, filter: ReadFilter) -> Result<DirReader> {
        super::read_dir(path.as_ref(), filter)
    }

    pub fn touch(&self, path: impl AsRef<Path>) -> Result<()> {
        super::touch(self, path.as_ref())
    }

    pub fn create_file(&self, path: impl AsRef<Path>, contents: &[u8]) -> Result<()> {
        super::create_file(self, path.as_ref(), contents)
    }

    pub(super) fn file_gid(&self) -> Option<u32> {
        self.file_gid
    }

    pub(super) fn default_mode_for(&self, is_dir: bool) -> u32 {
        if is_dir {
            self.policy.dir_mode
        } else {
            self.policy.file_mode
        }
    }
}
