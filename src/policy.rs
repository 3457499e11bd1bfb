use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::mode::PERMISSION_BITS;

/// Modes are written as octal strings (`"0o640"`); integers are accepted on input.
mod octal_mode {
    use std::fmt;

    use serde::de::{self, Unexpected, Visitor};
    use serde::{Deserializer, Serializer};

    use crate::mode::parse_mode;

    pub(super) fn serialize<S: Serializer>(mode: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&format_args!("{mode:#o}"))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        deserializer.deserialize_any(ModeVisitor)
    }

    struct ModeVisitor;

    impl Visitor<'_> for ModeVisitor {
        type Value = u32;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a permission mode as an integer or an octal string such as \"0640\"")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<u32, E> {
            u32::try_from(value).map_err(|_| E::invalid_value(Unexpected::Unsigned(value), &self))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<u32, E> {
            u32::try_from(value).map_err(|_| E::invalid_value(Unexpected::Signed(value), &self))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<u32, E> {
            parse_mode(value).map_err(E::custom)
        }
    }
}

/// How a canonical path is compared against the required sandbox prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PrefixMatch {
    /// The prefix must end on a path-segment boundary.
    #[default]
    Component,
    /// Raw string prefix: `/var/app` also admits `/var/app_evil`.
    Literal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SandboxRules {
    /// Every path handed to `remove_tree` must canonicalize to somewhere under this prefix.
    ///
    /// `None` disables `remove_tree` entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_prefix: Option<PathBuf>,
    #[serde(default)]
    pub prefix_match: PrefixMatch,
    /// Maximum directory depth `remove_tree` descends below the path it was given.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

const fn default_max_depth() -> usize {
    256
}

impl Default for SandboxRules {
    fn default() -> Self {
        Self {
            required_prefix: None,
            prefix_match: PrefixMatch::default(),
            max_depth: default_max_depth(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PermissionPolicy {
    /// Mode applied to files by `set_permissions` when no explicit mode is given.
    ///
    /// `0` leaves file modes untouched.
    #[serde(default = "default_file_mode", with = "octal_mode")]
    pub file_mode: u32,
    /// Mode applied to directories by `set_permissions` when no explicit mode is given.
    #[serde(default = "default_dir_mode", with = "octal_mode")]
    pub dir_mode: u32,
    /// Group (name, or numeric gid) given to normalized files and directories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_group: Option<String>,
    #[serde(default)]
    pub sandbox: SandboxRules,
}

const fn default_file_mode() -> u32 {
    0o660
}

const fn default_dir_mode() -> u32 {
    0o770
}

const MAX_DEPTH_HARD_CAP: usize = 4096;

pub(crate) fn validate_mode(value: u32, field: &str) -> Result<()> {
    if value & !PERMISSION_BITS != 0 {
        return Err(Error::InvalidPolicy(format!(
            "{field} must only contain permission bits (<= 0o777), got {value:#o}"
        )));
    }
    Ok(())
}

impl Default for PermissionPolicy {
    fn default() -> Self {
        Self {
            file_mode: default_file_mode(),
            dir_mode: default_dir_mode(),
            file_group: None,
            sandbox: SandboxRules::default(),
        }
    }
}

impl PermissionPolicy {
    /// Default modes with `remove_tree` confined to `prefix`.
    pub fn sandboxed(prefix: impl Into<PathBuf>) -> Self {
        Self {
            sandbox: SandboxRules {
                required_prefix: Some(prefix.into()),
                ..SandboxRules::default()
            },
            ..Self::default()
        }
    }

    /// Structural validation only: no filesystem IO and no group lookup.
    ///
    /// Group resolution and prefix canonicalization happen in `ops::Context::new`.
    pub fn validate(&self) -> Result<()> {
        validate_mode(self.file_mode, "file_mode")?;
        validate_mode(self.dir_mode, "dir_mode")?;
        if let Some(group) = &self.file_group
            && group.trim().is_empty()
        {
            return Err(Error::InvalidPolicy("file_group is empty".to_string()));
        }
        if let Some(prefix) = &self.sandbox.required_prefix {
            if prefix.as_os_str().is_empty() {
                return Err(Error::InvalidPolicy(
                    "sandbox.required_prefix is empty".to_string(),
                ));
            }
            if !prefix.is_absolute() {
                return Err(Error::InvalidPolicy(format!(
                    "sandbox.required_prefix must be absolute, got {}",
                    prefix.display()
                )));
            }
        }
        if self.sandbox.max_depth == 0 {
            return Err(Error::InvalidPolicy(
                "sandbox.max_depth must be > 0".to_string(),
            ));
        }
        if self.sandbox.max_depth > MAX_DEPTH_HARD_CAP {
            return Err(Error::InvalidPolicy(format!(
                "sandbox.max_depth must be <= {MAX_DEPTH_HARD_CAP}"
            )));
        }
        Ok(())
    }
}
