//! POSIX permission bits as a small value type.
//!
//! Only the nine owner/group/world read-write-execute bits are modelled. File-type, setuid,
//! setgid and sticky bits present in a raw `st_mode` are dropped on decode.

use std::fmt;

use serde::{Serialize, Serializer};

pub const OWNER_READ: u32 = 0o400;
pub const OWNER_WRITE: u32 = 0o200;
pub const OWNER_EXECUTE: u32 = 0o100;

pub const GROUP_READ: u32 = 0o040;
pub const GROUP_WRITE: u32 = 0o020;
pub const GROUP_EXECUTE: u32 = 0o010;

pub const WORLD_READ: u32 = 0o004;
pub const WORLD_WRITE: u32 = 0o002;
pub const WORLD_EXECUTE: u32 = 0o001;

/// Mask covering every bit a [`PermissionSet`] can represent.
pub const PERMISSION_BITS: u32 = 0o777;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseModeError {
    #[error("invalid octal mode {0:?}")]
    NotOctal(String),
    #[error("mode {0:#o} exceeds 0o777")]
    OutOfRange(u32),
}

/// Parse an octal permission mode written as `640`, `0640` or `0o640`.
pub fn parse_mode(raw: &str) -> std::result::Result<u32, ParseModeError> {
    let digits = raw
        .strip_prefix("0o")
        .or_else(|| raw.strip_prefix('0').filter(|rest| !rest.is_empty()))
        .unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
        return Err(ParseModeError::NotOctal(raw.to_string()));
    }
    let mode =
        u32::from_str_radix(digits, 8).map_err(|_| ParseModeError::NotOctal(raw.to_string()))?;
    if mode & !PERMISSION_BITS != 0 {
        return Err(ParseModeError::OutOfRange(mode));
    }
    Ok(mode)
}

/// Read/write/execute flags for a single subject class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Access {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
}

impl Access {
    pub const fn new(read: bool, write: bool, execute: bool) -> Self {
        Self {
            read,
            write,
            execute,
        }
    }

    const fn bits(self, read: u32, write: u32, execute: u32) -> u32 {
        (if self.read { read } else { 0 })
            | (if self.write { write } else { 0 })
            | (if self.execute { execute } else { 0 })
    }

    const fn decode(raw: u32, read: u32, write: u32, execute: u32) -> Self {
        Self {
            read: raw & read != 0,
            write: raw & write != 0,
            execute: raw & execute != 0,
        }
    }
}

/// Owner/group/world permission flags.
///
/// The numeric mode is derived from the flags every time it is asked for, so it cannot drift
/// from them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PermissionSet {
    pub owner: Access,
    pub group: Access,
    pub world: Access,
}

impl PermissionSet {
    pub const fn new(owner: Access, group: Access, world: Access) -> Self {
        Self {
            owner,
            group,
            world,
        }
    }

    /// Decode the permission bits of a raw mode, e.g. `st_mode` from `stat(2)`.
    pub const fn from_mode(raw: u32) -> Self {
        Self {
            owner: Access::decode(raw, OWNER_READ, OWNER_WRITE, OWNER_EXECUTE),
            group: Access::decode(raw, GROUP_READ, GROUP_WRITE, GROUP_EXECUTE),
            world: Access::decode(raw, WORLD_READ, WORLD_WRITE, WORLD_EXECUTE),
        }
    }

    /// The numeric mode: OR of the bit constants for every set flag.
    pub const fn mode(&self) -> u32 {
        self.owner.bits(OWNER_READ, OWNER_WRITE, OWNER_EXECUTE)
            | self.group.bits(GROUP_READ, GROUP_WRITE, GROUP_EXECUTE)
            | self.world.bits(WORLD_READ, WORLD_WRITE, WORLD_EXECUTE)
    }

    /// `ls -l` style rendering, e.g. `rwxr-x---`.
    pub fn symbolic(&self) -> String {
        [self.owner, self.group, self.world]
            .iter()
            .flat_map(|access| {
                [
                    if access.read { 'r' } else { '-' },
                    if access.write { 'w' } else { '-' },
                    if access.execute { 'x' } else { '-' },
                ]
            })
            .collect()
    }
}

impl From<u32> for PermissionSet {
    fn from(raw: u32) -> Self {
        Self::from_mode(raw)
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#05o}", self.mode())
    }
}

impl Serialize for PermissionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut out = serializer.serialize_struct("PermissionSet", 5)?;
        out.serialize_field("mode", &format!("{:04o}", self.mode()))?;
        out.serialize_field("symbolic", &self.symbolic())?;
        out.serialize_field("owner", &self.owner)?;
        out.serialize_field("group", &self.group)?;
        out.serialize_field("world", &self.world)?;
        out.end()
    }
}
