//! Reading and writing [`PermissionPolicy`] files.
//!
//! A policy file is TOML or JSON, chosen by extension. Modes may be written as integers or as
//! octal strings (`"0640"`, `"0o640"`). Loading also resolves `file_group`, so a policy naming a
//! group this host does not know fails here with the file path in the message rather than later
//! in `Context::new`.

use std::fs::{File, OpenOptions};
use std::io::Read;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use crate::identity::resolve_group;
use crate::{Error, PermissionPolicy, Result};

const DEFAULT_MAX_POLICY_BYTES: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyFormat {
    Toml,
    Json,
}

impl PolicyFormat {
    /// `.json` selects JSON; `.toml` or no extension selects TOML. Matching ignores case.
    pub fn from_path(path: &Path) -> Result<Self> {
        let Some(ext) = path.extension() else {
            return Ok(Self::Toml);
        };
        match ext.to_string_lossy().to_ascii_lowercase().as_str() {
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            other => Err(Error::InvalidPolicy(format!(
                "{}: unsupported policy format {other:?}; expected .toml or .json",
                path.display()
            ))),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Toml => "toml",
            Self::Json => "json",
        }
    }
}

/// Parse and validate a policy from text.
pub fn parse_policy(raw: &str, format: PolicyFormat) -> Result<PermissionPolicy> {
    let parsed = match format {
        PolicyFormat::Json => {
            serde_json::from_str::<PermissionPolicy>(raw).map_err(|err| err.to_string())
        }
        PolicyFormat::Toml => {
            toml::from_str::<PermissionPolicy>(raw).map_err(|err| err.to_string())
        }
    };
    let policy = parsed
        .map_err(|err| Error::InvalidPolicy(format!("invalid {} policy: {err}", format.name())))?;
    policy.validate()?;
    Ok(policy)
}

/// Render `policy` in `format`, with modes as octal strings.
pub fn render_policy(policy: &PermissionPolicy, format: PolicyFormat) -> Result<String> {
    match format {
        PolicyFormat::Json => Ok(serde_json::to_string_pretty(policy)?),
        PolicyFormat::Toml => toml::to_string_pretty(policy)
            .map_err(|err| Error::InvalidPolicy(format!("cannot render toml policy: {err}"))),
    }
}

pub fn load_policy(path: impl AsRef<Path>) -> Result<PermissionPolicy> {
    load_policy_limited(path, DEFAULT_MAX_POLICY_BYTES)
}

/// Load a policy file of at most `max_bytes` bytes.
///
/// The final path component must not be a symlink and must name a regular file. Policy errors
/// are prefixed with the file path.
pub fn load_policy_limited(path: impl AsRef<Path>, max_bytes: u64) -> Result<PermissionPolicy> {
    if max_bytes == 0 {
        return Err(Error::InvalidPolicy(
            "max policy bytes must be > 0".to_string(),
        ));
    }

    let path = path.as_ref();
    let format = PolicyFormat::from_path(path)?;
    let file = open_policy_file(path)?;

    let mut bytes = Vec::<u8>::new();
    file.take(max_bytes.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|err| Error::io_path("read", path, err))?;
    if bytes.len() as u64 > max_bytes {
        return Err(Error::InputTooLarge {
            size_bytes: bytes.len() as u64,
            max_bytes,
        });
    }
    let raw = std::str::from_utf8(&bytes).map_err(|_| Error::InvalidUtf8(path.to_path_buf()))?;

    let policy = parse_policy(raw, format).map_err(|err| with_policy_path(path, err))?;
    if let Some(group) = policy.file_group.as_deref() {
        let gid = resolve_group(group).map_err(|err| with_policy_path(path, err))?;
        tracing::debug!(policy = %path.display(), group, gid, "resolved policy file_group");
    }
    tracing::debug!(
        policy = %path.display(),
        format = format.name(),
        sandboxed = policy.sandbox.required_prefix.is_some(),
        "loaded permission policy"
    );
    Ok(policy)
}

/// Open without following a final symlink and without blocking on FIFOs.
fn open_policy_file(path: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NOFOLLOW | libc::O_NONBLOCK)
        .open(path)
        .map_err(|err| {
            if err.raw_os_error() == Some(libc::ELOOP) {
                Error::InvalidPath(format!(
                    "path {} is a symlink; refusing to load policy from symlink paths",
                    path.display()
                ))
            } else {
                Error::io_path("open", path, err)
            }
        })?;
    let meta = file
        .metadata()
        .map_err(|err| Error::io_path("metadata", path, err))?;
    if !meta.is_file() {
        return Err(Error::InvalidPath(format!(
            "path {} is not a regular file",
            path.display()
        )));
    }
    Ok(file)
}

fn with_policy_path(path: &Path, err: Error) -> Error {
    match err {
        Error::InvalidPolicy(message) => {
            Error::InvalidPolicy(format!("{}: {message}", path.display()))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension_case_insensitively() {
        assert_eq!(
            PolicyFormat::from_path(Path::new("/etc/app/policy")).expect("bare"),
            PolicyFormat::Toml
        );
        assert_eq!(
            PolicyFormat::from_path(Path::new("policy.TOML")).expect("toml"),
            PolicyFormat::Toml
        );
        assert_eq!(
            PolicyFormat::from_path(Path::new("policy.Json")).expect("json"),
            PolicyFormat::Json
        );
        match PolicyFormat::from_path(Path::new("policy.yml")).expect_err("yml") {
            Error::InvalidPolicy(message) => {
                assert!(message.starts_with("policy.yml:"), "{message}");
                assert!(message.contains("yml"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rendered_policy_parses_back_in_both_formats() {
        let mut policy = PermissionPolicy::sandboxed("/srv/app");
        policy.file_mode = 0o640;
        policy.dir_mode = 0;
        for format in [PolicyFormat::Toml, PolicyFormat::Json] {
            let text = render_policy(&policy, format).expect("render");
            assert!(text.contains("0o640"), "{format:?}: {text}");
            let parsed = parse_policy(&text, format).expect("parse");
            assert_eq!(parsed.file_mode, 0o640);
            assert_eq!(parsed.dir_mode, 0);
            assert_eq!(
                parsed.sandbox.required_prefix.as_deref(),
                Some(Path::new("/srv/app"))
            );
        }
    }

    #[test]
    fn parse_policy_validates() {
        match parse_policy("dir_mode = \"0o1777\"\n", PolicyFormat::Toml).expect_err("range") {
            Error::InvalidPolicy(message) => assert!(message.contains("toml"), "{message}"),
            other => panic!("unexpected error: {other:?}"),
        }
        match parse_policy(r#"{"sandbox":{"max_depth":0}}"#, PolicyFormat::Json)
            .expect_err("depth")
        {
            Error::InvalidPolicy(message) => assert!(message.contains("max_depth"), "{message}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
