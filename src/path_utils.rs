//! Lexical path helpers for sandbox-prefix checks and directory-chain creation.
//!
//! Nothing here touches the filesystem. Callers canonicalize first when a comparison must
//! account for symlinks.
use std::ffi::OsString;
use std::os::unix::ffi::OsStrExt;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};
use crate::policy::PrefixMatch;

/// Lexically normalize `path`.
///
/// - Removes `.` segments.
/// - Resolves `..` against preceding normal segments when possible.
/// - Preserves leading `..` for relative paths (`../../a/../b` -> `../../b`).
/// - For absolute paths `..` cannot escape `/` (`/../etc` -> `/etc`).
pub(crate) fn normalize_path_lexical(path: &Path) -> PathBuf {
    enum Segment {
        ParentDir,
        Normal(OsString),
    }

    let mut has_root = false;
    let mut segments: Vec<Segment> = Vec::new();

    for comp in path.components() {
        match comp {
            Component::CurDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                if matches!(segments.last(), Some(Segment::Normal(_))) {
                    segments.pop();
                } else if !has_root {
                    segments.push(Segment::ParentDir);
                }
            }
            Component::Normal(part) => segments.push(Segment::Normal(part.to_os_string())),
            Component::RootDir => has_root = true,
        }
    }

    let mut out = PathBuf::new();
    if has_root {
        out.push("/");
    }
    for segment in segments {
        match segment {
            Segment::ParentDir => out.push(".."),
            Segment::Normal(part) => out.push(part),
        }
    }

    if out.as_os_str().is_empty() && path.is_relative() {
        PathBuf::from(".")
    } else {
        out
    }
}

/// Whether `path` lies under `prefix` according to `mode`.
///
/// [`PrefixMatch::Component`] requires the prefix to end on a path-segment boundary, so `/var/app`
/// covers `/var/app` and `/var/app/x` but not `/var/app_evil`. [`PrefixMatch::Literal`] is a raw
/// byte-prefix comparison and does match `/var/app_evil`.
pub fn has_prefix(path: &Path, prefix: &Path, mode: PrefixMatch) -> bool {
    match mode {
        PrefixMatch::Component => path.starts_with(prefix),
        PrefixMatch::Literal => path
            .as_os_str()
            .as_bytes()
            .starts_with(prefix.as_os_str().as_bytes()),
    }
}

/// A URL-style `scheme://host` head split off a location string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UrlHead<'a> {
    pub head: &'a str,
    pub scheme: &'a str,
    pub host: &'a str,
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Split `scheme://host` off `raw`, keeping it intact. The remainder starts with `/` or is empty.
pub(crate) fn split_url_head(raw: &str) -> Option<(UrlHead<'_>, &str)> {
    let (scheme, after) = raw.split_once("://")?;
    if !is_scheme(scheme) {
        return None;
    }
    let host_len = after.find('/').unwrap_or(after.len());
    let head_len = scheme.len() + "://".len() + host_len;
    Some((
        UrlHead {
            head: &raw[..head_len],
            scheme,
            host: &after[..host_len],
        },
        &raw[head_len..],
    ))
}

/// Map a location that may carry a `file://` head onto a local filesystem path.
pub(crate) fn local_path_for_location(location: &Path) -> Result<PathBuf> {
    let Some(raw) = location.to_str() else {
        return Ok(location.to_path_buf());
    };
    let Some((url, rest)) = split_url_head(raw) else {
        return Ok(location.to_path_buf());
    };
    if !url.scheme.eq_ignore_ascii_case("file") {
        return Err(Error::InvalidPath(format!(
            "unsupported location scheme {:?} in {raw}",
            url.scheme
        )));
    }
    if !(url.host.is_empty() || url.host.eq_ignore_ascii_case("localhost")) {
        return Err(Error::InvalidPath(format!(
            "file location {raw} names remote host {:?}",
            url.host
        )));
    }
    if rest.is_empty() {
        return Ok(PathBuf::from("/"));
    }
    Ok(PathBuf::from(rest))
}

/// Successive, growing prefixes of `path`: `a/b/c` -> `a`, `a/b`, `a/b/c`.
///
/// `.` segments are skipped; `..` segments are kept as written.
pub(crate) fn dir_chain(path: &Path) -> Vec<PathBuf> {
    let mut chain = Vec::new();
    let mut current = PathBuf::new();
    for comp in path.components() {
        if matches!(comp, Component::CurDir) {
            continue;
        }
        current.push(comp.as_os_str());
        chain.push(current.clone());
    }
    chain
}
