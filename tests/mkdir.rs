mod common;

use std::fs;
use std::os::unix::fs::PermissionsExt;

use common::{mode_of, sandboxed_policy, write_files};
use safe_fs_perms::{Context, Error};

#[test]
fn mkdir_all_applies_dir_mode_to_each_created_level_only() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).expect("chmod root");
    let ctx = Context::new(sandboxed_policy(dir.path(), 0o640, 0o750)).expect("ctx");

    let target = dir.path().join("x/y/z");
    ctx.mkdir_all(&target).expect("mkdir_all");

    for level in ["x", "x/y", "x/y/z"] {
        let path = dir.path().join(level);
        assert!(path.is_dir(), "{level} missing");
        assert_eq!(mode_of(&path), 0o750, "{level}");
    }
    assert_eq!(mode_of(dir.path()), 0o755);
}

#[test]
fn mkdir_all_leaves_existing_directories_alone() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = Context::new(sandboxed_policy(dir.path(), 0o640, 0o750)).expect("ctx");

    let target = dir.path().join("a/b");
    ctx.mkdir_all(&target).expect("first");
    fs::set_permissions(dir.path().join("a"), fs::Permissions::from_mode(0o700)).expect("chmod");

    ctx.mkdir_all(&target).expect("second");
    assert_eq!(mode_of(&dir.path().join("a")), 0o700);

    ctx.mkdir_all(target.join("c")).expect("extend");
    assert_eq!(mode_of(&dir.path().join("a")), 0o700);
    assert_eq!(mode_of(&target.join("c")), 0o750);
}

#[test]
fn mkdir_all_accepts_local_file_urls() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = Context::new(sandboxed_policy(dir.path(), 0o640, 0o770)).expect("ctx");

    let location = format!("file://{}/u/v", dir.path().display());
    ctx.mkdir_all(&location).expect("file url");
    assert!(dir.path().join("u/v").is_dir());
    assert_eq!(mode_of(&dir.path().join("u")), 0o770);
}

#[test]
fn mkdir_all_rejects_remote_locations() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = Context::new(sandboxed_policy(dir.path(), 0o640, 0o770)).expect("ctx");

    for location in ["s3://bucket/a/b", "file://elsewhere/tmp/a"] {
        match ctx.mkdir_all(location).expect_err("remote") {
            Error::InvalidPath(message) => assert!(message.contains(location), "{message}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

#[test]
fn mkdir_all_reports_the_level_blocked_by_a_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let files = write_files(dir.path(), &["blocker"]);
    let ctx = Context::new(sandboxed_policy(dir.path(), 0o640, 0o770)).expect("ctx");

    match ctx.mkdir_all(files[0].join("sub")).expect_err("blocked") {
        Error::DirectoryCreate { path, source } => {
            assert_eq!(path, files[0]);
            assert_eq!(source.kind(), std::io::ErrorKind::AlreadyExists);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
