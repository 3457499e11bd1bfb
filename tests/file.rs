mod common;

use std::fs;
use std::io::{Read, Write};
use std::os::unix::fs::PermissionsExt;

use common::unix_helpers::running_as_root;
use common::{mode_of, sandboxed_policy, write_files};
use safe_fs_perms::{Context, Error, FileInfo};

fn open_failure(file: &FileInfo, mode: &str) -> &'static str {
    match file.open(mode).expect_err(mode) {
        Error::OpenFile { path, reason, .. } => {
            assert_eq!(path, file.path());
            reason
        }
        other => panic!("{mode}: unexpected error: {other:?}"),
    }
}

#[test]
fn open_honours_fopen_modes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = FileInfo::new(dir.path().join("log.txt"));

    file.open("w")
        .expect("create")
        .write_all(b"first\n")
        .expect("write");
    file.open("a")
        .expect("append")
        .write_all(b"second\n")
        .expect("append");
    file.open("c+").expect("keep contents");

    let mut contents = String::new();
    file.open("rb")
        .expect("read")
        .read_to_string(&mut contents)
        .expect("read");
    assert_eq!(contents, "first\nsecond\n");

    file.open("w+").expect("truncate");
    assert_eq!(fs::metadata(file.path()).expect("meta").len(), 0);
}

#[test]
fn open_explains_existing_and_missing_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let existing = write_files(dir.path(), &["taken.txt"]);

    let taken = FileInfo::new(&existing[0]);
    assert_eq!(open_failure(&taken, "x"), "file already exists");
    assert_eq!(open_failure(&taken, "x+"), "file already exists");

    let missing = FileInfo::new(dir.path().join("absent.txt"));
    assert_eq!(open_failure(&missing, "r"), "file is not readable");

    let orphan = FileInfo::new(dir.path().join("no_dir/new.txt"));
    assert_eq!(open_failure(&orphan, "w"), "file is not writable");
}

#[test]
fn open_explains_permission_failures() {
    if running_as_root() {
        return;
    }
    let dir = tempfile::tempdir().expect("tempdir");
    let files = write_files(dir.path(), &["read_only.txt", "write_only.txt"]);
    fs::set_permissions(&files[0], fs::Permissions::from_mode(0o444)).expect("chmod");
    fs::set_permissions(&files[1], fs::Permissions::from_mode(0o200)).expect("chmod");

    let read_only = FileInfo::new(&files[0]);
    assert_eq!(open_failure(&read_only, "a"), "file is not writable");
    read_only.open("r").expect("still readable");

    let write_only = FileInfo::new(&files[1]);
    assert_eq!(open_failure(&write_only, "r"), "file is not readable");
    assert_eq!(open_failure(&write_only, "r+"), "file is not readable");
    write_only.open("c").expect("still writable");
}

#[test]
fn open_rejects_unknown_modes_before_touching_the_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = FileInfo::new(dir.path().join("never.txt"));
    for mode in ["", "z", "rw"] {
        match file.open(mode).expect_err(mode) {
            Error::InvalidOpenMode(raw) => assert_eq!(raw, mode),
            other => panic!("{mode}: unexpected error: {other:?}"),
        }
    }
    assert!(!file.path().exists());
}

#[test]
fn touch_and_set_permissions_use_the_context_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = Context::new(sandboxed_policy(dir.path(), 0o640, 0o750)).expect("ctx");

    let file = FileInfo::new(dir.path().join("report.CSV"));
    file.touch(&ctx).expect("touch");
    assert_eq!(mode_of(file.path()), 0o640);

    fs::set_permissions(file.path(), fs::Permissions::from_mode(0o600)).expect("chmod");
    file.set_permissions(&ctx).expect("set_permissions");
    assert_eq!(mode_of(file.path()), 0o640);

    let copy = FileInfo::new(file.with_suffix("-2024"));
    assert_eq!(copy.path(), dir.path().join("report-2024.csv"));
    copy.touch(&ctx).expect("touch copy");
    assert!(copy.path().is_file());
}
