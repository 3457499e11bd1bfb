mod common;

#[cfg(feature = "policy-io")]
mod policy_io {
    use super::common::unix_helpers::create_fifo;
    use safe_fs_perms::Error;
    use safe_fs_perms::ops::Context;
    use safe_fs_perms::policy::{PermissionPolicy, PrefixMatch, SandboxRules};
    use safe_fs_perms::policy_io::{
        PolicyFormat, load_policy, load_policy_limited, render_policy,
    };

    #[test]
    fn load_policy_toml_and_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sandbox = dir.path().join("sandbox");
        std::fs::create_dir_all(&sandbox).expect("mkdir");

        let toml_path = dir.path().join("policy.toml");
        let json_path = dir.path().join("policy.json");

        std::fs::write(
            &toml_path,
            format!(
                r#"
file_mode = 0o640
dir_mode = 0o750

[sandbox]
required_prefix = "{}"
prefix_match = "literal"
"#,
                sandbox.display()
            ),
        )
        .expect("write toml");

        std::fs::write(
            &json_path,
            serde_json::to_string(&PermissionPolicy {
                file_mode: 0o600,
                dir_mode: 0o700,
                file_group: None,
                sandbox: SandboxRules {
                    required_prefix: Some(sandbox.clone()),
                    max_depth: 16,
                    ..Default::default()
                },
            })
            .expect("serialize json"),
        )
        .expect("write json");

        let toml_policy = load_policy(&toml_path).expect("load toml");
        assert_eq!(toml_policy.file_mode, 0o640);
        assert_eq!(toml_policy.dir_mode, 0o750);
        assert_eq!(toml_policy.sandbox.prefix_match, PrefixMatch::Literal);
        assert_eq!(toml_policy.sandbox.max_depth, 256);

        let json_policy = load_policy(&json_path).expect("load json");
        assert_eq!(json_policy.file_mode, 0o600);
        assert_eq!(json_policy.sandbox.max_depth, 16);
        assert_eq!(json_policy.sandbox.prefix_match, PrefixMatch::Component);

        let ctx = Context::from_policy_path(&toml_path).expect("ctx");
        assert_eq!(ctx.default_file_mode(), 0o640);
        assert_eq!(
            ctx.required_prefix(),
            Some(sandbox.canonicalize().expect("canon").as_path())
        );
    }

    #[test]
    fn load_policy_rejects_invalid_values_and_unknown_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cases = [
            ("bad_mode.toml", "file_mode = 0o4755\n"),
            ("relative.toml", "[sandbox]\nrequired_prefix = \"relative\"\n"),
            ("typo.toml", "file_mod = 0o640\n"),
            ("depth.json", r#"{"sandbox":{"max_depth":0}}"#),
        ];
        for (name, raw) in cases {
            let path = dir.path().join(name);
            std::fs::write(&path, raw).expect("write");
            match load_policy(&path).expect_err(name) {
                Error::InvalidPolicy(_) => {}
                other => panic!("{name}: unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn load_policy_enforces_the_byte_limit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("policy.toml");
        std::fs::write(&path, "file_mode = 0o640\n").expect("write");

        match load_policy_limited(&path, 4).expect_err("too large") {
            Error::InputTooLarge { max_bytes, .. } => assert_eq!(max_bytes, 4),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn load_policy_refuses_symlinks_and_unknown_extensions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let real = dir.path().join("policy.toml");
        std::fs::write(&real, "file_mode = 0o640\n").expect("write");
        let link = dir.path().join("link.toml");
        std::os::unix::fs::symlink(&real, &link).expect("symlink");

        match load_policy(&link).expect_err("symlink") {
            Error::InvalidPath(message) => assert!(message.contains("symlink")),
            other => panic!("unexpected error: {other:?}"),
        }

        let yaml = dir.path().join("policy.yaml");
        std::fs::write(&yaml, "file_mode: 416\n").expect("write");
        match load_policy(&yaml).expect_err("yaml") {
            Error::InvalidPolicy(message) => assert!(message.contains("yaml")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn context_rejects_unknown_groups() {
        let mut policy = PermissionPolicy::default();
        policy.file_group = Some("safe-fs-perms-no-such-group".to_string());
        match Context::new(policy).expect_err("unknown group") {
            Error::InvalidPolicy(message) => assert!(message.contains("unknown group")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn load_policy_accepts_octal_mode_strings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let toml_path = dir.path().join("policy.toml");
        std::fs::write(&toml_path, "file_mode = \"0640\"\ndir_mode = \"0o2750\"\n")
            .expect("write");
        match load_policy(&toml_path).expect_err("setgid bit is not a permission bit") {
            Error::InvalidPolicy(message) => {
                assert!(message.starts_with(&toml_path.display().to_string()), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        std::fs::write(&toml_path, "file_mode = \"0640\"\ndir_mode = \"0o750\"\n")
            .expect("write");
        let policy = load_policy(&toml_path).expect("load");
        assert_eq!((policy.file_mode, policy.dir_mode), (0o640, 0o750));

        let json_path = dir.path().join("policy.JSON");
        std::fs::write(
            &json_path,
            render_policy(&policy, PolicyFormat::Json).expect("render"),
        )
        .expect("write json");
        let reloaded = load_policy(&json_path).expect("load json");
        assert_eq!((reloaded.file_mode, reloaded.dir_mode), (0o640, 0o750));
    }

    #[test]
    fn load_policy_resolves_the_group_up_front() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("policy.toml");
        std::fs::write(&path, "file_group = \"safe-fs-perms-no-such-group\"\n").expect("write");
        match load_policy(&path).expect_err("unknown group") {
            Error::InvalidPolicy(message) => {
                assert!(message.starts_with(&path.display().to_string()), "{message}");
                assert!(message.contains("unknown group"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // Safety: getgid has no preconditions and cannot fail.
        let gid = unsafe { libc::getgid() };
        std::fs::write(&path, format!("file_group = \"{gid}\"\n")).expect("write");
        let ctx = Context::from_policy_path(&path).expect("numeric group resolves");
        assert_eq!(ctx.default_file_group(), Some(gid.to_string().as_str()));
    }

    #[test]
    fn load_policy_refuses_fifos_without_blocking() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fifo = dir.path().join("policy.toml");
        create_fifo(&fifo);
        match load_policy(&fifo).expect_err("fifo") {
            Error::InvalidPath(message) => assert!(message.contains("not a regular file")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
