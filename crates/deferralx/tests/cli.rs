use std::process::{Command, Output};

fn deferralx(args: &[&str], unhandled_env: Option<&str>) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_deferralx"));
    cmd.args(args)
        .env("NO_COLOR", "1")
        .env("CLICOLOR", "0")
        .env_remove("DEFERRAL_LOG")
        .env_remove("DEFERRAL_UNHANDLED_REJECTIONS");
    if let Some(value) = unhandled_env {
        cmd.env("DEFERRAL_UNHANDLED_REJECTIONS", value);
    }
    cmd.output().unwrap()
}

#[test]
fn invalid_env_mode_falls_back_and_still_runs() {
    let out = deferralx(&["immediate", "--value", "1"], Some("bogus"));
    assert!(out.status.success(), "{out:?}");
    assert!(String::from_utf8_lossy(&out.stdout).contains("fulfilled: 1"));
    assert!(String::from_utf8_lossy(&out.stderr).contains("falling back to warn"));
}

#[test]
fn valid_env_mode_is_accepted() {
    let out = deferralx(&["immediate", "--value", "1"], Some("strict"));
    assert!(out.status.success(), "{out:?}");
    assert!(String::from_utf8_lossy(&out.stdout).contains("fulfilled: 1"));
}

#[test]
fn invalid_flag_mode_is_a_usage_error() {
    let out = deferralx(&["--unhandled", "bogus", "immediate"], None);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn missing_path_exits_two() {
    let out = deferralx(&["stat", "/does/not/exist"], None);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr)
        .contains("ENOENT: no such file or directory, stat '/does/not/exist'"));
}
