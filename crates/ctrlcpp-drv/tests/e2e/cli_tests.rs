//! CLI end-to-end tests for the `ctrlcpp` binary: no flag grammar, a fixed
//! positional root-file-then-include-dirs argument list.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn ctrlcpp_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_ctrlcpp"))
}

fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn no_arguments_is_a_usage_error() {
    let mut cmd = Command::new(ctrlcpp_bin());
    cmd.assert().failure().code(3);
}

#[test]
fn preprocesses_a_simple_file_to_stdout() {
    let dir = TempDir::new().unwrap();
    let main = write_file(&dir, "main.ctl", "global int x = 1;\n");

    let mut cmd = Command::new(ctrlcpp_bin());
    cmd.arg(&main);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("global int x = 1 ;"));
}

#[test]
fn missing_root_file_fails_with_diagnostic_on_stderr() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.ctl");

    let mut cmd = Command::new(ctrlcpp_bin());
    cmd.arg(&missing);

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error"));
}

#[test]
fn error_directive_fails_the_run() {
    let dir = TempDir::new().unwrap();
    let main = write_file(&dir, "main.ctl", "#error boom\n");

    let mut cmd = Command::new(ctrlcpp_bin());
    cmd.arg(&main);

    cmd.assert().failure().code(1);
}

#[test]
fn include_dir_argument_resolves_angle_bracket_headers() {
    // A non-`.ctl` source takes the generic (non-CTRL) resolution branch,
    // which appends the bare header name to each configured include
    // directory; the `.ctl`-specific `scripts/libs/` search has its own
    // coverage in `ctrlcpp-pp`'s unit tests.
    let dir = TempDir::new().unwrap();
    let libs = dir.path().join("libs");
    std::fs::create_dir(&libs).unwrap();
    std::fs::write(libs.join("shared.h"), "int shared_value = 7;\n").unwrap();
    let main = write_file(&dir, "main.c", "#include <shared.h>\n");

    let mut cmd = Command::new(ctrlcpp_bin());
    cmd.arg(&main).arg(&libs);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("shared_value"));
}
