//! CLI-level behavior: exit codes, `--help`, and `-i` (initializers-only)
//! dry run. Exercised through the compiled binary with `assert_cmd`, the
//! way `MiBTaz-ncd` tests its own CLI surface.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

#[test]
fn help_exits_zero() {
    Command::cargo_bin("ilfs")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("TARGET"));
}

#[test]
fn missing_treefile_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("ilfs")
        .unwrap()
        .arg("--pathfile")
        .arg(dir.path().join("paths.txt"))
        .arg(dir.path().join("target").to_str().unwrap())
        .assert()
        .failure()
        .code(1);
}

#[test]
fn init_only_runs_initializers_without_mounting() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    let data = dir.path().join("data");
    fs::create_dir_all(&src).unwrap();
    fs::create_dir_all(&data).unwrap();

    let treefile = dir.path().join("trees.txt");
    fs::write(
        &treefile,
        format!(
            "src {}\ndata {}\n",
            src.display(),
            data.display()
        ),
    )
    .unwrap();

    let pathfile = dir.path().join("paths.txt");
    fs::write(
        &pathfile,
        "src /\ndata /app/data init=missing mkdir -p \"$ILFS_TREE_ROOT/$ILFS_RELPATH\"\n",
    )
    .unwrap();

    let target = dir.path().join("target");
    fs::create_dir_all(&target).unwrap();

    Command::cargo_bin("ilfs")
        .unwrap()
        .arg("-i")
        .arg("--treefile")
        .arg(&treefile)
        .arg("--pathfile")
        .arg(&pathfile)
        .arg(&target)
        .assert()
        .success();

    assert!(data.join("app/data").is_dir());
}
