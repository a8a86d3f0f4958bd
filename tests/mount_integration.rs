//! Exercises the real `SyscallBackend` end-to-end: mounting increases
//! `/proc/mounts` by exactly N entries (one per registered path), and
//! unmounting restores the original count. Requires root and a private
//! mount namespace (`unshare --mount --map-root-user`), so it is gated
//! behind `--ignored` rather than run by default.

use std::fs;

use ilfs::mount::SyscallBackend;

fn mount_line_count() -> usize {
    fs::read_to_string("/proc/mounts").unwrap().lines().count()
}

#[test]
#[ignore = "requires root and a private mount namespace"]
fn mount_then_unmount_restores_proc_mounts_count() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    let data1 = dir.path().join("data1");
    let data2 = dir.path().join("data2");
    fs::create_dir_all(&src).unwrap();
    fs::create_dir_all(&data1).unwrap();
    fs::create_dir_all(&data2).unwrap();
    fs::create_dir_all(src.join("app")).unwrap();

    let treefile = format!(
        "src {}\ndata1 {}\ndata2 {}\n",
        src.display(),
        data1.display(),
        data2.display(),
    );
    let pathfile = "src /\ndata1 /app/data1 init=missing mkdir -p \"$ILFS_TREE_ROOT/$ILFS_RELPATH\"\ndata2 /app/data2 init=missing mkdir -p \"$ILFS_TREE_ROOT/$ILFS_RELPATH\"\n";

    let target = dir.path().join("target");
    fs::create_dir_all(&target).unwrap();

    let before = mount_line_count();

    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut backend = SyscallBackend;
    let vars: std::collections::HashMap<String, String> = std::collections::HashMap::new();
    rt.block_on(ilfs::session::mount_session(
        &mut backend,
        &target,
        &treefile,
        pathfile,
        &vars,
        ilfs::options::OptionSet::new(),
    ))
    .unwrap();

    assert_eq!(mount_line_count(), before + 3);

    ilfs::session::unmount(&mut backend, &target).unwrap();
    assert_eq!(mount_line_count(), before);
}
