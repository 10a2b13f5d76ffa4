use std::path::PathBuf;
use std::process::Command;

use feedd::ipc::{LISTENER_CAPACITY, ListenerPool};
use tokio::net::UnixListener;

const CHILD_DIR_VAR: &str = "FEEDD_POOL_OVERFLOW_DIR";

/// Registers one listener more than the pool holds. Only runs inside the
/// child process spawned by `ninth_listener_exits_process`.
async fn overflow(dir: PathBuf) {
    let pool = ListenerPool::new(LISTENER_CAPACITY);
    for n in 0..=LISTENER_CAPACITY {
        let path = dir.join(format!("{}.sock", n));
        let listener = UnixListener::bind(&path).unwrap();
        pool.register(path, listener);
    }
    panic!("registering past capacity did not exit");
}

#[tokio::test]
async fn ninth_listener_exits_process() {
    if let Some(dir) = std::env::var_os(CHILD_DIR_VAR) {
        overflow(PathBuf::from(dir)).await;
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let status = Command::new(std::env::current_exe().unwrap())
        .args(["ninth_listener_exits_process", "--exact", "--nocapture"])
        .env(CHILD_DIR_VAR, dir.path())
        .status()
        .unwrap();

    assert!(!status.success());
    assert_eq!(status.code(), Some(1));

    // Every socket, including the rejected one, was closed and unlinked.
    let leftover: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert!(leftover.is_empty(), "leftover sockets: {:?}", leftover);
}
