#![cfg(unix)]

use std::path::Path;
use std::process::Command;
use std::time::{Duration, Instant};

fn worksync() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_worksync"));
    command.env_remove("RUST_LOG");
    command
}

#[test]
fn missing_ui_program_exits_with_127() {
    let dir = tempfile::tempdir().expect("tempdir");

    let status = worksync()
        .current_dir(dir.path())
        .args([
            "--sync-program",
            "/bin/true",
            "--ui-program",
            "/nonexistent/streamlit",
        ])
        .status()
        .expect("run worksync");

    assert_eq!(status.code(), Some(127));
}

#[test]
fn ui_exit_code_becomes_supervisor_exit_code() {
    let dir = tempfile::tempdir().expect("tempdir");

    // The UI command is `<ui-program> run <app> ...`, so `/bin/sh` executes
    // the file named `run` in the working directory.
    std::fs::write(dir.path().join("run"), "exit 7\n").expect("write fake ui");

    let status = worksync()
        .current_dir(dir.path())
        .args(["launch", "--sync-program", "/bin/true", "--ui-program", "/bin/sh"])
        .status()
        .expect("run worksync");

    assert_eq!(status.code(), Some(7));
}

fn wait_for_file(path: &Path, limit: Duration) -> String {
    let deadline = Instant::now() + limit;
    loop {
        if let Ok(contents) = std::fs::read_to_string(path)
            && !contents.trim().is_empty()
        {
            return contents;
        }
        assert!(Instant::now() < deadline, "{} never appeared", path.display());
        std::thread::sleep(Duration::from_millis(20));
    }
}

fn process_alive(pid: libc::pid_t) -> bool {
    unsafe { libc::kill(pid, 0) == 0 }
}

#[test]
fn interrupt_stops_supervisor_with_130_and_terminates_sync_server() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pid_file = dir.path().join("sync.pid");
    let sync_script = dir.path().join("sync.sh");
    std::fs::write(
        &sync_script,
        format!("echo $$ > '{}'\nexec sleep 30\n", pid_file.display()),
    )
    .expect("write fake sync server");
    std::fs::write(dir.path().join("run"), "exec sleep 30\n").expect("write fake ui");

    let mut child = worksync()
        .current_dir(dir.path())
        .arg("launch")
        .arg("--sync-program")
        .arg("/bin/sh")
        .arg("--sync-script")
        .arg(&sync_script)
        .args(["--ui-program", "/bin/sh"])
        .spawn()
        .expect("start worksync");

    // Signal handlers are installed before the sync server is spawned.
    let sync_pid: libc::pid_t = wait_for_file(&pid_file, Duration::from_secs(10))
        .trim()
        .parse()
        .expect("sync pid");
    assert!(process_alive(sync_pid));

    let worksync_pid = libc::pid_t::try_from(child.id()).expect("pid fits");
    assert_eq!(unsafe { libc::kill(worksync_pid, libc::SIGINT) }, 0);

    let status = child.wait().expect("wait for worksync");
    assert_eq!(status.code(), Some(130));
    assert!(!process_alive(sync_pid), "sync server {sync_pid} survived");
}

#[test]
fn dump_of_missing_database_fails_and_creates_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("typo.db");

    let output = worksync()
        .arg("dump")
        .arg("--db")
        .arg(&db)
        .output()
        .expect("run worksync");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
    assert!(!db.exists());
}

#[test]
fn dump_prints_empty_array_for_fresh_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("workflow_system.db");
    // An empty file is a valid, empty SQLite database.
    std::fs::write(&db, b"").expect("create database file");

    let output = worksync()
        .arg("dump")
        .arg("--db")
        .arg(&db)
        .output()
        .expect("run worksync");

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "[]");
}

#[test]
fn dump_of_unknown_user_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("workflow_system.db");
    std::fs::write(&db, b"").expect("create database file");

    let output = worksync()
        .args(["dump", "--user", "ghost", "--db"])
        .arg(&db)
        .output()
        .expect("run worksync");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no stored state for user 'ghost'"));
}
