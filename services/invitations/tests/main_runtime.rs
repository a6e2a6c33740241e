use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

fn invitations_command() -> Command {
    let bin = std::env::var("CARGO_BIN_EXE_invitations").unwrap_or_else(|_| {
        let current = std::env::current_exe().expect("current exe");
        let debug_dir = current
            .parent()
            .and_then(|p| p.parent())
            .expect("target debug dir");
        debug_dir.join("invitations").to_string_lossy().to_string()
    });
    let mut cmd = Command::new(bin);
    cmd.env_remove("INVITATIONS_CONFIG")
        .env_remove("INVITATIONS_POSTGRES_URL")
        .env_remove("INVITATIONS_SEED_FILE")
        .env_remove("OTEL_EXPORTER_OTLP_ENDPOINT")
        .env("INVITATIONS_BIND", "127.0.0.1:0")
        .env("INVITATIONS_METRICS_BIND", "127.0.0.1:0")
        .env("INVITATIONS_STORAGE_BACKEND", "memory")
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    cmd
}

fn stop_with_sigint(child: &mut Child) {
    let pid = child.id().to_string();
    let status = Command::new("kill")
        .arg("-INT")
        .arg(pid)
        .status()
        .expect("send SIGINT");
    assert!(status.success());
}

fn wait_for_exit(child: &mut Child, timeout: Duration) -> ExitStatus {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().expect("try_wait") {
            return status;
        }
        if Instant::now() >= deadline {
            child.kill().expect("kill on timeout");
            return child.wait().expect("wait after kill");
        }
        std::thread::sleep(Duration::from_millis(25));
    }
}

#[test]
fn binary_starts_and_stops_on_sigint() {
    let mut child = invitations_command().spawn().expect("spawn invitations");
    std::thread::sleep(Duration::from_millis(250));
    stop_with_sigint(&mut child);
    let status = wait_for_exit(&mut child, Duration::from_secs(3));
    assert!(status.success());
}

#[test]
fn binary_seeds_demo_guest_list_and_stops_on_sigint() {
    let seed = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos/guests.yaml");
    let mut child = invitations_command()
        .env("INVITATIONS_SEED_FILE", seed)
        .spawn()
        .expect("spawn invitations");
    std::thread::sleep(Duration::from_millis(300));
    stop_with_sigint(&mut child);
    let status = wait_for_exit(&mut child, Duration::from_secs(3));
    assert!(status.success());
}

#[test]
fn binary_exits_with_error_on_unknown_backend() {
    let mut child = invitations_command()
        .env("INVITATIONS_STORAGE_BACKEND", "firestore")
        .spawn()
        .expect("spawn invitations");
    let status = wait_for_exit(&mut child, Duration::from_secs(3));
    assert!(!status.success());
}
