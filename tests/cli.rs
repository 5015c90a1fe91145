//! The `agentd` binary: usage handling, `stop` without a daemon, and a
//! full `start` / `stop` round trip.

use std::path::Path;
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(15);

fn agentd(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_agentd"));
    cmd.arg("--home")
        .arg(home)
        .env_remove("RUST_LOG")
        .env_remove("AGENTD_HOME")
        .env_remove("AGENTD_PASSWORD");
    cmd
}

fn run(home: &Path, args: &[&str]) -> Output {
    agentd(home).args(args).output().unwrap()
}

/// Two distinct loopback ports that were free a moment ago.
fn free_ports() -> (u16, u16) {
    let a = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let b = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    (a.local_addr().unwrap().port(), b.local_addr().unwrap().port())
}

/// Write `<home>/conf/agent.toml` with loopback ports.
fn write_config(home: &Path, rpc_port: u16, control_port: u16) {
    let conf = home.join("conf");
    std::fs::create_dir_all(&conf).unwrap();
    std::fs::write(
        conf.join("agent.toml"),
        format!(
            "[rpc]\nbind_host = \"127.0.0.1\"\nport = {}\n\n[control]\nport = {}\n",
            rpc_port, control_port
        ),
    )
    .unwrap();
}

fn wait_with_deadline(child: &mut Child) -> ExitStatus {
    let deadline = Instant::now() + WAIT;
    loop {
        if let Some(status) = child.try_wait().unwrap() {
            return status;
        }
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("agentd did not exit within {:?}", WAIT);
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

#[test]
fn missing_or_unknown_command_prints_usage_and_succeeds() {
    let home = tempfile::tempdir().unwrap();

    for args in [&[][..], &["restart"][..], &["-x"][..]] {
        let out = run(home.path(), args);
        assert!(out.status.success(), "args {:?} exited with {}", args, out.status);

        let stdout = String::from_utf8_lossy(&out.stdout);
        assert!(stdout.contains("usage: agentd"), "args {:?} printed {}", args, stdout);
    }
    assert!(!home.path().join("agentd.pid").exists());
}

#[test]
fn stop_without_running_agent_fails() {
    let home = tempfile::tempdir().unwrap();
    let (rpc_port, control_port) = free_ports();
    write_config(home.path(), rpc_port, control_port);

    let out = run(home.path(), &["stop"]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn start_then_stop_exits_cleanly() {
    let home = tempfile::tempdir().unwrap();
    let (rpc_port, control_port) = free_ports();
    write_config(home.path(), rpc_port, control_port);
    let marker = home.path().join("agentd.pid");

    let mut daemon = agentd(home.path())
        .args(["start", "extra-arguments-are-ignored"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    // The marker is written before the control socket binds, so retry stop.
    let deadline = Instant::now() + WAIT;
    loop {
        if marker.exists() && run(home.path(), &["stop"]).status.success() {
            break;
        }
        if let Some(status) = daemon.try_wait().unwrap() {
            panic!("agentd exited early with {}", status);
        }
        if Instant::now() > deadline {
            let _ = daemon.kill();
            panic!("agentd never accepted the shutdown command");
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    let status = wait_with_deadline(&mut daemon);
    assert!(status.success(), "agentd exited with {}", status);
    assert!(!marker.exists());
    assert!(home.path().join(".password").exists());
}
