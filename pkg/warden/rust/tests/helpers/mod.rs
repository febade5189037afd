// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

#![allow(dead_code)]

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use serde_json::{Value, json};
use std::io::{BufRead, BufReader, Read};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// One time unit in milliseconds: boot grace 600ms, cycle 1.2s, stop grace 300ms.
const TIME_UNIT_MS: &str = "10";

/// Shell command of a fake game server: records its pid, then idles.
pub const SERVER_SCRIPT: &str = "echo $$ >> starts; exec sleep 300";

fn command(args: &[&str], steamcmd: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_warden"));
    cmd.args(args)
        .env("WARDEN_STEAMCMD", steamcmd)
        .env("WARDEN_TIME_UNIT_MS", TIME_UNIT_MS)
        .env_remove("WARDEN_LOG_LEVEL")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

fn forward<R: Read + Send + 'static>(
    stream: R,
    label: &'static str,
    lines: Arc<Mutex<Vec<String>>>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        for line in BufReader::new(stream).lines() {
            match line {
                Ok(l) => {
                    eprintln!("[{label}] {l}");
                    lines.lock().unwrap().push(l);
                }
                Err(_) => break,
            }
        }
    })
}

/// Handle to a running `warden` process.
pub struct WardenHandle {
    child: Child,
    log_lines: Arc<Mutex<Vec<String>>>,
    _stdout_thread: std::thread::JoinHandle<()>,
    _stderr_thread: std::thread::JoinHandle<()>,
}

impl WardenHandle {
    pub fn start(args: &[&str], steamcmd: &Path) -> Self {
        let mut child = command(args, steamcmd)
            .spawn()
            .expect("failed to start warden");

        let stdout = child.stdout.take().expect("failed to capture stdout");
        let stderr = child.stderr.take().expect("failed to capture stderr");
        let log_lines = Arc::new(Mutex::new(Vec::<String>::new()));

        Self {
            child,
            _stdout_thread: forward(stdout, "warden", Arc::clone(&log_lines)),
            _stderr_thread: forward(stderr, "warden:err", Arc::clone(&log_lines)),
            log_lines,
        }
    }

    /// Wait until a log line containing `pattern` appears, or timeout.
    pub fn wait_for_log(&self, pattern: &str, timeout: Duration) -> bool {
        self.wait_for_log_count(pattern, 1, timeout)
    }

    pub fn wait_for_log_default(&self, pattern: &str) -> bool {
        self.wait_for_log(pattern, DEFAULT_TIMEOUT)
    }

    pub fn count_log_matches(&self, pattern: &str) -> usize {
        let lines = self.log_lines.lock().unwrap();
        lines.iter().filter(|l| l.contains(pattern)).count()
    }

    /// Wait until the count of log lines matching `pattern` reaches at least `n`.
    pub fn wait_for_log_count(&self, pattern: &str, n: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.count_log_matches(pattern) >= n {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    pub fn send_signal(&self, sig: Signal) {
        let pid = i32::try_from(self.child.id()).unwrap();
        signal::kill(Pid::from_raw(pid), sig).expect("failed to send signal to warden");
    }

    /// Send SIGTERM and wait for warden to exit.
    pub fn stop(&mut self) -> ExitStatus {
        self.send_signal(Signal::SIGTERM);
        self.wait_with_timeout(DEFAULT_TIMEOUT)
    }

    /// Wait for warden to exit; kills it once `timeout` has passed.
    pub fn wait_with_timeout(&mut self, timeout: Duration) -> ExitStatus {
        let deadline = Instant::now() + timeout;
        loop {
            match self.child.try_wait().expect("failed to check warden status") {
                Some(status) => return status,
                None => {
                    if Instant::now() >= deadline {
                        self.child.kill().ok();
                        return self.child.wait().expect("failed to wait on killed warden");
                    }
                    std::thread::sleep(Duration::from_millis(20));
                }
            }
        }
    }

    /// PIDs from "Process started (pid=NNN)" log lines.
    pub fn started_pids(&self) -> Vec<u32> {
        let lines = self.log_lines.lock().unwrap();
        lines
            .iter()
            .filter_map(|l| {
                let (_, rest) = l.split_once("Process started (pid=")?;
                let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
                digits.parse().ok()
            })
            .collect()
    }
}

impl Drop for WardenHandle {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Run a one-shot warden command to completion; returns its status and log.
pub fn run_once(args: &[&str], steamcmd: &Path) -> (ExitStatus, String) {
    let output = command(args, steamcmd)
        .output()
        .expect("failed to run warden");
    let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
    log.push_str(&String::from_utf8_lossy(&output.stderr));
    eprintln!("{log}");
    (output.status, log)
}

/// Fake SteamCMD. Every call is appended to `<dir>/steamcmd-calls`; status
/// queries print `install_state` and exit `check_exit`, everything else exits
/// `apply_exit`.
pub struct FakeSteamCmd {
    pub path: PathBuf,
    calls: PathBuf,
}

impl FakeSteamCmd {
    pub fn new(dir: &Path, install_state: &str, check_exit: i32, apply_exit: i32) -> Self {
        let path = dir.join("steamcmd");
        let calls = dir.join("steamcmd-calls");
        let script = format!(
            "#!/bin/sh\n\
             echo \"$@\" >> '{calls}'\n\
             case \"$*\" in\n\
               *+app_status*) echo ' - install state: {install_state}'; exit {check_exit} ;;\n\
               *) echo 'Success! App fully installed.'; exit {apply_exit} ;;\n\
             esac\n",
            calls = calls.display(),
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        Self { path, calls }
    }

    /// Reports no update; every call succeeds.
    pub fn up_to_date(dir: &Path) -> Self {
        Self::new(dir, "Fully Installed,", 0, 0)
    }

    pub fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(&self.calls)
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn apply_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.contains("+app_update"))
            .count()
    }
}

/// A runnable instance rooted at `dir` (created if missing).
pub fn instance(dir: &Path, package_id: &str) -> Value {
    std::fs::create_dir_all(dir.join("data")).unwrap();
    std::fs::write(dir.join("data/world.sav"), "save").unwrap();
    json!({
        "app_id": package_id,
        "command": ["/bin/sh", "-c", SERVER_SCRIPT],
        "working_directory": dir,
        "environment": {"SERVER_MODE": "dedicated"},
        "backup": {
            "location": dir.join("backups"),
            "data": [dir.join("data")],
        },
    })
}

/// Write a JSON config file mapping instance names to instances.
pub fn write_config(dir: &Path, instances: &[(&str, Value)]) -> PathBuf {
    let config: serde_json::Map<String, Value> = instances
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect();
    let path = dir.join("servers.json");
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap())
        .unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));
    path
}

/// Pids recorded by the fake server started in `dir`.
pub fn recorded_starts(dir: &Path) -> Vec<u32> {
    std::fs::read_to_string(dir.join("starts"))
        .map(|s| s.lines().filter_map(|l| l.trim().parse().ok()).collect())
        .unwrap_or_default()
}

pub fn pid_is_alive(pid: u32) -> bool {
    signal::kill(Pid::from_raw(i32::try_from(pid).unwrap()), None).is_ok()
}

/// Wait until a PID is no longer alive, or timeout.
pub fn wait_for_pid_gone(pid: u32, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if !pid_is_alive(pid) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

/// Backups are only taken once the local hour reaches the blackout end.
pub fn backups_allowed_now() -> bool {
    use chrono::Timelike;
    chrono::Local::now().hour() >= warden::backup::BLACKOUT_END_HOUR
}
