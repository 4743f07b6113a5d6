//! Drives the binary through a full compile, run and restart cycle using
//! `sh` as the runtime and a copying transform.
#![cfg(unix)]

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const CONFIG: &str = r#"
root_file = "index.sh"
runtime = "sh"

[watch]
extensions = ["sh"]
target_extension = "sh"
clear_screen = false

[transform]
command = ""
"#;

struct Running {
    child: Child,
    lines: mpsc::Receiver<String>,
}

impl Running {
    fn start(dir: &Path) -> Self {
        let mut child = Command::new(env!("CARGO_BIN_EXE_hotrun"))
            .current_dir(dir)
            .env_remove("RUST_LOG")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to start hotrun");

        let stdout = child.stdout.take().unwrap();
        let (tx, lines) = mpsc::channel();
        std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        Self { child, lines }
    }

    /// Wait for a stdout line containing `needle`.
    fn expect_line(&self, needle: &str) -> String {
        let deadline = Instant::now() + Duration::from_secs(20);
        let mut seen = Vec::new();
        while let Some(left) = deadline.checked_duration_since(Instant::now()) {
            match self.lines.recv_timeout(left) {
                Ok(line) if line.contains(needle) => return line,
                Ok(line) => seen.push(line),
                Err(_) => break,
            }
        }
        panic!("no line containing {needle:?}, got: {seen:#?}");
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[test]
fn test_compiles_runs_and_restarts_on_change() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    std::fs::write(root.join("hotrun.toml"), CONFIG).unwrap();
    std::fs::create_dir_all(root.join("src")).unwrap();
    std::fs::write(root.join("src/index.sh"), "echo running v1\n").unwrap();

    let running = Running::start(root);

    let status = running.expect_line("Successfully compiled 1 files");
    assert!(status.starts_with('['), "status line: {status}");
    running.expect_line("running v1");
    assert!(root.join("dist/index.sh").is_file());

    std::fs::write(root.join("src/index.sh"), "echo running v2\n").unwrap();

    running.expect_line("index.sh changed");
    running.expect_line("running v2");
    assert_eq!(
        std::fs::read_to_string(root.join("dist/index.sh")).unwrap(),
        "echo running v2\n"
    );
}

#[test]
fn test_new_file_is_compiled_into_output_tree() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    std::fs::write(root.join("hotrun.toml"), CONFIG).unwrap();
    std::fs::create_dir_all(root.join("src/lib")).unwrap();
    std::fs::write(root.join("src/index.sh"), "echo ready\n").unwrap();

    let running = Running::start(root);
    running.expect_line("Successfully compiled 1 files");
    running.expect_line("ready");

    std::fs::write(root.join("src/lib/util.sh"), "echo util\n").unwrap();

    running.expect_line("util.sh");
    let deadline = Instant::now() + Duration::from_secs(10);
    while !root.join("dist/lib/util.sh").is_file() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(50));
    }
    assert!(root.join("dist/lib/util.sh").is_file());
}

#[test]
fn test_compile_error_is_printed_with_status_lines() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let config = CONFIG.replace(
        "command = \"\"",
        "command = \"sh\"\nargs = [\"-c\", \"echo 'Unexpected token (1:6)' >&2; exit 1\"]",
    );
    std::fs::write(root.join("hotrun.toml"), config).unwrap();
    std::fs::create_dir_all(root.join("src")).unwrap();
    std::fs::write(root.join("src/index.sh"), "echo never\n").unwrap();

    let running = Running::start(root);

    running.expect_line("Initial compilation failed");
    let detail = running.expect_line("Unexpected token (1:6)");
    assert!(detail.contains("index.sh"), "detail line: {detail}");
    assert!(!root.join("dist/index.sh").exists());
}
