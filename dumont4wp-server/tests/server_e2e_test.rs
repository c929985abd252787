#![allow(deprecated)] // Command::cargo_bin: the macro alternative requires a same-package binary

use assert_cmd::Command;
use predicates::str::contains;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::process::{Child, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

const ENV_VARS: [&str; 9] = [
    "DUMONT4WP_DATA_DIR",
    "DUMONT4WP_BIND_ADDR",
    "DUMONT4WP_PORT",
    "DUMONT4WP_SITE_ID",
    "DUMONT4WP_MULTISITE",
    "DUMONT4WP_MAIN_SITE_ID",
    "DUMONT4WP_CONTENT_TYPES",
    "DUMONT4WP_CONTENT_DIR",
    "DUMONT4WP_MAGIC_QUOTES",
];

// ---------------------------------------------------------------------------
// Helper: build a Command with all ambient env vars that could interfere
// cleaned out, so tests are hermetic regardless of the runner's environment.
// ---------------------------------------------------------------------------
fn dumont4wp_cmd() -> Command {
    let mut cmd = Command::cargo_bin("dumont4wp").unwrap();
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

struct RunningServer {
    child: Child,
    bind_addr: String,
}

impl RunningServer {
    fn spawn_auto_port(data_dir: &std::path::Path, extra_args: &[&str]) -> Self {
        let mut command = std::process::Command::new(env!("CARGO_BIN_EXE_dumont4wp"));
        command
            .arg("--auto-port")
            .arg("--data-dir")
            .arg(data_dir)
            .args(extra_args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for var in ENV_VARS {
            command.env_remove(var);
        }
        let mut child = command.spawn().expect("failed to spawn dumont4wp process");

        let bind_addr = wait_for_startup_bind_addr(&mut child, Duration::from_secs(10));
        wait_for_health(&bind_addr, Duration::from_secs(10));

        Self { child, bind_addr }
    }

    fn bind_addr(&self) -> &str {
        &self.bind_addr
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

struct HttpResponse {
    status: u16,
    body: String,
}

fn wait_for_startup_bind_addr(child: &mut Child, timeout: Duration) -> String {
    let stdout = child
        .stdout
        .take()
        .expect("child stdout should be piped for startup capture");
    let stderr = child
        .stderr
        .take()
        .expect("child stderr should be piped for startup capture");

    let (tx, rx) = mpsc::channel::<String>();
    spawn_pipe_reader(stdout, tx.clone());
    spawn_pipe_reader(stderr, tx);

    let start = Instant::now();
    let mut observed = Vec::new();
    loop {
        if let Some(status) = child
            .try_wait()
            .expect("failed checking dumont4wp child process status")
        {
            panic!(
                "dumont4wp exited before startup banner ({status}). output:\n{}",
                observed.join("\n")
            );
        }

        if start.elapsed() > timeout {
            panic!(
                "timed out waiting for startup banner after {:?}. output:\n{}",
                timeout,
                observed.join("\n")
            );
        }

        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(line) => {
                let clean = strip_ansi(&line);
                observed.push(clean.clone());
                if let Some(bind_addr) = extract_bind_addr_from_banner_line(&clean) {
                    return bind_addr;
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                panic!(
                    "startup output stream closed before bind address was observed. output:\n{}",
                    observed.join("\n")
                );
            }
        }
    }
}

fn spawn_pipe_reader<R: Read + Send + 'static>(reader: R, tx: mpsc::Sender<String>) {
    thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    let trimmed = line.trim_end_matches(['\r', '\n']).to_string();
                    if tx.send(trimmed).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
}

fn strip_ansi(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' && chars.peek() == Some(&'[') {
            chars.next();
            for c in chars.by_ref() {
                if c.is_ascii_alphabetic() {
                    break;
                }
            }
            continue;
        }
        out.push(c);
    }
    out
}

fn extract_bind_addr_from_banner_line(line: &str) -> Option<String> {
    if !line.contains("Local:") {
        return None;
    }
    let marker = "http://127.0.0.1:";
    let start = line.find(marker)?;
    let candidate = &line[start + "http://".len()..];
    let end = candidate
        .find(char::is_whitespace)
        .unwrap_or(candidate.len());
    Some(candidate[..end].trim_end_matches('/').to_string())
}

fn wait_for_health(bind_addr: &str, timeout: Duration) {
    let start = Instant::now();
    loop {
        if start.elapsed() > timeout {
            panic!(
                "timed out waiting for /health on {} after {:?}",
                bind_addr, timeout
            );
        }

        if let Ok(response) = http_request(bind_addr, "GET", "/health", None) {
            if response.status == 200 && response.body.contains("\"status\":\"ok\"") {
                return;
            }
        }

        thread::sleep(Duration::from_millis(50));
    }
}

fn http_request(
    bind_addr: &str,
    method: &str,
    path: &str,
    form: Option<&str>,
) -> Result<HttpResponse, String> {
    let body = form.unwrap_or("");
    let mut stream = TcpStream::connect(bind_addr)
        .map_err(|e| format!("failed to connect to {}: {}", bind_addr, e))?;
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .map_err(|e| format!("failed setting read timeout: {}", e))?;
    stream
        .set_write_timeout(Some(Duration::from_secs(2)))
        .map_err(|e| format!("failed setting write timeout: {}", e))?;

    let request = format!(
        "{method} {path} HTTP/1.0\r\nHost: {bind_addr}\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream
        .write_all(request.as_bytes())
        .map_err(|e| format!("failed writing request to {}: {}", bind_addr, e))?;

    let mut raw = Vec::new();
    stream
        .read_to_end(&mut raw)
        .map_err(|e| format!("failed reading response from {}: {}", bind_addr, e))?;

    let text = String::from_utf8_lossy(&raw);
    let (head, payload) = text
        .split_once("\r\n\r\n")
        .ok_or_else(|| format!("invalid HTTP response from {}: {}", bind_addr, text))?;
    let status_line = head
        .lines()
        .next()
        .ok_or_else(|| format!("missing HTTP status line from {}: {}", bind_addr, head))?;
    let status = status_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| format!("missing HTTP status code in line: {}", status_line))?
        .parse::<u16>()
        .map_err(|e| format!("invalid HTTP status in '{}': {}", status_line, e))?;

    Ok(HttpResponse {
        status,
        body: payload.to_string(),
    })
}

// ── CLI ──

#[test]
fn help_lists_configuration_flags() {
    dumont4wp_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("--data-dir"))
        .stdout(contains("--multisite"))
        .stdout(contains("--content-types"));
}

#[test]
fn invalid_site_id_is_rejected_before_start() {
    dumont4wp_cmd()
        .args(["--site-id", "../etc", "--auto-port"])
        .assert()
        .failure()
        .stderr(contains("--site-id accepts only"));
}

#[test]
fn auto_port_conflicts_with_port() {
    dumont4wp_cmd()
        .args(["--auto-port", "--port", "7801"])
        .assert()
        .failure()
        .stderr(contains("--auto-port cannot be combined with --bind-addr or --port"));
}

// ── running server ──

#[test]
fn settings_page_survives_restart() {
    let temp_dir = tempfile_dir("dumont4wp_e2e_restart");
    {
        let server = RunningServer::spawn_auto_port(temp_dir.path(), &[]);
        let page = http_request(server.bind_addr(), "GET", "/options", None).unwrap();
        assert_eq!(page.status, 200);
        assert!(page.body.contains(r#"value="localhost""#));

        let saved = http_request(
            server.bind_addr(),
            "POST",
            "/options",
            Some("action=update&settings%5Bdumont4wp_server%5D%5Binfo%5D%5Bsingle%5D%5Bhost%5D=search.example.com&settings%5Bdumont4wp_num_results%5D=25"),
        )
        .unwrap();
        assert_eq!(saved.status, 200);
        assert!(saved.body.contains("Success!"));
    }

    let record: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(temp_dir.path().join("sites/main/options.json")).unwrap(),
    )
    .unwrap();
    let settings = &record["plugin_dumont4wp_settings"];
    assert_eq!(settings["dumont4wp_num_results"], 25);
    assert_eq!(
        settings["dumont4wp_server"]["info"]["master"]["host"],
        "search.example.com"
    );

    let server = RunningServer::spawn_auto_port(temp_dir.path(), &[]);
    let page = http_request(server.bind_addr(), "GET", "/options", None).unwrap();
    assert!(page.body.contains(r#"value="search.example.com""#));
    assert!(page.body.contains(r#"value="25""#));
}

#[test]
fn multisite_stores_settings_in_network_scope() {
    let temp_dir = tempfile_dir("dumont4wp_e2e_network");
    let server = RunningServer::spawn_auto_port(temp_dir.path(), &["--multisite"]);
    let page = http_request(server.bind_addr(), "GET", "/options", None).unwrap();
    assert_eq!(page.status, 200);
    assert!(page.body.contains(r#"name="dumont4wp_init_blogs""#));
    assert!(temp_dir.path().join("network/options.json").exists());
}

/// Unique temp dir that is automatically removed on drop.
struct TempDir(std::path::PathBuf);

impl TempDir {
    fn path(&self) -> &std::path::Path {
        &self.0
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn tempfile_dir(name: &str) -> TempDir {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock should be after unix epoch")
        .as_nanos();
    let p = std::env::temp_dir().join(format!("{}_{}_{}", name, std::process::id(), nanos));
    let _ = std::fs::remove_dir_all(&p);
    std::fs::create_dir_all(&p).unwrap();
    TempDir(p)
}
