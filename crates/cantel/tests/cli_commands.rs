#![cfg(feature = "cli")]

use std::net::UdpSocket;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn cantel() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_cantel"));
    cmd.arg("--log-level").arg("error");
    cmd
}

fn free_udp_port() -> u16 {
    UdpSocket::bind("127.0.0.1:0")
        .and_then(|socket| socket.local_addr())
        .expect("ephemeral port should be available")
        .port()
}

fn json_lines(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("each line should be json"))
        .collect()
}

#[test]
fn signals_lists_the_table() {
    let output = cantel()
        .args(["--format", "json", "signals"])
        .output()
        .expect("signals should run");

    assert!(output.status.success());
    let rows = json_lines(&output.stdout);
    let table = rows[0].as_array().expect("signals should emit an array");
    assert_eq!(table.len(), 6);
    assert_eq!(table[0]["key"], "rpm");
    assert_eq!(table[0]["id"], 0x100);
    assert_eq!(table[5]["kind"], "bitmask");
}

#[test]
fn decode_rpm_frame() {
    let output = cantel()
        .args(["--format", "json", "decode", "0x100", "05DC"])
        .output()
        .expect("decode should run");

    assert!(output.status.success());
    let lines = json_lines(&output.stdout);
    assert_eq!(lines[0]["result"], "decoded");
    assert_eq!(lines[0]["value"], 1500.0);
    assert_eq!(lines[0]["display"], "1500.00 RPM");
    assert_eq!(lines[0]["raw"], "05 DC");
}

#[test]
fn decode_fault_frame_by_key() {
    let output = cantel()
        .args(["--format", "json", "decode", "faults", "05"])
        .output()
        .expect("decode should run");

    assert!(output.status.success());
    let lines = json_lines(&output.stdout);
    assert_eq!(lines[0]["display"], "OVERHEAT | UNDERVOLTAGE");
    assert_eq!(lines[0]["raw"], "00 05");
}

#[test]
fn decode_unknown_and_malformed_exit_60() {
    let unknown = cantel()
        .args(["--format", "json", "decode", "0x200", "0102"])
        .output()
        .expect("decode should run");
    assert_eq!(unknown.status.code(), Some(60));
    assert_eq!(json_lines(&unknown.stdout)[0]["result"], "unknown_id");

    let malformed = cantel()
        .args(["--format", "json", "decode", "0x101", "01"])
        .output()
        .expect("decode should run");
    assert_eq!(malformed.status.code(), Some(60));
    let line = &json_lines(&malformed.stdout)[0];
    assert_eq!(line["result"], "malformed");
    assert_eq!(line["len"], 1);
}

#[test]
fn decode_rejects_bad_hex_with_usage() {
    let output = cantel()
        .args(["decode", "0x100", "5DC"])
        .output()
        .expect("decode should run");
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn send_out_of_range_exits_60_without_sending() {
    let output = cantel()
        .args(["send", "rpm", "70000", "--to", "127.0.0.1:9"])
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(60));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("out of range"), "stderr: {stderr}");
}

#[test]
fn send_unknown_signal_is_usage_error() {
    let output = cantel()
        .args(["send", "pressure", "1", "--to", "127.0.0.1:9"])
        .output()
        .expect("send should run");
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn send_delivers_one_datagram() {
    let receiver = UdpSocket::bind("127.0.0.1:0").expect("receiver should bind");
    receiver
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("timeout should apply");
    let dest = receiver.local_addr().expect("receiver has an address");

    let output = cantel()
        .args(["--format", "json", "send", "temperature", "-4.5", "--to"])
        .arg(dest.to_string())
        .output()
        .expect("send should run");
    assert!(output.status.success());
    assert_eq!(json_lines(&output.stdout)[0]["payload"], "FF D3");

    let mut buf = [0u8; 16];
    let (len, _) = receiver.recv_from(&mut buf).expect("datagram should arrive");
    assert_eq!(&buf[..len], &[0x01, 0x01, 0xFF, 0xD3]);
}

#[test]
fn listen_stops_after_count_and_reports_rejects() {
    let port = free_udp_port();
    let child = cantel()
        .args(["--format", "json", "listen", "--no-multicast", "--interval", "10s"])
        .args(["--count", "3", "--duration", "20s", "--bind"])
        .arg(format!("127.0.0.1:{port}"))
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("listen should start");

    let sender = UdpSocket::bind("127.0.0.1:0").expect("sender should bind");
    let target = format!("127.0.0.1:{port}");
    let start = Instant::now();
    let child_id = child.id();
    let waiter = thread::spawn(move || child.wait_with_output());

    while !waiter.is_finished() && start.elapsed() < Duration::from_secs(15) {
        let _ = sender.send_to(&[0x02, 0x00, 0xAA], &target);
        let _ = sender.send_to(&[0x01, 0x00, 0x05, 0xDC], &target);
        thread::sleep(Duration::from_millis(50));
    }

    let output = waiter
        .join()
        .expect("waiter should not panic")
        .unwrap_or_else(|err| panic!("listen {child_id} failed: {err}"));
    assert!(output.status.success());

    let lines = json_lines(&output.stdout);
    let summary = lines.last().expect("summary line");
    assert_eq!(summary["type"], "summary");
    assert_eq!(summary["reason"], "frame_limit");
    assert_eq!(summary["diagnostics"]["decoded"], 3);
    assert!(summary["diagnostics"]["unknown_id"].as_u64().unwrap_or(0) >= 1);
    assert_eq!(summary["recorded"], 3);

    let dashboard = &lines[lines.len() - 2];
    assert_eq!(dashboard["type"], "dashboard");
    assert_eq!(dashboard["signals"][0]["display"], "1500.00 RPM");
}

#[test]
fn version_prints_package_version() {
    let output = cantel().arg("version").output().expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("cantel {}", env!("CARGO_PKG_VERSION")));
}
