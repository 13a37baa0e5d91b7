//! System clipboard writes (X11 via xclip, Wayland via wl-clipboard), used
//! to paste text that cannot be typed key by key.

use log::{debug, warn};
use std::env;
use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClipboardBackend {
    Xclip,
    WlClipboard,
}

/// Detected once per process.
fn detect_backend() -> Option<ClipboardBackend> {
    static BACKEND: OnceLock<Option<ClipboardBackend>> = OnceLock::new();
    *BACKEND.get_or_init(|| {
        let backend = find_backend();
        debug!("clipboard backend: {:?}", backend);
        backend
    })
}

fn find_backend() -> Option<ClipboardBackend> {
    let session = env::var("XDG_SESSION_TYPE").unwrap_or_default().to_ascii_lowercase();
    let wayland_display = env::var("WAYLAND_DISPLAY").unwrap_or_default();
    if (!wayland_display.is_empty() || session == "wayland") && has_command("wl-copy") {
        return Some(ClipboardBackend::WlClipboard);
    }
    if has_command("xclip") {
        return Some(ClipboardBackend::Xclip);
    }
    None
}

/// Whether a clipboard tool is installed.
pub fn available() -> bool {
    detect_backend().is_some()
}

/// Place UTF-8 text on the clipboard. Returns false when no backend is
/// available or the helper could not be run.
pub fn write_text(text: &str) -> bool {
    let data = text.as_bytes();
    match detect_backend() {
        Some(ClipboardBackend::WlClipboard) => {
            pipe_into("wl-copy", &["--type", "text/plain;charset=utf-8"], data)
        }
        Some(ClipboardBackend::Xclip) => {
            pipe_into("xclip", &["-selection", "clipboard", "-i", "-t", "UTF8_STRING"], data)
        }
        None => false,
    }
}

fn pipe_into(program: &str, args: &[&str], data: &[u8]) -> bool {
    let mut child = match Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => child,
        Err(err) => {
            warn!("{} spawn failed: {}", program, err);
            return false;
        }
    };
    if let Some(mut stdin) = child.stdin.take() {
        if let Err(err) = stdin.write_all(data) {
            warn!("{} write failed: {}", program, err);
            drop(stdin);
            reap(&mut child);
            return false;
        }
    }
    match child.wait() {
        Ok(status) => status.success(),
        Err(err) => {
            warn!("{} wait failed: {}", program, err);
            false
        }
    }
}

fn reap(child: &mut Child) {
    if let Err(err) = child.kill() {
        debug!("kill failed: {}", err);
    }
    if let Err(err) = child.wait() {
        debug!("wait failed: {}", err);
    }
}

fn has_command(cmd: &str) -> bool {
    Command::new("sh")
        .arg("-lc")
        .arg(format!("command -v {} >/dev/null 2>&1", cmd))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
