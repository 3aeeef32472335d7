//! Playability probe for generated audio files.
//!
//! Synthesis providers occasionally return empty or truncated payloads; this
//! gate keeps those from being served. It is a sanity check, not a decoder:
//! - Prefer `ffprobe` when a binary is available
//! - Fall back to a header/size heuristic when the probe cannot run
//! - Fail closed on missing, empty, or unreadable files
//!
//! Env overrides:
//! - FFPROBE_BIN
//! - PROBE_TIMEOUT_MS

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;

use tokio::task;
use tokio::time::{timeout, Duration};
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct ProbeConfig {
    /// ffprobe binary, if detected; `None` forces the heuristic fallback
    pub ffprobe_bin: Option<PathBuf>,
    /// Timeout for the external probe in milliseconds
    pub timeout_ms: u64,
    /// Headerless files still pass above this size
    pub min_plausible_bytes: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            ffprobe_bin: get_from_env_or_path("FFPROBE_BIN", "ffprobe"),
            timeout_ms: std::env::var("PROBE_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(10_000),
            min_plausible_bytes: 1024,
        }
    }
}

fn get_from_env_or_path(env_key: &str, default_bin: &str) -> Option<PathBuf> {
    if let Ok(p) = std::env::var(env_key) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Some(pb);
        }
    }
    get_from_path(default_bin)
}

fn get_from_path(bin: &str) -> Option<PathBuf> {
    if bin.contains(std::path::MAIN_SEPARATOR) {
        let p = PathBuf::from(bin);
        return if p.exists() { Some(p) } else { None };
    }
    if let Ok(paths) = std::env::var("PATH") {
        let path_separator = if cfg!(windows) { ';' } else { ':' };
        for dir in paths.split(path_separator) {
            let candidate = Path::new(dir).join(bin);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }
    None
}

pub struct AudioProbe {
    cfg: ProbeConfig,
}

impl AudioProbe {
    pub fn new(cfg: ProbeConfig) -> Self {
        if let Some(ref p) = cfg.ffprobe_bin {
            info!(target: "probe", bin = ?p, "Detected ffprobe binary");
        }
        Self { cfg }
    }

    pub fn from_env() -> Self {
        Self::new(ProbeConfig::default())
    }

    /// Best-effort check that `path` holds playable audio.
    ///
    /// Read-only; every I/O error is caught and treated as not playable.
    pub async fn is_playable(&self, path: &Path) -> bool {
        let len = match std::fs::metadata(path) {
            Ok(m) => m.len(),
            Err(_) => return false,
        };
        if len == 0 {
            return false;
        }

        if let Some(bin) = self.cfg.ffprobe_bin.clone() {
            match self.ffprobe_has_audio(bin, path.to_path_buf()).await {
                Ok(verdict) => return verdict,
                Err(e) => {
                    warn!(target: "probe", error = %e, "ffprobe unavailable; falling back to header heuristic");
                }
            }
        }

        self.sniff(path, len)
    }

    /// Run ffprobe on the blocking pool under a timeout. An `Err` here means
    /// the probe could not run at all, not that the file is bad.
    async fn ffprobe_has_audio(&self, bin: PathBuf, path: PathBuf) -> std::io::Result<bool> {
        let join = task::spawn_blocking(move || {
            Command::new(&bin)
                .arg("-v")
                .arg("error")
                .arg("-select_streams")
                .arg("a:0")
                .arg("-show_entries")
                .arg("stream=codec_name")
                .arg("-of")
                .arg("default=nw=1:nk=1")
                .arg(&path)
                .output()
        });
        match timeout(Duration::from_millis(self.cfg.timeout_ms), join).await {
            Ok(Ok(Ok(output))) => {
                let has_stream = !String::from_utf8_lossy(&output.stdout).trim().is_empty();
                Ok(output.status.success() && has_stream)
            }
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(e)) => Err(std::io::Error::new(std::io::ErrorKind::Other, e)),
            Err(_) => Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "ffprobe timed out",
            )),
        }
    }

    fn sniff(&self, path: &Path, len: u64) -> bool {
        let mut head = [0u8; 4];
        let n = match File::open(path).and_then(|mut f| f.read(&mut head)) {
            Ok(n) => n,
            Err(_) => return false,
        };
        if has_audio_header(&head[..n]) {
            return true;
        }
        len > self.cfg.min_plausible_bytes
    }
}

/// MP3 frame sync (11 set bits) or an ID3v2 tag at the start of the file
fn has_audio_header(head: &[u8]) -> bool {
    if head.len() >= 3 && &head[..3] == b"ID3" {
        return true;
    }
    head.len() >= 2 && head[0] == 0xFF && head[1] & 0xE0 == 0xE0
}
