/// Unit tests for the playability probe's heuristic path
use parrot_core::probe::{AudioProbe, ProbeConfig};
use std::fs;

fn heuristic_probe() -> AudioProbe {
    // No ffprobe binary: the header/size heuristic decides
    AudioProbe::new(ProbeConfig {
        ffprobe_bin: None,
        timeout_ms: 1_000,
        min_plausible_bytes: 1024,
    })
}

fn mp3_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    bytes[0] = 0xFF;
    bytes[1] = 0xFB;
    bytes
}

#[tokio::test]
async fn missing_file_is_not_playable() {
    let dir = tempfile::tempdir().unwrap();
    let probe = heuristic_probe();
    assert!(!probe.is_playable(&dir.path().join("nope.mp3")).await);
}

#[tokio::test]
async fn empty_file_is_not_playable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.mp3");
    fs::write(&path, []).unwrap();
    assert!(!heuristic_probe().is_playable(&path).await);
}

#[tokio::test]
async fn small_garbage_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.mp3");
    fs::write(&path, b"oops").unwrap();
    assert!(!heuristic_probe().is_playable(&path).await);
}

#[tokio::test]
async fn frame_sync_header_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sync.mp3");
    fs::write(&path, mp3_bytes(64)).unwrap();
    assert!(heuristic_probe().is_playable(&path).await);
}

#[tokio::test]
async fn id3_header_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tagged.mp3");
    let mut bytes = b"ID3".to_vec();
    bytes.resize(64, 0);
    fs::write(&path, bytes).unwrap();
    assert!(heuristic_probe().is_playable(&path).await);
}

#[tokio::test]
async fn large_headerless_file_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("headerless.mp3");
    fs::write(&path, vec![0u8; 4096]).unwrap();
    assert!(heuristic_probe().is_playable(&path).await);
}

#[tokio::test]
async fn small_headerless_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("short.mp3");
    fs::write(&path, vec![0u8; 512]).unwrap();
    assert!(!heuristic_probe().is_playable(&path).await);
}
