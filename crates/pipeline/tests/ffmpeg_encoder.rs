//! Drives `FfmpegEncoder` against a stand-in shell script that accepts the
//! same argument layout as ffmpeg.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use recpost_common::config::EncoderConfig;
use recpost_common::error::RecpostError;
use recpost_pipeline::transcode::{Encoder, FfmpegEncoder, Transcoder};

// $1=-i $2=input $3=-vcodec $4=codec $5=-crf $6=crf $7=-y $8=output
const FAKE_FFMPEG: &str = r#"#!/bin/sh
case "$1" in
  -version) exit 0 ;;
esac
case "$(basename "$2")" in
  *fail*) echo "Invalid data found when processing input" >&2; exit 69 ;;
  *hang*) sleep 5 ;;
esac
printf '%s|%s|%s' "$4" "$6" "$(cat "$2")" > "$8"
"#;

/// Written once, before any test spawns a process, so no concurrent fork
/// can hold the script open for writing when it is executed.
fn install_fake() -> &'static Path {
    static SCRIPT: OnceLock<(tempfile::TempDir, PathBuf)> = OnceLock::new();
    let (_, script) = SCRIPT.get_or_init(|| {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-ffmpeg");
        fs::write(&script, FAKE_FFMPEG).unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        (dir, script)
    });
    script
}

fn encoder(script: &Path, timeout_secs: Option<u64>) -> FfmpegEncoder {
    FfmpegEncoder::new(EncoderConfig {
        program: script.to_string_lossy().into_owned(),
        timeout_secs,
        ..EncoderConfig::default()
    })
}

#[tokio::test]
async fn successful_encode_passes_codec_and_crf() {
    let dir = tempfile::tempdir().unwrap();
    let script = install_fake();
    let input = dir.path().join("clip.mp4");
    let output = dir.path().join("out.mp4");
    fs::write(&input, "raw").unwrap();

    encoder(script, None).encode(&input, &output).await.unwrap();

    assert_eq!(fs::read_to_string(&output).unwrap(), "libx264|23|raw");
}

#[tokio::test]
async fn non_zero_exit_reports_code_and_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let script = install_fake();
    let input = dir.path().join("will-fail.mp4");
    fs::write(&input, "raw").unwrap();

    let err = encoder(script, None)
        .encode(&input, &dir.path().join("out.mp4"))
        .await
        .unwrap_err();

    assert_eq!(err.exit_code(), Some(69));
    assert!(err.to_string().contains("Invalid data found"));
}

#[tokio::test]
async fn missing_program_is_a_spawn_failure() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("no-such-encoder");

    let err = encoder(&missing, None)
        .encode(&dir.path().join("a.mp4"), &dir.path().join("b.mp4"))
        .await
        .unwrap_err();

    assert!(matches!(err, RecpostError::Spawn { .. }));
    let absent = encoder(&missing, None);
    assert!(!absent.is_available().await);
    assert_eq!(absent.config().program, missing.to_string_lossy());
}

#[tokio::test]
async fn hung_encoder_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let script = install_fake();
    let input = dir.path().join("hang.mp4");
    fs::write(&input, "raw").unwrap();

    let err = encoder(script, Some(1))
        .encode(&input, &dir.path().join("out.mp4"))
        .await
        .unwrap_err();

    assert!(matches!(err, RecpostError::Timeout { secs: 1, .. }));
}

#[tokio::test]
async fn batch_with_failing_middle_input_reports_two_of_three() {
    let dir = tempfile::tempdir().unwrap();
    let script = install_fake();
    let src = dir.path().join("screenshots");
    let out = dir.path().join("output");
    fs::create_dir_all(&src).unwrap();
    let inputs: Vec<PathBuf> = ["one.mp4", "two-fail.mp4", "three.mp4"]
        .iter()
        .map(|name| {
            let path = src.join(name);
            fs::write(&path, name).unwrap();
            path
        })
        .collect();

    let transcoder = Transcoder::new(encoder(script, None), &out);
    assert!(transcoder.encoder().is_available().await);
    let report = transcoder.transcode_all(&inputs).await;

    assert_eq!(report.to_string(), "2/3");
    assert!(!inputs[0].exists());
    assert!(inputs[1].exists());
    assert!(!inputs[2].exists());
    assert!(out.join("one.mp4").exists());
    assert!(!out.join("two-fail.mp4").exists());
    assert!(out.join("three.mp4").exists());
}
