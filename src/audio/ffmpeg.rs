use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::recorder::{AudioSource, Recorder, RecorderError};

/// Captures system audio with ffmpeg reading from a PulseAudio monitor sink.
///
/// Source discovery shells out to `pactl list sinks` and picks the first
/// monitor device, so whatever is currently playing on the default output
/// is what gets recorded.
pub struct FfmpegRecorder;

impl FfmpegRecorder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FfmpegRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Recorder for FfmpegRecorder {
    async fn resolve_source(
        &self,
        cancel: &CancellationToken,
    ) -> Result<AudioSource, RecorderError> {
        let output = tokio::select! {
            _ = cancel.cancelled() => return Err(RecorderError::Cancelled),
            out = Command::new("pactl").args(["list", "sinks"]).output() => out?,
        };

        if !output.status.success() {
            return Err(RecorderError::CaptureFailed(output.status));
        }

        let listing = String::from_utf8_lossy(&output.stdout);
        let source = parse_monitor_source(&listing)?;

        info!("Resolved capture source: {}", source.name);
        Ok(source)
    }

    async fn capture_chunk(
        &self,
        cancel: &CancellationToken,
        duration: Duration,
        source: &AudioSource,
        dest: &Path,
    ) -> Result<(), RecorderError> {
        debug!(
            "Capturing {:.2}s from {} to {}",
            duration.as_secs_f64(),
            source.name,
            dest.display()
        );

        let mut child = Command::new("ffmpeg")
            .args(["-f", "pulse", "-i", &source.name])
            .args(["-t", &format!("{:.2}", duration.as_secs_f64())])
            .arg("-y") // overwrite output file
            .arg(dest)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = child.kill().await;
                Err(RecorderError::Cancelled)
            }
            status = child.wait() => {
                let status = status?;
                if status.success() {
                    Ok(())
                } else {
                    Err(RecorderError::CaptureFailed(status))
                }
            }
        }
    }
}

/// Pick the first monitor device out of a `pactl list sinks` dump.
fn parse_monitor_source(listing: &str) -> Result<AudioSource, RecorderError> {
    let line = listing
        .lines()
        .find(|line| line.contains(".monitor"))
        .ok_or(RecorderError::NoMonitorSource)?;

    let (_, name) = line
        .split_once(':')
        .ok_or_else(|| RecorderError::SourceParse(line.to_string()))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(RecorderError::NoMonitorSource);
    }

    Ok(AudioSource {
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_monitor_line() {
        let listing = "Sink #0\n\tName: alsa_output.pci\n\tMonitor Source: alsa_output.pci.monitor\n\tMonitor Source: other.monitor\n";
        let source = parse_monitor_source(listing).unwrap();
        assert_eq!(source.name, "alsa_output.pci.monitor");
    }

    #[test]
    fn missing_monitor_is_an_error() {
        let listing = "Sink #0\n\tName: alsa_output.pci\n";
        assert!(matches!(
            parse_monitor_source(listing),
            Err(RecorderError::NoMonitorSource)
        ));
    }

    #[test]
    fn unparseable_line_is_reported() {
        let listing = "garbage .monitor line without separator\n";
        assert!(matches!(
            parse_monitor_source(listing),
            Err(RecorderError::SourceParse(_))
        ));
    }
}
