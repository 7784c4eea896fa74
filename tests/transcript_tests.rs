// Integration tests for transcript persistence
//
// These tests verify the persisted document shape: field names, the
// optional error field, the deterministic filename and round-tripping.

use anyhow::Result;
use chrono::{TimeZone, Utc};
use live_scribe::session::{SessionTranscript, TranscriptEntry};
use tempfile::TempDir;

fn entry(text: &str, error: Option<&str>) -> TranscriptEntry {
    TranscriptEntry {
        timestamp: Utc::now(),
        filename: "audio-1.wav".to_string(),
        text: text.to_string(),
        error: error.map(|e| e.to_string()),
    }
}

#[test]
fn test_error_field_is_omitted_when_absent() -> Result<()> {
    let json = serde_json::to_string(&entry("hello", None))?;
    assert!(!json.contains("\"error\""));

    let json = serde_json::to_string(&entry("hello", Some("read failed")))?;
    assert!(json.contains("\"error\":\"read failed\""));

    Ok(())
}

#[test]
fn test_transcript_filename_derives_from_start_time() {
    let mut transcript = SessionTranscript::new();
    transcript.start_time = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();

    assert_eq!(transcript.file_name(), "transcript-20250314-092653.json");
}

#[tokio::test]
async fn test_save_writes_parseable_pretty_json() -> Result<()> {
    let temp = TempDir::new()?;

    let mut transcript = SessionTranscript::new();
    transcript.transcriptions.push(entry("Hello world", None));
    transcript.end_time = Some(Utc::now());

    let path = transcript.save_to(temp.path()).await?;
    assert!(path.exists());

    let data = std::fs::read_to_string(&path)?;
    // Pretty output, one field per line.
    assert!(data.contains('\n'));

    let parsed: SessionTranscript = serde_json::from_str(&data)?;
    assert_eq!(parsed.session_id, transcript.session_id);
    assert_eq!(parsed.transcriptions.len(), 1);
    assert_eq!(parsed.transcriptions[0].text, "Hello world");
    assert!(parsed.end_time.unwrap() >= parsed.start_time);

    Ok(())
}
