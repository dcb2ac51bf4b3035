//! C9 (part) — per-unit `conversation.json`: the normalised transcript
//! array, serialised verbatim alongside the unit's `workspace/` and
//! `debug.log`.

use std::path::Path;

use pitlane_core::types::TranscriptEntry;

pub fn write_conversation(path: &Path, transcript: &[TranscriptEntry]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let rendered = serde_json::to_string_pretty(transcript)?;
    std::fs::write(path, rendered)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_conversation_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversation.json");
        let transcript = vec![
            TranscriptEntry::assistant_text("hello"),
            TranscriptEntry::tool_invocation("Write", serde_json::json!({"path": "a.py"})),
        ];
        write_conversation(&path, &transcript).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        let back: Vec<TranscriptEntry> = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].content, "hello");
        assert!(back[1].tool_use.is_some());
    }

    #[test]
    fn test_write_conversation_empty_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversation.json");
        write_conversation(&path, &[]).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        let back: Vec<TranscriptEntry> = serde_json::from_str(&raw).unwrap();
        assert!(back.is_empty());
    }
}
