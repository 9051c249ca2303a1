//! Shared test utilities for integration tests.
//!
//! Builds Granola cache files and export configurations inside temporary directories.

#![allow(dead_code)]

use eyre::Result;
use granola_export::paths::FilenameStyle;
use granola_export::utils::ExportConfig;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const FIRST_ID: &str = "aaaaaaaa-1111-4111-8111-111111111111";
pub const SECOND_ID: &str = "bbbbbbbb-2222-4222-8222-222222222222";

/// Writes `state` the way Granola does: JSON-encoded into the `cache` string field.
pub fn write_cache(dir: &Path, state: Value) -> Result<std::path::PathBuf> {
    let inner = json!({ "state": state, "version": 3 }).to_string();
    let path = dir.join("cache-v3.json");
    fs::write(&path, json!({ "cache": inner }).to_string())?;
    Ok(path)
}

/// Export configuration writing into `<tmp>/out`.
pub fn config(tmp: &TempDir, cache_path: &Path) -> ExportConfig {
    ExportConfig {
        target_dir: tmp.path().join("out"),
        cache_path: cache_path.to_path_buf(),
        filename_style: FilenameStyle::Title,
        force: false,
        verbose: false,
        quiet: true,
    }
}

/// Two meetings on the same day with the same title, plus a deleted one.
pub fn sample_state() -> Value {
    json!({
        "documents": {
            FIRST_ID: {
                "id": FIRST_ID,
                "title": "Weekly Sync",
                "type": "meeting",
                "created_at": "2024-05-06T14:00:12.345Z",
                "updated_at": "2024-05-06T15:00:00.000Z",
                "deleted_at": null,
                "notes_markdown": "- follow up with legal",
                "people": {
                    "attendees": [
                        {"name": "Ana Lee", "email": "ana@x.io"},
                        {"email": "bo@x.io"}
                    ]
                },
                "google_calendar_event": {
                    "start": {"dateTime": "2024-05-06T14:00:00Z"},
                    "end": {"dateTime": "2024-05-06T14:30:00Z"},
                    "attendees": [{"email": "ignored@x.io"}]
                }
            },
            SECOND_ID: {
                "id": SECOND_ID,
                "title": "Weekly Sync",
                "created_at": "2024-05-06T14:00:12.345Z",
                "notes_plain": "second sync, same title"
            },
            "cccccccc-3333-4333-8333-333333333333": {
                "title": "Removed",
                "created_at": "2024-05-07T09:00:00Z",
                "deleted_at": "2024-05-08T09:00:00Z",
                "notes_plain": "should not be exported"
            }
        },
        "transcripts": {
            FIRST_ID: [
                {"text": "Morning all.", "start_timestamp": "2024-05-06T14:00:05.000Z", "source": "microphone"},
                {"text": "  ", "start_timestamp": "2024-05-06T14:00:06.000Z"},
                {"text": "Let's start.", "start_timestamp": "2024-05-06T14:00:09.000Z", "source": "system"}
            ]
        },
        "documentPanels": {
            FIRST_ID: {
                "panel-old": {
                    "title": "Summary",
                    "created_at": "2024-05-06T14:31:00Z",
                    "content": {"type": "doc", "content": [
                        {"type": "paragraph", "content": [{"type": "text", "text": "stale"}]}
                    ]}
                },
                "panel-new": {
                    "title": "Summary",
                    "created_at": "2024-05-06T14:40:00Z",
                    "content": {"type": "doc", "content": [
                        {"type": "heading", "attrs": {"level": 3}, "content": [{"type": "text", "text": "Decisions"}]},
                        {"type": "bulletList", "content": [
                            {"type": "listItem", "content": [
                                {"type": "paragraph", "content": [
                                    {"type": "text", "text": "Ship", "marks": [{"type": "bold"}]},
                                    {"type": "text", "text": " on Friday"}
                                ]}
                            ]}
                        ]}
                    ]}
                }
            }
        }
    })
}
