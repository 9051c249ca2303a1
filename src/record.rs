//! Normalization of raw cache records into the fields the renderer needs.

use chrono::{DateTime, FixedOffset};
use eyre::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::html;
use crate::importer::{Document, Panel, TranscriptEntry};
use crate::prosemirror;
use crate::utils::parse_timestamp;

const SUMMARY_PANEL_TITLE: &str = "Summary";
const DEFAULT_KIND: &str = "meeting";

/// A meeting with every field resolved, ready to render.
#[derive(Debug, Clone, Default)]
pub struct Meeting {
    pub id: String,
    pub title: String,
    /// `created_at` as stored; shown verbatim when it can't be parsed.
    pub created_raw: Option<String>,
    pub created_at: Option<DateTime<FixedOffset>>,
    pub updated_raw: Option<String>,
    pub kind: String,
    /// Calendar start/end, present only when both ends parse.
    pub time_range: Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)>,
    pub attendees: Vec<String>,
    pub summary: String,
    pub notes: String,
    pub transcript: String,
    pub deleted: bool,
}

impl Meeting {
    pub fn from_document(
        id: &str,
        doc: &Document,
        transcript: &[TranscriptEntry],
        panels: &[Panel],
    ) -> Self {
        let created_raw = doc.created_at.clone().filter(|s| !s.is_empty());
        Self {
            id: id.to_string(),
            title: doc
                .title
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Untitled".to_string()),
            created_at: created_raw.as_deref().and_then(parse_timestamp),
            created_raw,
            updated_raw: doc.updated_at.clone().filter(|s| !s.is_empty()),
            kind: doc
                .kind
                .clone()
                .filter(|k| !k.is_empty())
                .unwrap_or_else(|| DEFAULT_KIND.to_string()),
            time_range: meeting_time(doc),
            attendees: attendees(doc),
            summary: summary_from_panels(panels),
            notes: notes(doc),
            transcript: format_transcript(transcript),
            deleted: doc.deleted_at.as_ref().is_some_and(|v| !v.is_null()),
        }
    }

    /// Whether there is anything worth writing out.
    pub fn has_content(&self) -> bool {
        !(self.summary.trim().is_empty()
            && self.notes.is_empty()
            && self.transcript.trim().is_empty())
    }
}

/// Decode one raw document record.
pub fn decode_document(value: &Value) -> Result<Document> {
    Document::deserialize(value).wrap_err("Document record does not match the expected shape")
}

/// Decode a transcript entry list. Malformed entries are dropped.
pub fn decode_transcript(value: Option<&Value>) -> Vec<TranscriptEntry> {
    value
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| TranscriptEntry::deserialize(e).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Decode the panel map of one document. Non-object panels are dropped.
pub fn decode_panels(value: Option<&Value>) -> Vec<Panel> {
    value
        .and_then(Value::as_object)
        .map(|panels| {
            panels
                .values()
                .filter(|p| p.is_object())
                .filter_map(|p| Panel::deserialize(p).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Attendee names: Granola's own `people` list, else the calendar guest list minus the owner.
pub fn attendees(doc: &Document) -> Vec<String> {
    let mut names: Vec<String> = doc
        .people
        .iter()
        .flat_map(|p| &p.attendees)
        .filter_map(|a| pick_name(a.name.as_deref(), a.email.as_deref()))
        .collect();

    if names.is_empty()
        && let Some(cal) = &doc.google_calendar_event
    {
        names = cal
            .attendees
            .iter()
            .filter(|a| !a.is_self)
            .filter_map(|a| pick_name(a.display_name.as_deref(), a.email.as_deref()))
            .collect();
    }

    names
}

fn pick_name(name: Option<&str>, email: Option<&str>) -> Option<String> {
    name.filter(|n| !n.is_empty())
        .or(email)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

fn meeting_time(doc: &Document) -> Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let cal = doc.google_calendar_event.as_ref()?;
    let start = cal.start.as_ref()?.date_time.as_deref().and_then(parse_timestamp)?;
    let end = cal.end.as_ref()?.date_time.as_deref().and_then(parse_timestamp)?;
    Some((start, end))
}

fn notes(doc: &Document) -> String {
    let markdown = doc.notes_markdown.as_deref().unwrap_or("").trim();
    if !markdown.is_empty() {
        return markdown.to_string();
    }
    doc.notes_plain.as_deref().unwrap_or("").trim().to_string()
}

/// Markdown of the most recent panel titled "Summary", or an empty string.
pub fn summary_from_panels(panels: &[Panel]) -> String {
    let mut latest: Option<&Panel> = None;
    for panel in panels
        .iter()
        .filter(|p| p.title.as_deref() == Some(SUMMARY_PANEL_TITLE))
    {
        let newer = match latest {
            None => true,
            Some(cur) => {
                panel.created_at.as_deref().unwrap_or("") > cur.created_at.as_deref().unwrap_or("")
            }
        };
        if newer {
            latest = Some(panel);
        }
    }

    let Some(panel) = latest else {
        return String::new();
    };
    let markdown = match &panel.content {
        Value::String(markup) => html::to_markdown(markup),
        content => prosemirror::to_markdown(content),
    };
    markdown.trim().to_string()
}

/// Render transcript entries as `**[HH:MM:SS]** text` paragraphs.
pub fn format_transcript(entries: &[TranscriptEntry]) -> String {
    entries
        .iter()
        .filter_map(|entry| {
            let text = entry.text.as_deref().unwrap_or("").trim();
            if text.is_empty() {
                return None;
            }
            Some(
                match entry.start_timestamp.as_deref().and_then(parse_timestamp) {
                    Some(ts) => format!("**[{}]** {}", ts.format("%H:%M:%S"), text),
                    None => text.to_string(),
                },
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
