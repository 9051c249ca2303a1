/// Self-contained type definitions for the Granola local cache and the shared-note page payload.
///
/// Storage format: a JSON file (`cache-v3.json`) whose `cache` field holds a *string* of JSON.
/// That inner document has a single `state` object:
///
/// ```json
/// {
///   "cache": "{\"state\": {\"documents\": {...}, \"transcripts\": {...}, \"documentPanels\": {...}}}"
/// }
/// ```
///
/// Every field is optional on the wire. The app adds and drops fields between releases, so
/// nothing here is `deny_unknown_fields` and most structs derive `Default`.
use std::collections::{BTreeMap, HashMap};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Accept any JSON value and keep it only if it decodes as `T`.
///
/// Used for fields whose shape has drifted between app versions (e.g. `people` has been
/// both an object and a list).
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Like [`lenient`] but for lists: entries that don't decode are dropped.
pub(crate) fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect(),
        _ => Vec::new(),
    })
}

// ---------------------------------------------------------------------------
// Cache envelope
// ---------------------------------------------------------------------------

/// The outer file. `cache` is usually a JSON string, occasionally an inline object.
#[derive(Debug, Deserialize)]
pub struct CacheFile {
    pub cache: serde_json::Value,
}

/// The decoded `cache` payload.
#[derive(Debug, Deserialize)]
pub struct CachePayload {
    pub state: CacheState,
}

/// Application state snapshot.
///
/// Records are kept as raw JSON here and decoded one at a time, so a single malformed
/// document can be skipped without failing the whole load.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheState {
    /// Meeting documents keyed by document id.
    #[serde(default)]
    pub documents: BTreeMap<String, serde_json::Value>,

    /// Transcript entry lists keyed by document id.
    #[serde(default)]
    pub transcripts: HashMap<String, serde_json::Value>,

    /// AI panels keyed by document id, then by panel id.
    #[serde(default)]
    pub document_panels: HashMap<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// A meeting document (one per meeting or ad-hoc note).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Document {
    pub title: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    /// Set (to a timestamp) once the user deletes the note; `null` otherwise.
    pub deleted_at: Option<serde_json::Value>,
    /// `"meeting"` for calendar-backed notes.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub notes_markdown: Option<String>,
    pub notes_plain: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub people: Option<People>,
    #[serde(deserialize_with = "lenient")]
    pub google_calendar_event: Option<CalendarEvent>,
}

/// Participants as recorded by Granola itself.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct People {
    #[serde(deserialize_with = "lenient_vec")]
    pub attendees: Vec<Attendee>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Attendee {
    pub name: Option<String>,
    pub email: Option<String>,
}

// ---------------------------------------------------------------------------
// Calendar
// ---------------------------------------------------------------------------

/// The Google Calendar event the note was created from.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CalendarEvent {
    #[serde(deserialize_with = "lenient")]
    pub start: Option<EventTime>,
    #[serde(deserialize_with = "lenient")]
    pub end: Option<EventTime>,
    #[serde(deserialize_with = "lenient_vec")]
    pub attendees: Vec<CalendarAttendee>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EventTime {
    /// RFC 3339 with offset. All-day events carry `date` instead and are ignored.
    pub date_time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CalendarAttendee {
    pub display_name: Option<String>,
    pub email: Option<String>,
    /// `true` for the calendar owner.
    #[serde(rename = "self")]
    pub is_self: bool,
}

// ---------------------------------------------------------------------------
// Transcripts
// ---------------------------------------------------------------------------

/// One utterance of a transcript.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TranscriptEntry {
    pub text: Option<String>,
    pub start_timestamp: Option<String>,
}

// ---------------------------------------------------------------------------
// Panels
// ---------------------------------------------------------------------------

/// An AI-generated panel attached to a document.
///
/// `content` is ProseMirror JSON in current versions; some older panels store HTML as a string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Panel {
    pub title: Option<String>,
    pub created_at: Option<String>,
    pub content: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Shared-note page (RSC payload)
// ---------------------------------------------------------------------------

/// Props of the object that carries `documentPanel` in a shared-note page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SharedDocumentProps {
    #[serde(deserialize_with = "lenient")]
    pub document: Option<SharedDocument>,
    #[serde(deserialize_with = "lenient")]
    pub document_metadata: Option<DocumentMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SharedDocument {
    pub title: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub created_at: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub creator: Option<Person>,
    #[serde(deserialize_with = "lenient_vec")]
    pub attendees: Vec<Person>,
}

/// A creator or attendee as exposed on the shared page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Person {
    #[serde(deserialize_with = "lenient")]
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub details: Option<PersonDetails>,
}

impl Person {
    /// `details.person.name.fullName`, if present and non-empty.
    pub fn full_name(&self) -> Option<&str> {
        self.details
            .as_ref()?
            .person
            .as_ref()?
            .name
            .as_ref()?
            .full_name
            .as_deref()
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PersonDetails {
    #[serde(deserialize_with = "lenient")]
    pub person: Option<PersonProfile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PersonProfile {
    #[serde(deserialize_with = "lenient")]
    pub name: Option<PersonName>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersonName {
    pub full_name: Option<String>,
}
