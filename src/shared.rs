//! Publicly shared notes (`https://notes.granola.ai/d/<id>`), fetched over HTTP.
//!
//! A shared-note page is a Next.js app. The note's metadata lives in React Server
//! Component payloads pushed through `self.__next_f.push([n, "<js string>"])`; the summary
//! HTML is one of those payloads on its own.

use eyre::{Context, Result, eyre};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

use crate::html;
use crate::importer::SharedDocumentProps;
use crate::paths::{PathRegistry, allocate_path, month_dir, note_stem, record_date};
use crate::renderer;
use crate::utils::{ExportConfig, ProcessResult, write_note};

pub const SHARE_BASE_URL: &str = "https://notes.granola.ai/d/";
pub const SHARED_DIR: &str = "shared";

const USER_AGENT: &str = concat!("granola-export/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const PANEL_KEY: &str = "documentPanel";

static DOC_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/d/([0-9a-f-]+)").unwrap_or_else(|_| unreachable!()));

static RSC_PUSH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)self\.__next_f\.push\(\[\d+,"((?:[^"\\]|\\.)*)"\]"#)
        .unwrap_or_else(|_| unreachable!())
});

/// A shared note, reduced to what gets rendered.
#[derive(Debug, Clone)]
pub struct SharedNote {
    pub doc_id: String,
    pub title: String,
    pub created_at: Option<String>,
    pub creator: Option<String>,
    pub attendees: Vec<String>,
    pub summary_html: String,
    /// The URL as the user gave it (before redirects).
    pub source_url: Url,
}

impl SharedNote {
    pub fn summary_markdown(&self) -> String {
        if self.summary_html.is_empty() {
            return String::new();
        }
        html::to_markdown(&self.summary_html)
    }
}

/// Blocking HTTP client used for every shared-note request in a run.
pub fn build_client() -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .wrap_err("Failed to build HTTP client")
}

/// Accept a full share URL or a bare document id.
pub fn resolve_share_url(arg: &str) -> Result<Url> {
    let arg = arg.trim();
    let url = match Url::parse(arg) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) if !arg.is_empty() && !arg.contains('/') => {
            Url::parse(&format!("{}{}", SHARE_BASE_URL, arg))
                .wrap_err_with(|| format!("Not a valid note id: {}", arg))?
        }
        Err(e) => return Err(eyre!("Not a valid URL: {} ({})", arg, e)),
    };
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(eyre!("Unsupported URL scheme {:?} in {}", other, url)),
    }
}

/// GET the page (following redirects) and parse it.
pub fn fetch_shared_note(client: &reqwest::blocking::Client, url: &Url) -> Result<SharedNote> {
    tracing::debug!(%url, "fetching shared note");
    let response = client
        .get(url.clone())
        .send()
        .wrap_err_with(|| format!("Request failed: {}", url))?
        .error_for_status()
        .wrap_err_with(|| format!("Server rejected request: {}", url))?;

    let final_url = response.url().clone();
    let page = response
        .text()
        .wrap_err_with(|| format!("Failed to read response body: {}", final_url))?;

    parse_shared_page(&final_url, url, &page)
}

/// Extract a [`SharedNote`] from a fetched page.
///
/// `final_url` is where redirects ended up (`/t/...` links resolve to `/d/<id>`); the id is
/// taken from it. `source_url` is recorded in the output as given.
pub fn parse_shared_page(final_url: &Url, source_url: &Url, page: &str) -> Result<SharedNote> {
    let doc_id = DOC_ID
        .captures(final_url.as_str())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| eyre!("Could not extract document ID from URL: {}", final_url))?;

    let payloads: Vec<String> = RSC_PUSH
        .captures_iter(page)
        .filter_map(|c| c.get(1))
        .map(|m| decode_js_string(m.as_str()))
        .collect();
    tracing::debug!(count = payloads.len(), "found RSC payloads");

    let props = payloads
        .iter()
        .filter(|p| p.contains(PANEL_KEY))
        .find_map(|p| {
            let start = p.find('[')?;
            let value = serde_json::Deserializer::from_str(&p[start..])
                .into_iter::<Value>()
                .next()?
                .ok()?;
            find_object_with_key(&value, PANEL_KEY).cloned()
        })
        .ok_or_else(|| eyre!("Could not find document data in shared note page"))?;

    let props = SharedDocumentProps::deserialize(&props)
        .wrap_err("Document data in shared note page has an unexpected shape")?;

    let summary_html = payloads
        .iter()
        .map(|p| p.trim())
        .find(|p| looks_like_summary_html(p))
        .unwrap_or("")
        .to_string();

    let document = props.document.unwrap_or_default();
    let metadata = props.document_metadata.unwrap_or_default();

    let attendees = metadata
        .attendees
        .iter()
        .filter_map(|a| {
            a.full_name()
                .or(a.email.as_deref())
                .filter(|n| !n.is_empty())
                .map(str::to_string)
        })
        .collect();

    let creator = metadata.creator.as_ref().and_then(|c| {
        c.full_name()
            .or(c.name.as_deref().filter(|n| !n.is_empty()))
            .or(c.email.as_deref())
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    });

    let non_empty = |s: Option<String>| s.filter(|v| !v.is_empty());

    Ok(SharedNote {
        doc_id,
        title: non_empty(document.title)
            .or_else(|| non_empty(metadata.title))
            .unwrap_or_else(|| "Untitled".to_string()),
        created_at: non_empty(document.created_at).or_else(|| non_empty(metadata.created_at)),
        creator,
        attendees,
        summary_html,
        source_url: source_url.clone(),
    })
}

fn looks_like_summary_html(payload: &str) -> bool {
    if !payload.starts_with('<') {
        return false;
    }
    let head: String = payload.chars().take(20).collect();
    head.contains("<h") || head.contains("<ul") || head.contains("<p")
}

/// Depth-first search for the first object that has `key`.
pub fn find_object_with_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => {
            if map.contains_key(key) {
                return Some(value);
            }
            map.values().find_map(|v| find_object_with_key(v, key))
        }
        Value::Array(items) => items.iter().find_map(|v| find_object_with_key(v, key)),
        _ => None,
    }
}

/// Undo JavaScript string escaping (`\uXXXX`, `\n`, `\t`, `\r`, `\\`, `\"`, `\/`).
///
/// Other escapes are kept verbatim. UTF-16 surrogate pairs are joined; a lone surrogate
/// becomes U+FFFD.
pub fn decode_js_string(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;

    while let Some(offset) = raw[i..].find('\\') {
        let pos = i + offset;
        out.push_str(&raw[i..pos]);
        let simple = match bytes.get(pos + 1) {
            Some(b'n') => Some('\n'),
            Some(b't') => Some('\t'),
            Some(b'r') => Some('\r'),
            Some(b'\\') => Some('\\'),
            Some(b'"') => Some('"'),
            Some(b'/') => Some('/'),
            _ => None,
        };
        if let Some(c) = simple {
            out.push(c);
            i = pos + 2;
            continue;
        }
        if let Some(unit) = hex4(raw, pos) {
            if (0xD800..0xDC00).contains(&unit)
                && let Some(low) = hex4(raw, pos + 6)
                && (0xDC00..0xE000).contains(&low)
            {
                let code = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
                i = pos + 12;
            } else {
                out.push(char::from_u32(unit).unwrap_or(char::REPLACEMENT_CHARACTER));
                i = pos + 6;
            }
            continue;
        }
        out.push('\\');
        i = pos + 1;
    }
    out.push_str(&raw[i..]);
    out
}

/// Parse `\uXXXX` starting at byte `pos`.
fn hex4(raw: &str, pos: usize) -> Option<u32> {
    let esc = raw.get(pos..pos + 6)?;
    let digits = esc.strip_prefix("\\u")?;
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

/// Fetch one shared note and write it under `{target}/shared/YYYY/YYYY-MM/`.
///
/// `registry` is shared by every note saved in one run.
pub fn save_shared_note(
    client: &reqwest::blocking::Client,
    url: &Url,
    config: &ExportConfig,
    registry: &mut PathRegistry,
) -> Result<(PathBuf, ProcessResult)> {
    let note = fetch_shared_note(client, url)?;
    write_shared_note(&note, config, registry)
}

/// Place and write an already-parsed shared note.
pub fn write_shared_note(
    note: &SharedNote,
    config: &ExportConfig,
    registry: &mut PathRegistry,
) -> Result<(PathBuf, ProcessResult)> {
    let date = record_date(note.created_at.as_deref(), None);
    let dir = month_dir(&config.target_dir.join(SHARED_DIR), &date);
    let stem = note_stem(&date, &note.title, config.filename_style);
    let path = allocate_path(&dir, &stem, &note.doc_id, config.filename_style, registry);

    let exists = path.exists();
    if exists && !config.force {
        tracing::debug!(path = %path.display(), "shared note already saved");
        return Ok((path, ProcessResult::Skipped));
    }

    write_note(&path, |w| renderer::render_shared_note(w, note))
        .wrap_err_with(|| format!("Failed to save shared note {}", note.doc_id))?;

    let result = if exists {
        ProcessResult::Updated
    } else {
        ProcessResult::Created
    };
    Ok((path, result))
}
