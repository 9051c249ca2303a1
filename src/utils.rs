use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use eyre::{Context, Result, eyre};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::importer::{CacheFile, CachePayload, CacheState};
use crate::paths::FilenameStyle;

/// Configuration required to run an export.
/// This decouples the logic from how the arguments were parsed (CLI/Config file).
#[derive(Clone, Debug)]
pub struct ExportConfig {
    pub target_dir: PathBuf,
    pub cache_path: PathBuf,
    pub filename_style: FilenameStyle,
    pub force: bool,
    pub verbose: bool,
    pub quiet: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessResult {
    Created,
    Updated,
    Skipped,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileFrontmatter {
    pub id: Option<String>,
}

/// Where Granola keeps its cache on this platform.
pub fn default_cache_path() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("Granola/cache-v3.json"))
}

/// Read the cache file and unwrap the double-encoded `state` object.
pub fn load_cache(path: &Path) -> Result<CacheState> {
    let raw = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read cache: {}", path.display()))?;
    parse_cache(&raw).wrap_err_with(|| format!("Failed to parse cache: {}", path.display()))
}

/// Parse the contents of a cache file.
pub fn parse_cache(raw: &str) -> Result<CacheState> {
    let outer: CacheFile = serde_json::from_str(raw)
        .wrap_err("Cache is not a JSON object with a `cache` field")?;

    let payload: CachePayload = match outer.cache {
        serde_json::Value::String(inner) => {
            serde_json::from_str(&inner).wrap_err("Inner cache JSON is invalid")?
        }
        value @ serde_json::Value::Object(_) => {
            serde_json::from_value(value).wrap_err("Inner cache object has no usable `state`")?
        }
        other => {
            return Err(eyre!(
                "Unexpected `cache` field type: expected string or object, got {}",
                json_kind(&other)
            ));
        }
    };

    Ok(payload.state)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Parse the timestamp shapes Granola emits.
///
/// RFC 3339 (with `Z` or an offset) is the norm. Naive date-times and bare dates are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Create `path` (and its parent directories) and fill it through `render`.
///
/// A partially written file is removed when rendering fails.
pub fn write_note<F>(path: &Path, render: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .wrap_err_with(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let file =
        File::create(path).wrap_err_with(|| format!("Failed to create: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    let written = render(&mut writer).and_then(|()| writer.flush());
    if let Err(e) = written {
        drop(writer);
        let _ = fs::remove_file(path);
        return Err(e).wrap_err_with(|| format!("Failed to write: {}", path.display()));
    }
    Ok(())
}

/// Read the YAML frontmatter from an existing .md file and extract the owning record id.
///
/// Returns `None` when the file is missing or doesn't start with a frontmatter block.
pub fn parse_existing_frontmatter(path: &Path) -> Option<FileFrontmatter> {
    let file = File::open(path).ok()?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();
    let first = lines.next()?.ok()?;
    if first.trim() != "---" {
        return None;
    }

    let mut fm = FileFrontmatter::default();
    let mut bytes_read = 0usize;

    for line in lines {
        let line = line.ok()?;
        bytes_read += line.len() + 1;
        if bytes_read > 2048 || line.trim() == "---" {
            break;
        }
        if let Some(rest) = line.strip_prefix("id:") {
            let id = rest.trim().trim_matches('\'').trim_matches('"');
            if !id.is_empty() {
                fm.id = Some(id.to_string());
            }
        }
    }
    Some(fm)
}
