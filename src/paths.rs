//! Deterministic output paths: `{root}/YYYY/YYYY-MM/YYYY-MM-DD - Title.md`.

use chrono::{DateTime, FixedOffset, Local};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::utils::{parse_existing_frontmatter, parse_timestamp};

const MAX_TITLE_CHARS: usize = 80;
const MAX_SLUG_LEN: usize = 60;

/// How the title part of a filename is spelled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilenameStyle {
    /// `2024-05-06 - Weekly Sync.md`
    #[default]
    Title,
    /// `2024-05-06-weekly-sync.md`
    Slug,
}

/// Remove characters that are problematic in filenames.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect();
    let mut name = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    if name.chars().count() > MAX_TITLE_CHARS {
        let cut: String = name.chars().take(MAX_TITLE_CHARS).collect();
        // Drop the trailing partial word
        name = match cut.rsplit_once(' ') {
            Some((head, _)) => head.to_string(),
            None => cut,
        };
    }

    if name.is_empty() {
        "Untitled".to_string()
    } else {
        name
    }
}

pub fn slugify_title(title: &str) -> String {
    let raw_slug = slug::slugify(title);
    // slug output is ASCII-only, so byte == char
    let slug = raw_slug[..raw_slug.len().min(MAX_SLUG_LEN)].trim_end_matches('-');
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug.to_string()
    }
}

/// The date a record is filed under: `created_at`, else `updated_at`, else now.
pub fn record_date(created_at: Option<&str>, updated_at: Option<&str>) -> DateTime<FixedOffset> {
    created_at
        .and_then(parse_timestamp)
        .or_else(|| updated_at.and_then(parse_timestamp))
        .unwrap_or_else(|| Local::now().fixed_offset())
}

/// `{root}/YYYY/YYYY-MM`
pub fn month_dir(root: &Path, date: &DateTime<FixedOffset>) -> PathBuf {
    root.join(date.format("%Y").to_string())
        .join(date.format("%Y-%m").to_string())
}

/// Filename stem (no extension) for a record filed on `date`.
pub fn note_stem(date: &DateTime<FixedOffset>, title: &str, style: FilenameStyle) -> String {
    let day = date.format("%Y-%m-%d");
    match style {
        FilenameStyle::Title => format!("{} - {}", day, sanitize_filename(title)),
        FilenameStyle::Slug => format!("{}-{}", day, slugify_title(title)),
    }
}

fn disambiguate(stem: &str, id_prefix: &str, style: FilenameStyle) -> String {
    match style {
        FilenameStyle::Title => format!("{} ({})", stem, id_prefix),
        FilenameStyle::Slug => format!("{}-{}", stem, slug::slugify(id_prefix)),
    }
}

/// Paths handed out during one run, mapped to the id that claimed them.
pub type PathRegistry = HashMap<PathBuf, String>;

/// Pick the file a record should be written to.
///
/// Candidates are tried in order: the plain stem, then the stem suffixed with the first
/// 8 and 12 characters of the id, then with the full id. A candidate is taken when it is
/// not already claimed by another id in `registry` and:
///   - no file exists there,
///   - the file's frontmatter names this id (we wrote it on an earlier run),
///   - the file has no frontmatter id (an untagged export we adopt).
///
/// Records are expected to be visited in a stable order so repeated runs land on the same
/// paths.
pub fn allocate_path(
    dir: &Path,
    stem: &str,
    id: &str,
    style: FilenameStyle,
    registry: &mut PathRegistry,
) -> PathBuf {
    let mut candidates = vec![stem.to_string()];
    for len in [8usize, 12usize] {
        let prefix: String = id.chars().take(len).collect();
        candidates.push(disambiguate(stem, &prefix, style));
    }
    let full = disambiguate(stem, id, style);
    candidates.push(full.clone());
    candidates.dedup();

    let path = candidates
        .iter()
        .map(|candidate| dir.join(format!("{}.md", candidate)))
        .find(|path| is_claimable(path, id, registry))
        // The full id is unique per record
        .unwrap_or_else(|| dir.join(format!("{}.md", full)));

    registry.insert(path.clone(), id.to_string());
    path
}

fn is_claimable(path: &Path, id: &str, registry: &PathRegistry) -> bool {
    if let Some(owner) = registry.get(path) {
        return owner == id;
    }
    match path.try_exists() {
        Ok(true) => match parse_existing_frontmatter(path).and_then(|fm| fm.id) {
            Some(owner) => owner == id,
            None => true,
        },
        Ok(false) | Err(_) => true,
    }
}
