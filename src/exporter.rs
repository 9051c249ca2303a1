use eyre::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::Path;

use crate::importer::{CacheState, Document};
use crate::paths::{PathRegistry, allocate_path, month_dir, note_stem, record_date};
use crate::record::{Meeting, decode_document, decode_panels, decode_transcript};
use crate::renderer;
use crate::utils::{ExportConfig, ProcessResult, load_cache, write_note};

/// Counters reported at the end of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
    pub with_transcript: usize,
}

impl ExportSummary {
    fn record(&mut self, result: ProcessResult) {
        match result {
            ProcessResult::Created => self.created += 1,
            ProcessResult::Updated => self.updated += 1,
            ProcessResult::Skipped => self.skipped += 1,
        }
    }
}

/// The main entry point for the local export.
/// Loads the cache and writes one Markdown file per meeting.
pub fn execute(config: &ExportConfig) -> Result<ExportSummary> {
    let state = load_cache(&config.cache_path)?;
    let summary = export_state(&state, config)?;

    if !config.quiet {
        let mut line = format!(
            "Done. {} created, {} updated, {} skipped ({} with transcripts).",
            summary.created, summary.updated, summary.skipped, summary.with_transcript
        );
        if summary.errors > 0 {
            line.push_str(&format!(" Completed with {} error(s).", summary.errors));
        }
        eprintln!("{}", line);
        eprintln!("Output: {}", config.target_dir.display());
    }

    Ok(summary)
}

fn make_bar(total: u64, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(total);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)",
    )
    .map(|s| s.progress_chars("=>-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}

/// Export every document of an already-loaded cache.
pub fn export_state(state: &CacheState, config: &ExportConfig) -> Result<ExportSummary> {
    fs::create_dir_all(&config.target_dir).wrap_err_with(|| {
        format!(
            "Failed to create target directory: {}",
            config.target_dir.display()
        )
    })?;

    let mut summary = ExportSummary::default();
    let pb = make_bar(state.documents.len() as u64, config.quiet);
    pb.println(format!("Found {} documents.", state.documents.len()));

    let mut documents: Vec<(&str, Document)> = Vec::with_capacity(state.documents.len());
    for (id, raw) in &state.documents {
        match decode_document(raw) {
            Ok(doc) => documents.push((id.as_str(), doc)),
            Err(e) => {
                summary.skipped += 1;
                tracing::warn!(
                    id = %id,
                    error = %format!("{:#}", e),
                    "skipping undecodable document"
                );
                pb.inc(1);
            }
        }
    }

    // Colliding titles are disambiguated in visiting order, so keep it stable across runs
    documents.sort_by(|(a_id, a), (b_id, b)| {
        a.created_at
            .as_deref()
            .unwrap_or("")
            .cmp(b.created_at.as_deref().unwrap_or(""))
            .then_with(|| a_id.cmp(b_id))
    });

    let mut registry = PathRegistry::new();
    for (id, doc) in &documents {
        match export_document(id, doc, state, config, &mut registry, &pb) {
            Ok((result, with_transcript)) => {
                summary.record(result);
                if with_transcript {
                    summary.with_transcript += 1;
                }
            }
            Err(e) => {
                summary.errors += 1;
                pb.println(format!("Error [{}]: {:#}", short_id(id), e));
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(summary)
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Normalize, place and write one document. Returns whether a transcript was included.
fn export_document(
    id: &str,
    doc: &Document,
    state: &CacheState,
    config: &ExportConfig,
    registry: &mut PathRegistry,
    pb: &ProgressBar,
) -> Result<(ProcessResult, bool)> {
    let transcript = decode_transcript(state.transcripts.get(id));
    let panels = decode_panels(state.document_panels.get(id));
    let meeting = Meeting::from_document(id, doc, &transcript, &panels);

    if meeting.deleted {
        tracing::debug!(id, "deleted document");
        return Ok((ProcessResult::Skipped, false));
    }

    // Empty records never claim a path
    if !meeting.has_content() {
        tracing::debug!(id, title = %meeting.title, "no summary, notes or transcript");
        return Ok((ProcessResult::Skipped, false));
    }

    let date = record_date(meeting.created_raw.as_deref(), meeting.updated_raw.as_deref());
    let dir = month_dir(&config.target_dir, &date);
    let stem = note_stem(&date, &meeting.title, config.filename_style);
    let path = allocate_path(&dir, &stem, id, config.filename_style, registry);

    let exists = path.exists();
    if exists && !config.force {
        if config.verbose {
            pb.println(format!("Skipped:  {}", display_rel(&path, &config.target_dir)));
        }
        return Ok((ProcessResult::Skipped, false));
    }

    write_note(&path, |w| renderer::render_meeting(w, &meeting))
        .wrap_err("Failed to write meeting markdown")?;

    let result = if exists {
        ProcessResult::Updated
    } else {
        ProcessResult::Created
    };

    if config.verbose {
        let label = match result {
            ProcessResult::Created => "Created:",
            ProcessResult::Updated => "Updated:",
            ProcessResult::Skipped => unreachable!(),
        };
        pb.println(format!("{:<9} {}", label, display_rel(&path, &config.target_dir)));
    }

    Ok((result, !meeting.transcript.is_empty()))
}

fn display_rel(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::FilenameStyle;
    use crate::utils::parse_cache;
    use serde_json::json;

    fn config(dir: &Path) -> ExportConfig {
        ExportConfig {
            target_dir: dir.to_path_buf(),
            cache_path: dir.join("cache.json"),
            filename_style: FilenameStyle::Title,
            force: false,
            verbose: false,
            quiet: true,
        }
    }

    fn state(documents: serde_json::Value) -> CacheState {
        let inner = json!({ "state": { "documents": documents } }).to_string();
        parse_cache(&json!({ "cache": inner }).to_string()).unwrap()
    }

    #[test]
    fn skips_deleted_and_empty_documents() {
        let dir = tempfile::tempdir().unwrap();
        let st = state(json!({
            "a": {"title": "Gone", "created_at": "2024-01-01T10:00:00Z", "deleted_at": "2024-01-02T00:00:00Z", "notes_plain": "x"},
            "b": {"title": "Empty", "created_at": "2024-01-01T10:00:00Z"},
            "c": {"title": "Kept", "created_at": "2024-01-01T10:00:00Z", "notes_plain": "x"}
        }));
        let summary = export_state(&st, &config(dir.path())).unwrap();
        assert_eq!(summary.created, 1);
        assert_eq!(summary.skipped, 2);
        assert!(dir.path().join("2024/2024-01/2024-01-01 - Kept.md").exists());
    }

    #[test]
    fn empty_document_leaves_the_name_free() {
        let dir = tempfile::tempdir().unwrap();
        let st = state(json!({
            "a": {"title": "Sync", "created_at": "2024-01-01T10:00:00Z"},
            "b": {"title": "Sync", "created_at": "2024-01-01T10:00:00Z", "notes_plain": "x"}
        }));
        export_state(&st, &config(dir.path())).unwrap();
        let month = dir.path().join("2024/2024-01");
        assert!(month.join("2024-01-01 - Sync.md").exists());
        assert_eq!(fs::read_dir(&month).unwrap().count(), 1);
    }

    #[test]
    fn undecodable_documents_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let st = state(json!({
            "bad": {"title": 42},
            "good": {"title": "Fine", "created_at": "2024-01-01T10:00:00Z", "notes_plain": "x"}
        }));
        let summary = export_state(&st, &config(dir.path())).unwrap();
        assert_eq!(summary.errors, 0);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.created, 1);
    }
}
