//! Shared-note page parsing and saving, from a captured page shape.

mod common;

use eyre::Result;
use granola_export::paths::{FilenameStyle, PathRegistry};
use granola_export::shared::{parse_shared_page, write_shared_note};
use granola_export::utils::ProcessResult;
use std::fs;
use tempfile::TempDir;
use url::Url;

const DOC_URL: &str = "https://notes.granola.ai/d/0a1b2c3d-0000-4000-8000-000000000001";
const SHORT_URL: &str = "https://notes.granola.ai/t/xyz123";

fn push(payload: &str) -> Result<String> {
    // JSON string escaping is what Next.js emits for these payloads
    Ok(format!(
        "<script>self.__next_f.push([1,{}])</script>",
        serde_json::to_string(payload)?
    ))
}

fn sample_page() -> Result<String> {
    let props = r#"5:["$","div",null,{"children":[["$","$L1a",null,{"documentPanel":{"id":"p1"},"document":{"title":"Partner sync","created_at":"2024-06-01T08:15:00.000Z"},"documentMetadata":{"creator":{"name":"jo","email":"jo@x.io","details":{"person":{"name":{"fullName":"Jo Park"}}}},"attendees":[{"email":"ana@x.io","details":{"person":{"name":{"fullName":"Ana Lee"}}}},{"email":"bo@x.io"}]}}]]}]
"#;
    Ok(format!(
        "<!DOCTYPE html><html><body>{}{}{}{}</body></html>",
        push("1:\"$Sreact.fragment\"\n")?,
        push(props)?,
        push("<div class=\"wrapper\"><span>chrome</span></div>")?,
        push("<h3>Highlights</h3><ul><li>Pilot in <strong>July</strong></li><li>Budget &amp; staffing</li></ul>")?,
    ))
}

#[test]
fn test_parse_shared_page() -> Result<()> {
    let page = sample_page()?;
    let note = parse_shared_page(&Url::parse(DOC_URL)?, &Url::parse(SHORT_URL)?, &page)?;

    assert_eq!(note.doc_id, "0a1b2c3d-0000-4000-8000-000000000001");
    assert_eq!(note.title, "Partner sync");
    assert_eq!(note.created_at.as_deref(), Some("2024-06-01T08:15:00.000Z"));
    assert_eq!(note.creator.as_deref(), Some("Jo Park"));
    assert_eq!(note.attendees, vec!["Ana Lee", "bo@x.io"]);
    assert_eq!(note.source_url.as_str(), SHORT_URL);

    let summary = note.summary_markdown();
    assert!(summary.starts_with("### Highlights"));
    assert!(summary.contains("- Pilot in **July**"));
    assert!(summary.contains("- Budget & staffing"));

    Ok(())
}

#[test]
fn test_page_without_document_data_fails() -> Result<()> {
    let page = push("<h3>Only a summary</h3>")?;
    let url = Url::parse(DOC_URL)?;
    assert!(parse_shared_page(&url, &url, &page).is_err());

    // Redirect target without a /d/<id> path
    let elsewhere = Url::parse("https://granola.ai/pricing")?;
    assert!(parse_shared_page(&elsewhere, &url, &sample_page()?).is_err());
    Ok(())
}

#[test]
fn test_write_shared_note() -> Result<()> {
    let tmp = TempDir::new()?;
    let mut config = common::config(&tmp, &tmp.path().join("unused.json"));
    let note = parse_shared_page(&Url::parse(DOC_URL)?, &Url::parse(SHORT_URL)?, &sample_page()?)?;

    let mut registry = PathRegistry::new();
    let (path, result) = write_shared_note(&note, &config, &mut registry)?;
    assert_eq!(result, ProcessResult::Created);
    assert_eq!(
        path,
        config
            .target_dir
            .join("shared/2024/2024-06/2024-06-01 - Partner sync.md")
    );

    let content = fs::read_to_string(&path)?;
    assert!(content.contains("id: 0a1b2c3d-0000-4000-8000-000000000001\n"));
    assert!(content.contains("**Creator:** Jo Park\n**Attendees:** Ana Lee, bo@x.io\n"));
    assert!(content.contains(&format!("**Source:** {}\n", SHORT_URL)));
    assert!(content.contains("## Summary\n\n### Highlights"));

    let (_, again) = write_shared_note(&note, &config, &mut registry)?;
    assert_eq!(again, ProcessResult::Skipped);

    config.force = true;
    let (_, forced) = write_shared_note(&note, &config, &mut registry)?;
    assert_eq!(forced, ProcessResult::Updated);

    config.filename_style = FilenameStyle::Slug;
    let (slug_path, _) = write_shared_note(&note, &config, &mut registry)?;
    assert!(slug_path.ends_with("shared/2024/2024-06/2024-06-01-partner-sync.md"));

    Ok(())
}
