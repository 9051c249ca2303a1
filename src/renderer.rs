use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::io::Write;

use crate::record::Meeting;
use crate::shared::SharedNote;
use crate::utils::parse_timestamp;

pub const CACHE_SOURCE: &str = "cache";

#[derive(Serialize)]
struct Frontmatter<'a> {
    id: &'a str,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<&'a str>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<&'a str>,
    #[serde(skip_serializing_if = "no_attendees")]
    attendees: &'a [String],
    source: &'a str,
}

fn no_attendees(attendees: &&[String]) -> bool {
    attendees.is_empty()
}

fn write_frontmatter<W: Write>(writer: &mut W, fm: &Frontmatter<'_>) -> std::io::Result<()> {
    writeln!(writer, "---")?;
    // serde_yaml 0.9 emits no document marker, so the fences are ours
    let yaml = serde_yaml::to_string(fm).map_err(std::io::Error::other)?;
    write!(writer, "{}", yaml)?;
    writeln!(writer, "---")?;
    writeln!(writer)?;
    Ok(())
}

fn date_line(raw: &str, parsed: Option<&DateTime<FixedOffset>>) -> String {
    match parsed {
        Some(dt) => format!("**Date:** {}", dt.format("%Y-%m-%d %H:%M")),
        None => format!("**Date:** {}", raw),
    }
}

/// Push a `---` / `## Heading` / body triple when the body has content.
fn push_section(sections: &mut Vec<String>, heading: &str, body: &str) {
    if body.is_empty() {
        return;
    }
    sections.push("---\n".to_string());
    sections.push(format!("## {}\n", heading));
    sections.push(format!("{}\n", body));
}

/// Blocks each end in `\n` and are separated by one more, so every block is followed by a
/// blank line except the last.
fn write_sections<W: Write>(writer: &mut W, sections: &[String]) -> std::io::Result<()> {
    write!(writer, "{}", sections.join("\n"))
}

pub fn render_meeting<W: Write>(writer: &mut W, meeting: &Meeting) -> std::io::Result<()> {
    write_frontmatter(
        writer,
        &Frontmatter {
            id: &meeting.id,
            title: &meeting.title,
            created_at: meeting.created_raw.as_deref(),
            kind: Some(&meeting.kind),
            attendees: &meeting.attendees,
            source: CACHE_SOURCE,
        },
    )?;

    let mut sections = vec![format!("# {}\n", meeting.title)];

    let mut meta = Vec::new();
    if let Some(raw) = &meeting.created_raw {
        meta.push(date_line(raw, meeting.created_at.as_ref()));
    }
    if let Some((start, end)) = &meeting.time_range {
        meta.push(format!(
            "**Time:** {} - {}",
            start.format("%H:%M"),
            end.format("%H:%M")
        ));
    }
    meta.push(format!("**Type:** {}", meeting.kind));
    if !meeting.attendees.is_empty() {
        meta.push(format!("**Attendees:** {}", meeting.attendees.join(", ")));
    }
    sections.push(format!("{}\n", meta.join("\n")));

    push_section(&mut sections, "Summary", meeting.summary.trim());
    push_section(&mut sections, "Notes", &meeting.notes);
    if !meeting.transcript.trim().is_empty() {
        push_section(&mut sections, "Transcript", &meeting.transcript);
    }

    write_sections(writer, &sections)
}

pub fn render_shared_note<W: Write>(writer: &mut W, note: &SharedNote) -> std::io::Result<()> {
    let created = note.created_at.as_deref().filter(|s| !s.is_empty());
    write_frontmatter(
        writer,
        &Frontmatter {
            id: &note.doc_id,
            title: &note.title,
            created_at: created,
            kind: None,
            attendees: &note.attendees,
            source: note.source_url.as_str(),
        },
    )?;

    let mut sections = vec![format!("# {}\n", note.title)];

    let mut meta = Vec::new();
    if let Some(raw) = created {
        meta.push(date_line(raw, parse_timestamp(raw).as_ref()));
    }
    if let Some(creator) = note.creator.as_deref().filter(|c| !c.is_empty()) {
        meta.push(format!("**Creator:** {}", creator));
    }
    if !note.attendees.is_empty() {
        meta.push(format!("**Attendees:** {}", note.attendees.join(", ")));
    }
    meta.push(format!("**Source:** {}", note.source_url));
    sections.push(format!("{}\n", meta.join("\n")));

    push_section(&mut sections, "Summary", &note.summary_markdown());

    write_sections(writer, &sections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn render(meeting: &Meeting) -> String {
        let mut buf = Vec::new();
        render_meeting(&mut buf, meeting).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn full_meeting_layout() {
        let meeting = Meeting {
            id: "doc-1".into(),
            title: "Roadmap review".into(),
            created_raw: Some("2024-03-05T16:02:00Z".into()),
            created_at: parse_timestamp("2024-03-05T16:02:00Z"),
            kind: "meeting".into(),
            time_range: Some((
                parse_timestamp("2024-03-05T16:00:00+00:00").unwrap(),
                parse_timestamp("2024-03-05T16:30:00+00:00").unwrap(),
            )),
            attendees: vec!["Ana".into(), "Bo".into()],
            summary: "- Ship Q2".into(),
            notes: "my notes".into(),
            transcript: "**[16:00:01]** hi".into(),
            ..Meeting::default()
        };

        let out = render(&meeting);
        let body = out.split_once("---\n\n").map(|(_, b)| b).unwrap();
        assert_eq!(
            body,
            "# Roadmap review\n\n\
             **Date:** 2024-03-05 16:02\n\
             **Time:** 16:00 - 16:30\n\
             **Type:** meeting\n\
             **Attendees:** Ana, Bo\n\n\
             ---\n\n## Summary\n\n- Ship Q2\n\n\
             ---\n\n## Notes\n\nmy notes\n\n\
             ---\n\n## Transcript\n\n**[16:00:01]** hi\n"
        );
    }

    #[test]
    fn frontmatter_carries_id() {
        let meeting = Meeting {
            id: "doc-9".into(),
            title: "T".into(),
            kind: "meeting".into(),
            notes: "n".into(),
            ..Meeting::default()
        };
        let out = render(&meeting);
        assert!(out.starts_with("---\nid: doc-9\ntitle: T\ntype: meeting\nsource: cache\n---\n\n"));
    }

    #[test]
    fn unparseable_date_is_shown_raw_and_empty_sections_dropped() {
        let meeting = Meeting {
            id: "d".into(),
            title: "T".into(),
            created_raw: Some("sometime".into()),
            kind: "call".into(),
            notes: "only notes".into(),
            ..Meeting::default()
        };
        let out = render(&meeting);
        assert!(out.contains("**Date:** sometime\n**Type:** call\n\n---\n\n## Notes\n\nonly notes\n"));
        assert!(!out.contains("## Summary"));
        assert!(!out.contains("## Transcript"));
    }

    #[test]
    fn shared_note_layout() {
        let note = SharedNote {
            doc_id: "0a1b".into(),
            title: "Partner call".into(),
            created_at: Some("2024-06-01T08:15:00Z".into()),
            creator: Some("Jo Park".into()),
            attendees: vec!["Ana".into()],
            summary_html: "<p>Great call</p>".into(),
            source_url: Url::parse("https://notes.granola.ai/d/0a1b").unwrap(),
        };
        let mut buf = Vec::new();
        render_shared_note(&mut buf, &note).unwrap();
        let out = String::from_utf8(buf).unwrap();
        let body = out.split_once("---\n\n").map(|(_, b)| b).unwrap();
        assert_eq!(
            body,
            "# Partner call\n\n\
             **Date:** 2024-06-01 08:15\n\
             **Creator:** Jo Park\n\
             **Attendees:** Ana\n\
             **Source:** https://notes.granola.ai/d/0a1b\n\n\
             ---\n\n## Summary\n\nGreat call\n"
        );
    }
}
