//! ProseMirror document JSON (the editor format of AI summary panels) to Markdown.

use serde_json::Value;

fn str_field<'a>(node: &'a Value, key: &str) -> &'a str {
    node.get(key).and_then(Value::as_str).unwrap_or("")
}

fn attr<'a>(node: &'a Value, key: &str) -> Option<&'a Value> {
    node.get("attrs").and_then(|a| a.get(key))
}

fn render_text(node: &Value) -> String {
    let mut text = str_field(node, "text").to_string();
    let marks = node.get("marks").and_then(Value::as_array);
    for mark in marks.into_iter().flatten() {
        text = match str_field(mark, "type") {
            "bold" => format!("**{}**", text),
            "italic" => format!("*{}*", text),
            "code" => format!("`{}`", text),
            "link" => {
                let href = attr(mark, "href").and_then(Value::as_str).unwrap_or("");
                format!("[{}]({})", text, href)
            }
            _ => text,
        };
    }
    text
}

/// Convert a ProseMirror node (usually the `doc` root) into Markdown.
///
/// Non-object input yields an empty string. Unknown node types contribute their children.
pub fn to_markdown(node: &Value) -> String {
    if !node.is_object() {
        return String::new();
    }

    let node_type = str_field(node, "type");
    if node_type == "text" {
        return render_text(node);
    }

    let joined: String = node
        .get("content")
        .and_then(Value::as_array)
        .map(|children| children.iter().map(to_markdown).collect())
        .unwrap_or_default();

    match node_type {
        "heading" => {
            let level = attr(node, "level")
                .and_then(Value::as_u64)
                .unwrap_or(1)
                .clamp(1, 6) as usize;
            format!("\n{} {}\n\n", "#".repeat(level), joined)
        }
        "paragraph" => format!("{}\n\n", joined),
        "listItem" => {
            let mut lines = joined.trim().split('\n');
            let mut out = format!("- {}\n", lines.next().unwrap_or(""));
            for line in lines.filter(|l| !l.trim().is_empty()) {
                out.push_str("  ");
                out.push_str(line);
                out.push('\n');
            }
            out
        }
        "blockquote" => {
            let quoted: Vec<String> = joined
                .trim()
                .split('\n')
                .map(|line| format!("> {}", line))
                .collect();
            format!("{}\n\n", quoted.join("\n"))
        }
        "codeBlock" => {
            let lang = attr(node, "language").and_then(Value::as_str).unwrap_or("");
            format!("\n```{}\n{}\n```\n\n", lang, joined)
        }
        "hardBreak" => "\n".to_string(),
        "horizontalRule" => "\n---\n\n".to_string(),
        // doc, bulletList, orderedList and anything unrecognised
        _ => joined,
    }
}
