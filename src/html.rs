//! Minimal HTML to Markdown conversion for shared-note summaries.
//!
//! The summary markup Granola serves is a flat, well-formed subset (headings, lists,
//! paragraphs, inline emphasis, links), so a tag-stream walk is enough; no DOM is built.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Comments, start/end tags (attributes may contain quoted `>`), or text runs.
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<!--.*?-->|<(/?)([A-Za-z][A-Za-z0-9]*)((?:[^>"']|"[^"]*"|'[^']*')*)>|[^<]+|<"#)
        .unwrap_or_else(|_| unreachable!())
});

static HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .unwrap_or_else(|_| unreachable!())
});

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z]+);").unwrap_or_else(|_| unreachable!())
});

static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").unwrap_or_else(|_| unreachable!()));

const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "meta", "link", "wbr"];

/// Decode character references in text or attribute values. Unknown names are left as-is.
pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let body = &caps[1];
            let decoded = if let Some(num) = body.strip_prefix('#') {
                let code = match num.strip_prefix(['x', 'X']) {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => num.parse::<u32>().ok(),
                };
                code.and_then(char::from_u32).map(String::from)
            } else {
                named_entity(body).map(String::from)
            };
            decoded.unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<&'static str> {
    Some(match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "hellip" => "\u{2026}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "copy" => "\u{a9}",
        _ => return None,
    })
}

struct OpenTag {
    name: String,
    href: Option<String>,
}

#[derive(Default)]
struct Converter {
    out: String,
    stack: Vec<OpenTag>,
    /// Inside `<script>`/`<style>`; text is dropped.
    raw_depth: usize,
}

impl Converter {
    fn list_depth(&self) -> usize {
        self.stack
            .iter()
            .filter(|t| t.name == "ul" || t.name == "ol")
            .count()
    }

    fn start(&mut self, name: &str, attrs: &str) {
        let mut href = None;
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name[1..].parse::<usize>().unwrap_or(1);
                self.out.push('\n');
                self.out.push_str(&"#".repeat(level));
                self.out.push(' ');
            }
            "li" => {
                let depth = self.list_depth().saturating_sub(1);
                self.out.push_str(&"  ".repeat(depth));
                self.out.push_str("- ");
            }
            "br" => self.out.push('\n'),
            "a" => {
                href = Some(
                    HREF.captures(attrs)
                        .and_then(|c| c.get(1).or_else(|| c.get(2)).or_else(|| c.get(3)))
                        .map(|m| decode_entities(m.as_str()))
                        .unwrap_or_default(),
                );
                self.out.push('[');
            }
            "strong" | "b" => self.out.push_str("**"),
            "em" | "i" => self.out.push('*'),
            "code" => self.out.push('`'),
            "blockquote" => self.out.push_str("> "),
            "script" | "style" => self.raw_depth += 1,
            _ => {}
        }
        if !VOID_TAGS.contains(&name) {
            self.stack.push(OpenTag {
                name: name.to_string(),
                href,
            });
        }
    }

    fn end(&mut self, name: &str) {
        let open = self
            .stack
            .iter()
            .rposition(|t| t.name == name)
            .map(|idx| self.stack.remove(idx));

        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "p" => self.out.push_str("\n\n"),
            "li" | "ul" | "ol" | "blockquote" => self.out.push('\n'),
            "a" => {
                self.out.push(']');
                if let Some(tag) = open {
                    self.out.push('(');
                    self.out.push_str(tag.href.as_deref().unwrap_or(""));
                    self.out.push(')');
                }
            }
            "strong" | "b" => self.out.push_str("**"),
            "em" | "i" => self.out.push('*'),
            "code" => self.out.push('`'),
            "script" | "style" => self.raw_depth = self.raw_depth.saturating_sub(1),
            _ => {}
        }
    }

    fn text(&mut self, data: &str) {
        if self.raw_depth == 0 {
            self.out.push_str(&decode_entities(data));
        }
    }

    fn finish(self) -> String {
        BLANK_RUN.replace_all(&self.out, "\n\n").trim().to_string()
    }
}

/// Convert an HTML fragment into Markdown.
pub fn to_markdown(html: &str) -> String {
    let mut conv = Converter::default();
    for caps in TOKEN.captures_iter(html) {
        let Some(whole) = caps.get(0) else { continue };
        match caps.get(2) {
            Some(name) => {
                let name = name.as_str().to_ascii_lowercase();
                let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
                let attrs = caps.get(3).map_or("", |m| m.as_str());
                if closing {
                    conv.end(&name);
                } else {
                    conv.start(&name, attrs);
                    if attrs.trim_end().ends_with('/') && !VOID_TAGS.contains(&name.as_str()) {
                        conv.end(&name);
                    }
                }
            }
            None if whole.as_str().starts_with("<!--") => {}
            None => conv.text(whole.as_str()),
        }
    }
    conv.finish()
}
