//! # granola-export
//!
//! A CLI tool that exports [Granola](https://granola.ai) meeting notes to local Markdown files.
//!
//! ## What it does
//!
//! Granola keeps every meeting it has seen in a local JSON cache (`cache-v3.json`): the
//! calendar metadata, your own notes, the AI summary panels and, for recent meetings, the
//! transcript. This tool reads that cache and writes each meeting as a standalone Markdown
//! file with a small YAML frontmatter block, organized by date:
//!
//! ```text
//! granola-backup/2024/2024-05/2024-05-06 - Weekly Sync.md
//! ```
//!
//! The cache is only ever read; Granola's data is never modified.
//!
//! ## Shared notes
//!
//! Notes shared through a public link can be fetched too. They are saved under
//! `granola-backup/shared/YYYY/YYYY-MM/`.
//!
//! ## Re-running
//!
//! Output paths are deterministic. Files already present are left alone unless `--force` is
//! given. When two meetings on the same day share a title, the later one gets a short id
//! suffix; the frontmatter `id` ties each file to its meeting so this stays stable.
//!
//! ## Usage
//!
//! ```sh
//! # Export all meetings from the local cache
//! granola-export ~/notes/granola
//!
//! # Save a shared note
//! granola-export ~/notes/granola --url https://notes.granola.ai/d/0a1b2c3d-...
//! ```
//!
//! Preferences can be persisted in `~/.config/granola-export/config.toml`.
//!
//! ## Compatibility
//!
//! Tracks Granola's internal (undocumented) cache layout, version 3.
pub mod exporter;
pub mod html;
pub mod importer;
pub mod paths;
pub mod prosemirror;
pub mod record;
pub mod renderer;
pub mod shared;
pub mod utils;
